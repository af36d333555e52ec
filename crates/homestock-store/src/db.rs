use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

/// Open (or create) the database file with the pragmas every connection
/// needs, and make sure the schema exists.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
    init_db(&conn)?;
    Ok(conn)
}

/// Initialise all tables. Safe to call on every startup (idempotent).
///
/// Category references are plain text columns without foreign keys:
/// deleting a category leaves existing items pointing at it.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_categories_table(conn)?;
    create_consumables_table(conn)?;
    create_tasks_table(conn)?;
    info!("database schema ready");
    Ok(())
}

fn create_categories_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS categories (
            id          TEXT    NOT NULL PRIMARY KEY,
            name        TEXT    NOT NULL,
            kind        TEXT    NOT NULL,   -- 'consumable' | 'task'
            icon        TEXT    NOT NULL DEFAULT 'box',
            color       TEXT    NOT NULL DEFAULT '#3498db',
            sort_order  INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_categories_kind
            ON categories (kind, sort_order);",
    )?;
    Ok(())
}

fn create_consumables_table(conn: &Connection) -> Result<()> {
    // idx_consumables_decaying keeps the sweep's eligibility scan cheap.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS consumables (
            id                  TEXT    NOT NULL PRIMARY KEY,
            name                TEXT    NOT NULL,
            category_id         TEXT    NOT NULL,
            quantity            REAL    NOT NULL DEFAULT 100,
            unit                TEXT    NOT NULL DEFAULT 'count',
            decrease_rate       REAL    NOT NULL DEFAULT 0,
            decrease_interval   TEXT    NOT NULL DEFAULT 'day',
            alert_threshold     REAL    NOT NULL DEFAULT 20,
            last_updated        TEXT    NOT NULL,
            last_auto_decreased TEXT    NOT NULL,
            image               TEXT,
            notes               TEXT,
            is_collapsed        INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT    NOT NULL,
            updated_at          TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_consumables_category
            ON consumables (category_id);
        CREATE INDEX IF NOT EXISTS idx_consumables_decaying
            ON consumables (decrease_rate) WHERE decrease_rate > 0;",
    )?;
    Ok(())
}

fn create_tasks_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                  TEXT    NOT NULL PRIMARY KEY,
            title               TEXT    NOT NULL,
            category_id         TEXT    NOT NULL,
            description         TEXT,
            due_date            TEXT    NOT NULL,
            recurring           TEXT,               -- JSON-encoded Recurrence or NULL
            completed           INTEGER NOT NULL DEFAULT 0,
            completed_on        TEXT,
            last_completed_on   TEXT,
            completion_history  TEXT    NOT NULL DEFAULT '[]',  -- JSON array
            priority            TEXT    NOT NULL DEFAULT 'medium',
            created_at          TEXT    NOT NULL,
            updated_at          TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_category
            ON tasks (category_id, due_date);
        CREATE INDEX IF NOT EXISTS idx_tasks_status
            ON tasks (completed, due_date);",
    )?;
    Ok(())
}
