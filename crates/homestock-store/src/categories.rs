use std::sync::Mutex;

use chrono::Utc;
use homestock_core::category::{
    default_categories, Category, CategoryKind, CategoryUpdate, NewCategory,
};
use homestock_core::types::{format_timestamp, CategoryId};
use rusqlite::{Connection, OptionalExtension};
use tracing::{info, instrument};

use crate::error::{Result, StoreError};
use crate::row;

const KIND: &str = "Category";

const SELECT_COLUMNS: &str =
    "SELECT id, name, kind, icon, color, sort_order, created_at, updated_at FROM categories";

/// Persisted category labels.
pub struct CategoryManager {
    db: Mutex<Connection>,
}

impl CategoryManager {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// All categories in display order.
    pub fn list(&self) -> Result<Vec<Category>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!("{SELECT_COLUMNS} ORDER BY sort_order, name"))?;
        let rows = stmt.query_map([], row_to_category)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Categories of one kind in display order.
    pub fn list_by_kind(&self, kind: CategoryKind) -> Result<Vec<Category>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{SELECT_COLUMNS} WHERE kind = ?1 ORDER BY sort_order, name"
        ))?;
        let rows = stmt.query_map([kind.to_string()], row_to_category)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get(&self, id: &CategoryId) -> Result<Option<Category>> {
        let db = self.db.lock().unwrap();
        Ok(db
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id.as_str()],
                row_to_category,
            )
            .optional()?)
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn create(&self, new: NewCategory) -> Result<Category> {
        let category = new.into_category(Utc::now())?;
        let db = self.db.lock().unwrap();
        insert(&db, &category)?;
        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    pub fn update(&self, id: &CategoryId, patch: CategoryUpdate) -> Result<Category> {
        let db = self.db.lock().unwrap();
        let current = db
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id.as_str()],
                row_to_category,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(KIND, id.as_str()))?;

        let updated = current.apply_update(patch, Utc::now())?;
        db.execute(
            "UPDATE categories
             SET name = ?1, kind = ?2, icon = ?3, color = ?4, sort_order = ?5, updated_at = ?6
             WHERE id = ?7",
            rusqlite::params![
                updated.name,
                updated.kind.to_string(),
                updated.icon,
                updated.color,
                updated.order,
                format_timestamp(&updated.updated_at),
                updated.id.as_str(),
            ],
        )?;
        Ok(updated)
    }

    /// Delete a category. Items that reference it are left untouched.
    #[instrument(skip(self), fields(id = %id))]
    pub fn delete(&self, id: &CategoryId) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute("DELETE FROM categories WHERE id = ?1", [id.as_str()])?;
        if n == 0 {
            return Err(StoreError::not_found(KIND, id.as_str()));
        }
        info!("category deleted");
        Ok(())
    }

    pub fn count(&self) -> Result<u64> {
        let db = self.db.lock().unwrap();
        let n: i64 = db.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Cheap liveness query for health checks.
    pub fn ping(&self) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Insert the stock categories if the table is empty. Returns how many
    /// were inserted (0 when categories already exist).
    pub fn seed_defaults(&self) -> Result<usize> {
        if self.count()? > 0 {
            return Ok(0);
        }
        let now = Utc::now();
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let stock = default_categories();
        let inserted = stock.len();
        for new in stock {
            insert(&tx, &new.into_category(now)?)?;
        }
        tx.commit()?;
        info!(count = inserted, "seeded default categories");
        Ok(inserted)
    }
}

fn insert(conn: &Connection, category: &Category) -> Result<()> {
    conn.execute(
        "INSERT INTO categories
         (id, name, kind, icon, color, sort_order, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            category.id.as_str(),
            category.name,
            category.kind.to_string(),
            category.icon,
            category.color,
            category.order,
            format_timestamp(&category.created_at),
            format_timestamp(&category.updated_at),
        ],
    )?;
    Ok(())
}

fn row_to_category(r: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: CategoryId(r.get(0)?),
        name: r.get(1)?,
        kind: row::parsed(r, 2)?,
        icon: r.get(3)?,
        color: r.get(4)?,
        order: r.get(5)?,
        created_at: row::timestamp(r, 6)?,
        updated_at: row::timestamp(r, 7)?,
    })
}
