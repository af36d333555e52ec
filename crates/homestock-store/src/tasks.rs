use std::sync::Mutex;

use chrono::Utc;
use homestock_core::task::{NewTask, Task, TaskUpdate};
use homestock_core::types::{format_timestamp, CategoryId, TaskId};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, instrument};

use crate::error::{Result, StoreError};
use crate::row;

const KIND: &str = "Task";

const SELECT_COLUMNS: &str = "SELECT id, title, category_id, description, due_date, recurring,
        completed, completed_on, last_completed_on, completion_history, priority,
        created_at, updated_at
     FROM tasks";

/// Persisted chores. Lists are ordered by due date, soonest first.
pub struct TaskManager {
    db: Mutex<Connection>,
}

impl TaskManager {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    pub fn list(&self) -> Result<Vec<Task>> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY due_date"), &[])
    }

    pub fn list_by_category(&self, category_id: &CategoryId) -> Result<Vec<Task>> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE category_id = ?1 ORDER BY due_date"),
            &[&category_id.as_str()],
        )
    }

    pub fn list_by_status(&self, completed: bool) -> Result<Vec<Task>> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE completed = ?1 ORDER BY due_date"),
            &[&completed],
        )
    }

    fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_task)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        let db = self.db.lock().unwrap();
        load(&db, id)
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    pub fn create(&self, new: NewTask) -> Result<Task> {
        let task = new.into_task(Utc::now())?;
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO tasks
             (id, title, category_id, description, due_date, recurring, completed,
              completed_on, last_completed_on, completion_history, priority,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                task.id.as_str(),
                task.title,
                task.category_id.as_str(),
                task.description,
                format_timestamp(&task.due_date),
                task.recurring.as_ref().map(serde_json::to_string).transpose()?,
                task.completed,
                task.completed_on.as_ref().map(format_timestamp),
                task.last_completed_on.as_ref().map(format_timestamp),
                serde_json::to_string(&task.completion_history)?,
                task.priority.to_string(),
                format_timestamp(&task.created_at),
                format_timestamp(&task.updated_at),
            ],
        )?;
        info!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Load `id`, run `transition` on it, persist and return the new state.
    #[instrument(skip(self, transition), fields(id = %id))]
    pub fn apply<F>(&self, id: &TaskId, transition: F) -> Result<Task>
    where
        F: FnOnce(Task) -> homestock_core::Result<Task>,
    {
        let db = self.db.lock().unwrap();
        let current = load(&db, id)?.ok_or_else(|| StoreError::not_found(KIND, id.as_str()))?;
        let next = transition(current)?;
        save(&db, &next)?;
        debug!(due = %next.due_date, completed = next.completed, "task saved");
        Ok(next)
    }

    pub fn update(&self, id: &TaskId, patch: TaskUpdate) -> Result<Task> {
        self.apply(id, |task| task.apply_update(patch, Utc::now()))
    }

    /// Complete / un-complete; recurring tasks advance their due date.
    pub fn toggle(&self, id: &TaskId) -> Result<Task> {
        self.apply(id, |task| task.toggle(Utc::now()))
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn delete(&self, id: &TaskId) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute("DELETE FROM tasks WHERE id = ?1", [id.as_str()])?;
        if n == 0 {
            return Err(StoreError::not_found(KIND, id.as_str()));
        }
        info!("task deleted");
        Ok(())
    }
}

fn load(db: &Connection, id: &TaskId) -> Result<Option<Task>> {
    Ok(db
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            [id.as_str()],
            row_to_task,
        )
        .optional()?)
}

fn save(db: &Connection, task: &Task) -> Result<()> {
    let n = db.execute(
        "UPDATE tasks
         SET title = ?1, category_id = ?2, description = ?3, due_date = ?4, recurring = ?5,
             completed = ?6, completed_on = ?7, last_completed_on = ?8,
             completion_history = ?9, priority = ?10, updated_at = ?11
         WHERE id = ?12",
        rusqlite::params![
            task.title,
            task.category_id.as_str(),
            task.description,
            format_timestamp(&task.due_date),
            task.recurring.as_ref().map(serde_json::to_string).transpose()?,
            task.completed,
            task.completed_on.as_ref().map(format_timestamp),
            task.last_completed_on.as_ref().map(format_timestamp),
            serde_json::to_string(&task.completion_history)?,
            task.priority.to_string(),
            format_timestamp(&task.updated_at),
            task.id.as_str(),
        ],
    )?;
    if n == 0 {
        return Err(StoreError::not_found(KIND, task.id.as_str()));
    }
    Ok(())
}

fn row_to_task(r: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: TaskId(r.get(0)?),
        title: r.get(1)?,
        category_id: CategoryId(r.get(2)?),
        description: r.get(3)?,
        due_date: row::timestamp(r, 4)?,
        recurring: row::opt_json(r, 5)?,
        completed: r.get(6)?,
        completed_on: row::opt_timestamp(r, 7)?,
        last_completed_on: row::opt_timestamp(r, 8)?,
        completion_history: row::json(r, 9)?,
        priority: row::parsed(r, 10)?,
        created_at: row::timestamp(r, 11)?,
        updated_at: row::timestamp(r, 12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use chrono::{DateTime, Duration, TimeZone};
    use homestock_core::recurrence::Recurrence;

    fn manager() -> TaskManager {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        TaskManager::new(conn)
    }

    fn jan(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap()
    }

    #[test]
    fn lists_are_sorted_by_due_date() {
        let store = manager();
        store
            .create(NewTask::new("Later", CategoryId::from("home"), jan(20)))
            .unwrap();
        store
            .create(NewTask::new("Sooner", CategoryId::from("home"), jan(2)))
            .unwrap();
        store
            .create(NewTask::new("Rake", CategoryId::from("yard"), jan(10)))
            .unwrap();

        let titles: Vec<_> = store.list().unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, ["Sooner", "Rake", "Later"]);

        let home = store.list_by_category(&CategoryId::from("home")).unwrap();
        assert_eq!(home.len(), 2);
        assert_eq!(home[0].title, "Sooner");
    }

    #[test]
    fn recurring_toggle_persists_new_due_date_and_history() {
        let store = manager();
        let task = store
            .create(NewTask {
                recurring: Some(Recurrence::Daily { interval: 3 }),
                ..NewTask::new("Litter box", CategoryId::from("home"), jan(1))
            })
            .unwrap();

        store.toggle(&task.id).unwrap();
        let loaded = store.get(&task.id).unwrap().unwrap();
        assert_eq!(loaded.due_date, jan(4));
        assert!(!loaded.completed);
        assert!(loaded.completed_on.is_some());
        assert_eq!(loaded.completion_history.len(), 1);
        assert_eq!(loaded.recurring, Some(Recurrence::Daily { interval: 3 }));
    }

    #[test]
    fn status_filter_follows_one_off_toggles() {
        let store = manager();
        let a = store
            .create(NewTask::new("Fix gate", CategoryId::from("yard"), jan(3)))
            .unwrap();
        store
            .create(NewTask::new("Clean gutters", CategoryId::from("yard"), jan(5)))
            .unwrap();

        store.toggle(&a.id).unwrap();
        let done = store.list_by_status(true).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, a.id);
        assert_eq!(store.list_by_status(false).unwrap().len(), 1);

        store.toggle(&a.id).unwrap();
        assert!(store.list_by_status(true).unwrap().is_empty());
    }

    #[test]
    fn update_moves_due_date() {
        let store = manager();
        let task = store
            .create(NewTask::new("Filter", CategoryId::from("maint"), jan(1)))
            .unwrap();
        let patch = TaskUpdate {
            due_date: Some(jan(1) + Duration::days(30)),
            ..Default::default()
        };
        let updated = store.update(&task.id, patch).unwrap();
        assert_eq!(updated.due_date, jan(31));
        assert_eq!(store.get(&task.id).unwrap().unwrap().due_date, jan(31));
    }

    #[test]
    fn toggle_that_cannot_advance_leaves_store_usable() {
        let store = manager();
        let end = Utc.with_ymd_and_hms(9999, 12, 31, 10, 0, 0).unwrap();
        let task = store
            .create(NewTask {
                recurring: Some(Recurrence::Daily { interval: 1 }),
                ..NewTask::new("Last chore", CategoryId::from("home"), end)
            })
            .unwrap();
        store
            .create(NewTask::new("Other", CategoryId::from("home"), jan(1)))
            .unwrap();

        assert!(matches!(store.toggle(&task.id), Err(StoreError::Rejected(_))));

        let loaded = store.get(&task.id).unwrap().unwrap();
        assert_eq!(loaded.due_date, end);
        assert!(loaded.completion_history.is_empty());
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn delete_twice_is_not_found() {
        let store = manager();
        let task = store
            .create(NewTask::new("Once", CategoryId::from("home"), jan(1)))
            .unwrap();
        store.delete(&task.id).unwrap();
        assert!(matches!(
            store.delete(&task.id),
            Err(StoreError::NotFound { .. })
        ));
    }
}
