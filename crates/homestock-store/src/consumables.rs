use std::sync::Mutex;

use chrono::{DateTime, Utc};
use homestock_core::consumable::{Consumable, ConsumableUpdate, NewConsumable};
use homestock_core::decay::DecayOutcome;
use homestock_core::types::{format_timestamp, CategoryId, ConsumableId};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, instrument};

use crate::error::{Result, StoreError};
use crate::row;

const KIND: &str = "Consumable";

const SELECT_COLUMNS: &str = "SELECT id, name, category_id, quantity, unit, decrease_rate,
        decrease_interval, alert_threshold, last_updated, last_auto_decreased,
        image, notes, is_collapsed, created_at, updated_at
     FROM consumables";

/// Persisted consumable stock.
///
/// Every mutation goes through [`ConsumableManager::apply`]: load by id,
/// run a pure transition from `homestock-core`, write the result back.
/// The connection lock is held for the whole round-trip; there is no
/// cross-request locking, so concurrent edits are last-write-wins.
pub struct ConsumableManager {
    db: Mutex<Connection>,
}

impl ConsumableManager {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    pub fn list(&self) -> Result<Vec<Consumable>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!("{SELECT_COLUMNS} ORDER BY name"))?;
        let rows = stmt.query_map([], row_to_consumable)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_by_category(&self, category_id: &CategoryId) -> Result<Vec<Consumable>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{SELECT_COLUMNS} WHERE category_id = ?1 ORDER BY name"
        ))?;
        let rows = stmt.query_map([category_id.as_str()], row_to_consumable)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn get(&self, id: &ConsumableId) -> Result<Option<Consumable>> {
        let db = self.db.lock().unwrap();
        load(&db, id)
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn create(&self, new: NewConsumable) -> Result<Consumable> {
        let item = new.into_consumable(Utc::now())?;
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO consumables
             (id, name, category_id, quantity, unit, decrease_rate, decrease_interval,
              alert_threshold, last_updated, last_auto_decreased, image, notes,
              is_collapsed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            rusqlite::params![
                item.id.as_str(),
                item.name,
                item.category_id.as_str(),
                item.quantity,
                item.unit.to_string(),
                item.decrease_rate,
                item.decrease_interval.to_string(),
                item.alert_threshold,
                format_timestamp(&item.last_updated),
                format_timestamp(&item.last_auto_decreased),
                item.image,
                item.notes,
                item.is_collapsed,
                format_timestamp(&item.created_at),
                format_timestamp(&item.updated_at),
            ],
        )?;
        info!(consumable_id = %item.id, "consumable created");
        Ok(item)
    }

    /// Load `id`, run `transition` on it, persist and return the new state.
    #[instrument(skip(self, transition), fields(id = %id))]
    pub fn apply<F>(&self, id: &ConsumableId, transition: F) -> Result<Consumable>
    where
        F: FnOnce(Consumable) -> homestock_core::Result<Consumable>,
    {
        let db = self.db.lock().unwrap();
        let current = load(&db, id)?.ok_or_else(|| StoreError::not_found(KIND, id.as_str()))?;
        let next = transition(current)?;
        save(&db, &next)?;
        debug!(quantity = next.quantity, "consumable saved");
        Ok(next)
    }

    pub fn update(&self, id: &ConsumableId, patch: ConsumableUpdate) -> Result<Consumable> {
        self.apply(id, |item| item.apply_update(patch, Utc::now()))
    }

    /// Manual decrease, clamped at zero. `amount` must already be validated.
    pub fn decrease(&self, id: &ConsumableId, amount: f64) -> Result<Consumable> {
        self.apply(id, |item| Ok(item.decrease(amount, Utc::now())))
    }

    /// Set the level to `amount`. `amount` must already be validated (> 0).
    pub fn refill(&self, id: &ConsumableId, amount: f64) -> Result<Consumable> {
        self.apply(id, |item| Ok(item.refill(amount, Utc::now())))
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn delete(&self, id: &ConsumableId) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute("DELETE FROM consumables WHERE id = ?1", [id.as_str()])?;
        if n == 0 {
            return Err(StoreError::not_found(KIND, id.as_str()));
        }
        info!("consumable deleted");
        Ok(())
    }

    /// Ids of every consumable with a positive decay rate.
    ///
    /// Only the id column is read, so one undecodable row cannot hide the
    /// others from the sweep.
    pub fn list_decaying(&self) -> Result<Vec<ConsumableId>> {
        let db = self.db.lock().unwrap();
        let mut stmt =
            db.prepare_cached("SELECT id FROM consumables WHERE decrease_rate > 0 ORDER BY id")?;
        let rows = stmt.query_map([], |r| r.get(0).map(ConsumableId))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Apply whatever whole periods of decay `id` owes as of `now`.
    ///
    /// Same load, transition, persist round-trip as [`ConsumableManager::apply`],
    /// so a refill that lands first is decayed from its new level. Returns
    /// `None` and writes nothing when no whole period has elapsed.
    #[instrument(skip(self), fields(id = %id))]
    pub fn auto_decrease(
        &self,
        id: &ConsumableId,
        now: DateTime<Utc>,
    ) -> Result<Option<DecayOutcome>> {
        let db = self.db.lock().unwrap();
        let current = load(&db, id)?.ok_or_else(|| StoreError::not_found(KIND, id.as_str()))?;
        let Some(outcome) = current.decay_due(now) else {
            return Ok(None);
        };
        save(&db, &current.apply_decay(&outcome))?;
        debug!(quantity = outcome.quantity, periods = outcome.periods, "decay saved");
        Ok(Some(outcome))
    }
}

fn load(db: &Connection, id: &ConsumableId) -> Result<Option<Consumable>> {
    Ok(db
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            [id.as_str()],
            row_to_consumable,
        )
        .optional()?)
}

fn save(db: &Connection, item: &Consumable) -> Result<()> {
    let n = db.execute(
        "UPDATE consumables
         SET name = ?1, category_id = ?2, quantity = ?3, unit = ?4, decrease_rate = ?5,
             decrease_interval = ?6, alert_threshold = ?7, last_updated = ?8,
             last_auto_decreased = ?9, image = ?10, notes = ?11, is_collapsed = ?12,
             updated_at = ?13
         WHERE id = ?14",
        rusqlite::params![
            item.name,
            item.category_id.as_str(),
            item.quantity,
            item.unit.to_string(),
            item.decrease_rate,
            item.decrease_interval.to_string(),
            item.alert_threshold,
            format_timestamp(&item.last_updated),
            format_timestamp(&item.last_auto_decreased),
            item.image,
            item.notes,
            item.is_collapsed,
            format_timestamp(&item.updated_at),
            item.id.as_str(),
        ],
    )?;
    if n == 0 {
        return Err(StoreError::not_found(KIND, item.id.as_str()));
    }
    Ok(())
}

fn row_to_consumable(r: &rusqlite::Row<'_>) -> rusqlite::Result<Consumable> {
    Ok(Consumable {
        id: ConsumableId(r.get(0)?),
        name: r.get(1)?,
        category_id: CategoryId(r.get(2)?),
        quantity: r.get(3)?,
        unit: row::parsed(r, 4)?,
        decrease_rate: r.get(5)?,
        decrease_interval: row::parsed(r, 6)?,
        alert_threshold: r.get(7)?,
        last_updated: row::timestamp(r, 8)?,
        last_auto_decreased: row::timestamp(r, 9)?,
        image: r.get(10)?,
        notes: r.get(11)?,
        is_collapsed: r.get(12)?,
        created_at: row::timestamp(r, 13)?,
        updated_at: row::timestamp(r, 14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use chrono::Duration;
    use homestock_core::consumable::{DecreaseInterval, Unit};
    use homestock_core::HomestockError;

    fn manager() -> ConsumableManager {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        ConsumableManager::new(conn)
    }

    fn paper_towels() -> NewConsumable {
        NewConsumable {
            quantity: 12.0,
            unit: Unit::Count,
            decrease_rate: 2.0,
            decrease_interval: DecreaseInterval::Week,
            notes: Some("big rolls".into()),
            ..NewConsumable::new("Paper towels", CategoryId::from("cleaning"))
        }
    }

    #[test]
    fn create_then_get_round_trips_all_columns() {
        let store = manager();
        let created = store.create(paper_towels()).unwrap();
        let loaded = store.get(&created.id).unwrap().unwrap();
        // stored timestamps are truncated to milliseconds
        assert_eq!(loaded.name, created.name);
        assert_eq!(loaded.decrease_interval, DecreaseInterval::Week);
        assert_eq!(loaded.notes.as_deref(), Some("big rolls"));
        assert_eq!(
            format_timestamp(&loaded.last_auto_decreased),
            format_timestamp(&created.last_auto_decreased)
        );
    }

    #[test]
    fn decrease_and_refill_persist() {
        let store = manager();
        let item = store.create(paper_towels()).unwrap();

        let after = store.decrease(&item.id, 20.0).unwrap();
        assert_eq!(after.quantity, 0.0);
        assert_eq!(store.get(&item.id).unwrap().unwrap().quantity, 0.0);

        let after = store.refill(&item.id, 24.0).unwrap();
        assert_eq!(after.quantity, 24.0);
        assert_eq!(store.get(&item.id).unwrap().unwrap().quantity, 24.0);
    }

    #[test]
    fn rejected_transition_leaves_row_untouched() {
        let store = manager();
        let item = store.create(paper_towels()).unwrap();
        let result = store.apply(&item.id, |_| {
            Err(HomestockError::validation("nope"))
        });
        assert!(matches!(result, Err(StoreError::Rejected(_))));
        assert_eq!(store.get(&item.id).unwrap().unwrap().quantity, 12.0);
    }

    #[test]
    fn apply_on_missing_id_is_not_found() {
        let store = manager();
        let err = store.decrease(&ConsumableId::from("ghost"), 1.0).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn list_decaying_filters_zero_rate() {
        let store = manager();
        let towels = store.create(paper_towels()).unwrap();
        store
            .create(NewConsumable::new("Batteries", CategoryId::from("home")))
            .unwrap();
        assert_eq!(store.list_decaying().unwrap(), vec![towels.id]);
    }

    #[test]
    fn auto_decrease_moves_quantity_and_clock_only() {
        let store = manager();
        let item = store.create(paper_towels()).unwrap();
        let at = item.created_at + Duration::days(8);

        let outcome = store.auto_decrease(&item.id, at).unwrap().unwrap();
        assert_eq!(outcome.periods, 1);

        let loaded = store.get(&item.id).unwrap().unwrap();
        assert_eq!(loaded.quantity, 10.0);
        assert_eq!(format_timestamp(&loaded.last_auto_decreased), format_timestamp(&at));
        assert_eq!(
            format_timestamp(&loaded.last_updated),
            format_timestamp(&item.last_updated)
        );

        // nothing further owed at the same instant
        assert!(store.auto_decrease(&item.id, at).unwrap().is_none());
    }

    #[test]
    fn auto_decrease_starts_from_the_stored_level() {
        let store = manager();
        let item = store.create(paper_towels()).unwrap();
        store.refill(&item.id, 30.0).unwrap();

        let at = item.created_at + Duration::days(15);
        let outcome = store.auto_decrease(&item.id, at).unwrap().unwrap();
        assert_eq!(outcome.quantity, 26.0);
        assert_eq!(store.get(&item.id).unwrap().unwrap().quantity, 26.0);
    }

    #[test]
    fn auto_decrease_on_missing_id_is_not_found() {
        let store = manager();
        let err = store
            .auto_decrease(&ConsumableId::from("ghost"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn list_by_category() {
        let store = manager();
        store.create(paper_towels()).unwrap();
        store
            .create(NewConsumable::new("Flour", CategoryId::from("kitchen")))
            .unwrap();
        let kitchen = store.list_by_category(&CategoryId::from("kitchen")).unwrap();
        assert_eq!(kitchen.len(), 1);
        assert_eq!(kitchen[0].name, "Flour");
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
