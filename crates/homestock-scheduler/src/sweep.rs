use chrono::{DateTime, Utc};
use homestock_core::decay::DecayOutcome;
use homestock_core::types::ConsumableId;
use homestock_store::ConsumableManager;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, SweepError};

/// The two storage operations a sweep needs.
pub trait DecayStore {
    /// Ids of every consumable with `decrease_rate > 0`.
    fn list_decaying(&self) -> homestock_store::Result<Vec<ConsumableId>>;

    /// Load `id`, apply the decay it owes as of `now` and persist it.
    /// `None` when no whole period has elapsed.
    fn auto_decrease(
        &self,
        id: &ConsumableId,
        now: DateTime<Utc>,
    ) -> homestock_store::Result<Option<DecayOutcome>>;
}

impl DecayStore for ConsumableManager {
    fn list_decaying(&self) -> homestock_store::Result<Vec<ConsumableId>> {
        ConsumableManager::list_decaying(self)
    }

    fn auto_decrease(
        &self,
        id: &ConsumableId,
        now: DateTime<Utc>,
    ) -> homestock_store::Result<Option<DecayOutcome>> {
        ConsumableManager::auto_decrease(self, id, now)
    }
}

/// Counts for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Consumables with a positive rate.
    pub examined: usize,
    /// Consumables that owed at least one whole period and were updated.
    pub decayed: usize,
    /// Consumables that could not be read or written; retried on the next pass.
    pub failed: usize,
}

/// Apply accumulated decay to every eligible consumable as of `now`.
///
/// Items are independent: an unreadable row or a failed write is logged and
/// counted, and the pass moves on. Only a failure to list aborts the pass.
pub fn run_sweep<S>(store: &S, now: DateTime<Utc>) -> Result<SweepReport>
where
    S: DecayStore + ?Sized,
{
    let ids = store.list_decaying().map_err(SweepError::List)?;
    let mut report = SweepReport {
        examined: ids.len(),
        ..SweepReport::default()
    };

    for id in ids {
        match store.auto_decrease(&id, now) {
            Ok(Some(outcome)) => {
                report.decayed += 1;
                info!(
                    consumable_id = %id,
                    periods = outcome.periods,
                    amount = outcome.amount,
                    to = outcome.quantity,
                    "auto-decreased"
                );
            }
            Ok(None) => {}
            Err(e) => {
                report.failed += 1;
                warn!(consumable_id = %id, error = %e, "auto-decrease failed");
            }
        }
    }

    debug!(
        examined = report.examined,
        decayed = report.decayed,
        failed = report.failed,
        "sweep pass finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use homestock_core::consumable::{Consumable, DecreaseInterval, NewConsumable};
    use homestock_core::types::{format_timestamp, CategoryId};
    use homestock_store::{db::init_db, StoreError};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn consumable(name: &str, quantity: f64, rate: f64, last: DateTime<Utc>) -> Consumable {
        let mut item = NewConsumable {
            quantity,
            decrease_rate: rate,
            decrease_interval: DecreaseInterval::Week,
            ..NewConsumable::new(name, CategoryId::from("kitchen"))
        }
        .into_consumable(last)
        .unwrap();
        item.last_auto_decreased = last;
        item
    }

    /// In-memory store that refuses to write one id.
    struct FakeStore {
        items: Mutex<BTreeMap<String, Consumable>>,
        order: Vec<ConsumableId>,
        poisoned: Option<ConsumableId>,
    }

    impl FakeStore {
        fn new(items: Vec<Consumable>) -> Self {
            Self {
                order: items.iter().map(|c| c.id.clone()).collect(),
                items: Mutex::new(items.into_iter().map(|c| (c.id.0.clone(), c)).collect()),
                poisoned: None,
            }
        }

        fn quantity(&self, id: &ConsumableId) -> f64 {
            self.items.lock().unwrap()[id.as_str()].quantity
        }
    }

    impl DecayStore for FakeStore {
        fn list_decaying(&self) -> homestock_store::Result<Vec<ConsumableId>> {
            Ok(self.order.clone())
        }

        fn auto_decrease(
            &self,
            id: &ConsumableId,
            now: DateTime<Utc>,
        ) -> homestock_store::Result<Option<DecayOutcome>> {
            if self.poisoned.as_ref() == Some(id) {
                return Err(StoreError::not_found("Consumable", id.as_str()));
            }
            let mut items = self.items.lock().unwrap();
            let item = items[id.as_str()].clone();
            let outcome = item.decay_due(now);
            if let Some(outcome) = &outcome {
                items.insert(id.0.clone(), item.apply_decay(outcome));
            }
            Ok(outcome)
        }
    }

    struct BrokenStore;

    impl DecayStore for BrokenStore {
        fn list_decaying(&self) -> homestock_store::Result<Vec<ConsumableId>> {
            Err(StoreError::not_found("Consumable", "*"))
        }

        fn auto_decrease(
            &self,
            _: &ConsumableId,
            _: DateTime<Utc>,
        ) -> homestock_store::Result<Option<DecayOutcome>> {
            unreachable!("nothing listed")
        }
    }

    #[test]
    fn one_failed_write_does_not_stop_the_batch() {
        let ten_days_ago = now() - Duration::days(10);
        let a = consumable("Coffee", 100.0, 7.0, ten_days_ago);
        let b = consumable("Rice", 50.0, 5.0, ten_days_ago);
        let c = consumable("Tea", 30.0, 1.0, ten_days_ago);
        let mut store = FakeStore::new(vec![a.clone(), b.clone(), c.clone()]);
        store.poisoned = Some(b.id.clone());

        let report = run_sweep(&store, now()).unwrap();
        assert_eq!(
            report,
            SweepReport {
                examined: 3,
                decayed: 2,
                failed: 1
            }
        );
        assert_eq!(store.quantity(&a.id), 93.0);
        assert_eq!(store.quantity(&b.id), 50.0);
        assert_eq!(store.quantity(&c.id), 29.0);
    }

    #[test]
    fn partial_period_is_not_written() {
        let soap = consumable("Soap", 10.0, 1.0, now() - Duration::days(6));
        let store = FakeStore::new(vec![soap.clone()]);
        let report = run_sweep(&store, now()).unwrap();
        assert_eq!(report.examined, 1);
        assert_eq!(report.decayed, 0);
        assert_eq!(store.items.lock().unwrap()[soap.id.as_str()], soap);
    }

    #[test]
    fn listing_failure_aborts_the_pass() {
        assert!(matches!(
            run_sweep(&BrokenStore, now()),
            Err(SweepError::List(_))
        ));
    }

    #[test]
    fn sweep_against_sqlite_is_idempotent_and_clamps() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let manager = ConsumableManager::new(conn);

        let coffee = manager
            .create(NewConsumable {
                quantity: 100.0,
                decrease_rate: 7.0,
                decrease_interval: DecreaseInterval::Week,
                ..NewConsumable::new("Coffee", CategoryId::from("kitchen"))
            })
            .unwrap();
        let salt = manager
            .create(NewConsumable {
                quantity: 3.0,
                decrease_rate: 2.0,
                decrease_interval: DecreaseInterval::Day,
                ..NewConsumable::new("Salt", CategoryId::from("kitchen"))
            })
            .unwrap();
        let later = coffee.created_at.max(salt.created_at) + Duration::days(10);

        let first = run_sweep(&manager, later).unwrap();
        assert_eq!(first.decayed, 2);
        assert_eq!(manager.get(&coffee.id).unwrap().unwrap().quantity, 93.0);
        assert_eq!(manager.get(&salt.id).unwrap().unwrap().quantity, 0.0);

        let second = run_sweep(&manager, later).unwrap();
        assert_eq!(second.examined, 2);
        assert_eq!(second.decayed, 0);
        assert_eq!(manager.get(&coffee.id).unwrap().unwrap().quantity, 93.0);
    }

    #[test]
    fn unreadable_row_is_counted_and_the_rest_decay() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        let stamp = format_timestamp(&Utc::now());
        conn.execute(
            "INSERT INTO consumables
             (id, name, category_id, quantity, unit, decrease_rate, decrease_interval,
              alert_threshold, last_updated, last_auto_decreased, is_collapsed,
              created_at, updated_at)
             VALUES ('bad', 'Paint', 'garage', 10, 'gallons', 1, 'day', 2, ?1, ?1, 0, ?1, ?1)",
            [&stamp],
        )
        .unwrap();
        let manager = ConsumableManager::new(conn);

        let milk = manager
            .create(NewConsumable {
                quantity: 100.0,
                decrease_rate: 1.0,
                decrease_interval: DecreaseInterval::Day,
                ..NewConsumable::new("Milk", CategoryId::from("kitchen"))
            })
            .unwrap();
        let later = milk.created_at + Duration::days(3);

        let report = run_sweep(&manager, later).unwrap();
        assert_eq!(
            report,
            SweepReport {
                examined: 2,
                decayed: 1,
                failed: 1
            }
        );
        assert_eq!(manager.get(&milk.id).unwrap().unwrap().quantity, 97.0);
    }
}
