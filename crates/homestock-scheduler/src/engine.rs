use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use homestock_core::config::SweepConfig;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::sweep::{run_sweep, DecayStore};

/// Background driver for the decay sweep.
///
/// The first pass runs `startup_delay_secs` after [`SweepEngine::run`] is
/// called, then one every `interval_secs`. Errors are logged and the loop
/// keeps going.
pub struct SweepEngine {
    store: Arc<dyn DecayStore + Send + Sync>,
    startup_delay: Duration,
    period: Duration,
}

impl SweepEngine {
    pub fn new(store: Arc<dyn DecayStore + Send + Sync>, config: &SweepConfig) -> Self {
        Self {
            store,
            startup_delay: Duration::from_secs(config.startup_delay_secs),
            // a zero period would make tokio's interval panic
            period: Duration::from_secs(config.interval_secs.max(1)),
        }
    }

    /// Main loop. Returns once `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            startup_delay_secs = self.startup_delay.as_secs(),
            interval_secs = self.period.as_secs(),
            "sweep engine started"
        );

        let mut ticker = interval_at(Instant::now() + self.startup_delay, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("sweep engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn tick(&self) {
        match run_sweep(self.store.as_ref(), Utc::now()) {
            Ok(report) if report.decayed > 0 || report.failed > 0 => info!(
                examined = report.examined,
                decayed = report.decayed,
                failed = report.failed,
                "sweep complete"
            ),
            Ok(_) => {}
            Err(e) => error!("sweep error: {e}"),
        }
    }
}
