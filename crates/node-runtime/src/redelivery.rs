//! # Dead Letter Redelivery
//!
//! Background task that hands recoverable dead letters back to their
//! subscriptions: events parked after a storage fault or a full subscriber
//! queue. Passes that find work back off up to `cap`; an idle pass resets
//! the delay to `base`.

use std::time::Duration;

use shared_bus::InMemoryEventBus;
use tokio::sync::watch;
use tracing::{debug, info};

/// Delay between redelivery passes.
#[derive(Debug, Clone)]
pub struct RedeliveryBackoff {
    base: Duration,
    cap: Duration,
    current: Duration,
}

impl RedeliveryBackoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap: cap.max(base),
            current: base,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Record a pass that redelivered `redelivered` letters.
    pub fn record(&mut self, redelivered: usize) {
        self.current = if redelivered == 0 {
            self.base
        } else {
            (self.current * 2).min(self.cap)
        };
    }
}

/// Run redelivery passes until `shutdown` turns `true` or its sender is
/// dropped.
pub async fn run(
    bus: InMemoryEventBus,
    mut backoff: RedeliveryBackoff,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        base_ms = backoff.current().as_millis() as u64,
        "Dead letter redelivery started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            () = tokio::time::sleep(backoff.current()) => {}
        }

        let redelivered = bus.redeliver_recoverable();
        backoff.record(redelivered);
        if redelivered > 0 {
            debug!(
                redelivered,
                next_ms = backoff.current().as_millis() as u64,
                "Redelivery pass"
            );
        }
    }

    debug!("Dead letter redelivery stopped");
}
