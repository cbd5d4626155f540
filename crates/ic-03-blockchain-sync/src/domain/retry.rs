//! # Retry Policy
//!
//! Every peer call is bounded by a timeout and retried with exponential
//! backoff before the peer is given up on for the current attempt.
//!
//! With the defaults a peer is abandoned after 3 attempts and waits of
//! 200 ms and 400 ms between them; the next wait would be 800 ms and waits
//! never exceed `backoff_cap`.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use shared_types::NodeId;

use super::errors::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Bound on one call.
    pub timeout: Duration,
    /// Calls per peer before giving up.
    pub attempts: u32,
    /// Wait after the first failure.
    pub backoff_base: Duration,
    /// Upper bound on any wait.
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            attempts: 3,
            backoff_base: Duration::from_millis(200),
            backoff_cap: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry `n` (0-based).
    #[must_use]
    pub fn backoff(&self, n: u32) -> Duration {
        self.backoff_base
            .saturating_mul(1u32 << n.min(16))
            .min(self.backoff_cap)
    }

    /// Run `call` against `peer` until it succeeds or attempts run out.
    ///
    /// # Errors
    ///
    /// The last failure: the peer's own error or `SyncError::Timeout`.
    pub async fn run<T, F, Fut>(&self, peer: &NodeId, mut call: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let attempts = self.attempts.max(1);
        let mut last = SyncError::NoPeers;

        for attempt in 0..attempts {
            match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => last = e,
                Err(_) => {
                    last = SyncError::Timeout {
                        peer: peer.clone(),
                        after_ms: self.timeout.as_millis() as u64,
                    }
                }
            }

            if attempt + 1 < attempts {
                let delay = self.backoff(attempt);
                debug!(
                    peer = %peer,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %last,
                    "[ic-03] Peer call failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last)
    }
}
