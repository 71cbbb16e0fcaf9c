use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

/// One-shot deadline timer bound to a job id.
///
/// `on_expire` runs once at `deadline` unless [`disarm`](Self::disarm) was
/// called first. Whether expiry actually fails the job is up to the
/// resolution gate: an expiry after the job resolved is a no-op there.
#[derive(Debug)]
pub struct Watchdog {
    disarm: CancellationToken,
}

impl Watchdog {
    pub fn arm<F>(job_id: Uuid, deadline: Instant, on_expire: F) -> Self
    where
        F: FnOnce(Uuid) + Send + 'static,
    {
        let disarm = CancellationToken::new();
        let token = disarm.clone();

        trace!(target: "formation.watchdog", %job_id, "armed");
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(target: "formation.watchdog", %job_id, "disarmed");
                }
                _ = sleep_until(deadline) => {
                    debug!(target: "formation.watchdog", %job_id, "deadline reached");
                    // Spent: later disarms are no-ops.
                    token.cancel();
                    on_expire(job_id);
                }
            }
        });

        Self { disarm }
    }

    /// Prevents a pending expiry. Harmless after the timer fired.
    pub fn disarm(&self) {
        self.disarm.cancel();
    }

    /// `true` until the timer fired or was disarmed.
    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        !self.disarm.is_cancelled()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.disarm.cancel();
    }
}
