//! Periodic expired-session sweeper.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use gatekeep_core::config::session::SessionConfig;

use super::authority::SessionAuthority;

/// Background worker that sweeps expired sessions on a fixed interval.
///
/// Runs decoupled from request handling and stops cleanly when the
/// cancellation signal fires, so the authority can be shut down without
/// orphaning the loop.
pub struct SessionSweeper {
    /// The authority whose sweep operation is invoked.
    authority: Arc<SessionAuthority>,
    /// Interval between sweeps.
    interval: Duration,
}

impl std::fmt::Debug for SessionSweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSweeper")
            .field("interval", &self.interval)
            .finish()
    }
}

impl SessionSweeper {
    /// Creates a sweeper from configuration.
    pub fn new(authority: Arc<SessionAuthority>, config: &SessionConfig) -> Self {
        Self {
            authority,
            interval: Duration::from_secs(config.sweep_interval_seconds.max(1)),
        }
    }

    /// Runs until the cancel signal flips to `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(interval_seconds = self.interval.as_secs(), "Session sweeper started");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so startup does not
        // race the store backend coming up.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("Session sweeper received shutdown signal");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.authority.sweep().await {
                        Ok(0) => debug!("Sweep found no expired sessions"),
                        Ok(count) => info!(count = count, "Sweep cycle completed"),
                        Err(e) => error!(error = %e, "Sweep cycle failed"),
                    }
                }
            }
        }

        info!("Session sweeper stopped");
    }

    /// Spawns the sweeper onto the runtime.
    pub fn spawn(self, cancel: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(cancel).await;
        })
    }
}
