// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::service::{IntelService, RefreshStatus, Trigger};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;

/// Handle to the background poller. Dropping it leaves the poller running;
/// call [`PollerHandle::stop`] to cancel.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Cancels the timer. A fetch already spawned runs to completion.
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Refresh immediately, then every `every`. Each tick spawns its own refresh,
/// so a slow fetch never delays the timer; overlap is handled by the
/// service's single-flight guard.
pub fn spawn_poller(service: Arc<IntelService>, every: Duration) -> PollerHandle {
    let every = every.max(Duration::from_secs(1));
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            counter!("intel_poll_ticks_total").increment(1);
            tracing::debug!(target: "scheduler", every_secs = every.as_secs(), "poll tick");

            let svc = Arc::clone(&service);
            tokio::spawn(async move {
                if let RefreshStatus::Completed(outcome) = svc.refresh(Trigger::Timer).await {
                    tracing::info!(
                        target: "scheduler",
                        events = outcome.events.len(),
                        error = outcome.error.as_ref().map(|e| e.as_str()),
                        "scheduled refresh done"
                    );
                }
            });
        }
    });
    PollerHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::client::{RemoteResponse, ScriptedClient};
    use crate::intel::IntelPipeline;

    fn service() -> (Arc<IntelService>, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient::always(Ok(RemoteResponse::text("[]"))));
        let svc = IntelService::new(IntelPipeline::new(client.clone()));
        (Arc::new(svc), client)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_immediately_then_on_interval() {
        let (svc, client) = service();
        let poller = spawn_poller(svc.clone(), Duration::from_secs(600));

        settle().await;
        assert_eq!(client.calls(), 1);

        tokio::time::advance(Duration::from_secs(599)).await;
        settle().await;
        assert_eq!(client.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(client.calls(), 2);

        poller.stop();
        tokio::time::advance(Duration::from_secs(1_200)).await;
        settle().await;
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_during_fetch_is_dropped() {
        let (svc, client) = service();
        let guard = svc.try_begin().expect("free");
        let poller = spawn_poller(svc.clone(), Duration::from_secs(60));
        settle().await;
        assert_eq!(client.calls(), 0);

        drop(guard);
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(client.calls(), 1);
        poller.stop();
    }
}
