// Stats retrieval and periodic polling

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::transport::StatsReport;

use super::manager::Client;
use super::types::ClientStats;

impl Client {
    /// Fetch transport stats, for one track or for the whole session
    pub async fn get_stats(&self, track_id: Option<&str>) -> ClientResult<StatsReport> {
        self.require_open("get_stats")?;
        self.inner.transport.stats(track_id).await
    }

    /// Log the session's stats every `interval` (default from the config)
    ///
    /// Replaces a previous polling task. Polling stops by itself when the
    /// session starts closing.
    pub fn start_stats_polling(&self, interval: Option<Duration>) -> ClientResult<()> {
        self.require_open("start_stats_polling")?;

        let period = interval.unwrap_or_else(|| self.inner.config.stats_interval());
        let transport = self.inner.transport.clone();
        let mut state_rx = self.inner.state_tx.subscribe();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = state_rx.changed() => {
                        if changed.is_err() || !state_rx.borrow().is_active() {
                            break;
                        }
                        continue;
                    }
                }
                if !state_rx.borrow().is_active() {
                    break;
                }
                match transport.stats(None).await {
                    Ok(report) => {
                        let mut entries: Vec<_> = report.values().collect();
                        entries.sort_by(|a, b| a.id.cmp(&b.id));
                        for stats in entries {
                            debug!(
                                "stats {} type={} ts={} {}",
                                stats.id,
                                stats.stats_type,
                                stats.timestamp_us,
                                serde_json::Value::Object(stats.statistics.clone())
                            );
                        }
                        info!("Polled {} stats entries", report.len());
                    }
                    Err(e) => warn!("Stats polling failed: {}", e),
                }
            }
            debug!("Stats polling task finished");
        });

        {
            // Teardown moves to Closing before it takes the task, so a task
            // stored after that take is caught by this check.
            let mut slot = self.inner.stats_task.lock();
            if let Some(previous) = slot.replace(task) {
                previous.abort();
            }
            let state = self.state();
            if !state.is_active() {
                if let Some(task) = slot.take() {
                    task.abort();
                }
                return Err(ClientError::invalid_state("start_stats_polling", state));
            }
        }
        info!("Stats polling every {:?}", period);
        Ok(())
    }

    /// Returns `true` if polling was running
    pub fn stop_stats_polling(&self) -> bool {
        self.inner.stop_stats_polling()
    }

    pub fn is_stats_polling(&self) -> bool {
        self.inner
            .stats_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Snapshot of the current session
    pub async fn get_client_stats(&self) -> ClientStats {
        let session = self.inner.session.read().await;
        ClientStats {
            state: self.state(),
            connection_id: session.connection_id.clone(),
            local_tracks: session.local_tracks.len(),
            remote_connections: session.remote_connections.len(),
            remote_tracks: session.remote_connections.iter().map(|c| c.tracks.len()).sum(),
            opened_at: session.opened_at,
            stats_polling: self.is_stats_polling(),
        }
    }
}
