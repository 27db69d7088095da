//! Channel refresh worker
//!
//! Watch channels have a bounded lifetime; the remote service drops them at
//! their expiration. This worker periodically sweeps for channels expiring
//! within a lead window and replaces each one. Join handles are tracked,
//! cancellation is explicit, and one channel's failure never stops the
//! sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use meridian_core::SyncRepository;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::watch::WatchChannelManager;

/// Configuration for the refresh worker.
#[derive(Debug, Clone)]
pub struct RefreshWorkerConfig {
    /// Interval between sweeps
    pub poll_interval: Duration,
    /// Channels expiring within this window are refreshed
    pub lead_time: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for RefreshWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3_600),
            lead_time: Duration::from_secs(24 * 3_600),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl RefreshWorkerConfig {
    /// Derive worker timings from the application sync settings.
    pub fn from_sync_config(config: &meridian_domain::SyncConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.refresh_poll_interval_secs),
            lead_time: Duration::from_secs(config.refresh_lead_time_hours.max(0) as u64 * 3_600),
            ..Self::default()
        }
    }
}

/// Background channel refresher with explicit lifecycle management.
pub struct ChannelRefreshWorker {
    manager: Arc<WatchChannelManager>,
    sync_repo: Arc<dyn SyncRepository>,
    config: RefreshWorkerConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl ChannelRefreshWorker {
    pub fn new(
        manager: Arc<WatchChannelManager>,
        sync_repo: Arc<dyn SyncRepository>,
        config: RefreshWorkerConfig,
    ) -> Self {
        Self {
            manager,
            sync_repo,
            config,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Start the worker, spawning the background sweep task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), String> {
        if self.is_running() {
            return Err("Worker already running".to_string());
        }

        info!("Starting channel refresh worker");

        self.cancellation = CancellationToken::new();

        let manager = Arc::clone(&self.manager);
        let sync_repo = Arc::clone(&self.sync_repo);
        let poll_interval = self.config.poll_interval;
        let lead_time = self.config.lead_time;
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Refresh worker loop cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        match Self::run_sweep(&manager, &sync_repo, lead_time).await {
                            Ok(refreshed) if refreshed > 0 => {
                                info!(refreshed, "refresh sweep finished");
                            }
                            Ok(_) => debug!("refresh sweep found nothing to do"),
                            Err(e) => warn!(error = %e, "refresh sweep failed"),
                        }
                    }
                }
            }
        });

        self.task_handle = Some(handle);
        info!("Channel refresh worker started");
        Ok(())
    }

    /// Stop the worker and wait for the sweep task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), String> {
        if !self.is_running() {
            return Err("Worker not running".to_string());
        }

        info!("Stopping channel refresh worker");

        self.cancellation.cancel();

        if let Some(handle) = self.task_handle.take() {
            match tokio::time::timeout(self.config.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Worker task panicked: {}", e);
                    return Err("Worker task panicked".to_string());
                }
                Err(_) => {
                    warn!("Worker task did not complete within timeout");
                    return Err("Worker task timeout".to_string());
                }
            }
        }

        info!("Channel refresh worker stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a worker instance is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// One sweep: refresh every channel expiring within the lead window.
    async fn run_sweep(
        manager: &Arc<WatchChannelManager>,
        sync_repo: &Arc<dyn SyncRepository>,
        lead_time: Duration,
    ) -> Result<usize, String> {
        let cutoff = Utc::now()
            + chrono::Duration::from_std(lead_time)
                .map_err(|e| format!("lead time out of range: {e}"))?;

        let expiring = sync_repo
            .expiring_channels(cutoff)
            .await
            .map_err(|e| format!("failed to list expiring channels: {e}"))?;

        if expiring.is_empty() {
            return Ok(0);
        }

        debug!(count = expiring.len(), "refreshing expiring channels");

        let mut refreshed = 0;
        for (user_id, channel) in expiring {
            match manager.refresh_watching(&user_id, &channel).await {
                Ok(fresh) => {
                    debug!(
                        user_id = %user_id,
                        calendar_id = %channel.calendar_id,
                        new_channel_id = %fresh.channel_id,
                        "channel refreshed"
                    );
                    refreshed += 1;
                }
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        channel_id = %channel.channel_id,
                        error = %e,
                        "failed to refresh channel"
                    );
                }
            }
        }

        Ok(refreshed)
    }
}

impl Drop for ChannelRefreshWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("ChannelRefreshWorker dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
