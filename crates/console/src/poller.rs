//! Fixed-interval pollers feeding the console loop.
//!
//! [`StatusPoller`] asks `GET /api/status` on a fixed interval and reports
//! every answer back to the console loop. It stops on its own once the
//! module reports `running: false`, and immediately when its
//! [`CancellationToken`] is cancelled (view teardown or shutdown).
//!
//! [`VersionPoller`] asks `GET /api/version` for the update badge until the
//! loop shuts down.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use daps_client::ApiClient;

use crate::command::Internal;

pub(crate) struct StatusPoller {
    api: ApiClient,
    module: String,
    interval: Duration,
}

impl StatusPoller {
    pub(crate) fn new(api: ApiClient, module: impl Into<String>, interval: Duration) -> Self {
        Self {
            api,
            module: module.into(),
            interval,
        }
    }

    pub(crate) fn spawn(self, cancel: CancellationToken, tx: mpsc::UnboundedSender<Internal>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel, tx).await })
    }

    async fn run(&self, cancel: CancellationToken, tx: mpsc::UnboundedSender<Internal>) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(module = %self.module, "Status poller cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.api.status(&self.module).await {
                        Ok(status) => {
                            let message = Internal::RunStatus {
                                module: self.module.clone(),
                                running: status.running,
                            };
                            if tx.send(message).is_err() || !status.running {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(module = %self.module, error = %e, "Failed to poll run status");
                        }
                    }
                }
            }
        }
    }
}

pub(crate) struct VersionPoller {
    api: ApiClient,
    interval: Duration,
}

impl VersionPoller {
    pub(crate) fn new(api: ApiClient, interval: Duration) -> Self {
        Self { api, interval }
    }

    pub(crate) fn spawn(self, cancel: CancellationToken, tx: mpsc::UnboundedSender<Internal>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel, tx).await })
    }

    async fn run(&self, cancel: CancellationToken, tx: mpsc::UnboundedSender<Internal>) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Version poller cancelled");
                    break;
                }
                _ = interval.tick() => match self.api.version().await {
                    Ok(info) => {
                        if tx.send(Internal::VersionChecked { info }).is_err() {
                            break;
                        }
                    }
                    // The badge stays as it was.
                    Err(e) => tracing::warn!(error = %e, "Failed to check backend version"),
                },
            }
        }
    }
}
