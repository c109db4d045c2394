use std::time::Duration;

use chronos_models::settings::ConnectivitySettings;
use tokio::{net::TcpStream, sync::watch};
use tokio_util::sync::CancellationToken;

/// Periodically checks that a remote host accepts TCP connections.
pub struct ConnectivityProbe {
    host: String,
    interval: Duration,
    timeout: Duration,
}

impl ConnectivityProbe {
    pub fn new(host: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            interval,
            timeout,
        }
    }

    pub fn from_settings(settings: &ConnectivitySettings) -> Self {
        Self::new(
            settings.host.clone(),
            Duration::from_millis(settings.interval_ms),
            Duration::from_millis(settings.timeout_ms),
        )
    }

    pub async fn check(&self) -> bool {
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(&self.host)).await,
            Ok(Ok(_))
        )
    }

    /// Publishes the connection status until `shutdown` is cancelled. Starts out offline.
    pub fn spawn(self, shutdown: CancellationToken) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            loop {
                let connected = self.check().await;
                tx.send_if_modified(|current| {
                    if *current == connected {
                        return false;
                    }
                    log::info!("Connectivity changed: connected = {connected}");
                    *current = connected;
                    true
                });

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn reachable_host_is_connected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let probe = ConnectivityProbe::new(
            address.to_string(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );

        assert!(probe.check().await);
    }

    #[tokio::test]
    async fn closed_port_is_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);
        let probe = ConnectivityProbe::new(
            address.to_string(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );

        assert!(!probe.check().await);
    }

    #[tokio::test]
    async fn spawned_probe_publishes_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let probe = ConnectivityProbe::new(
            address.to_string(),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );

        let mut status = probe.spawn(shutdown.clone());
        status.changed().await.unwrap();

        assert!(*status.borrow());
        shutdown.cancel();
    }
}
