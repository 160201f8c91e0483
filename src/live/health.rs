//! Periodic health check: reopen the live socket if it has dropped.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ConnectionState, LiveUpdateClient};

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Every `period`, call `connect()` if the client is Disconnected.
///
/// A client in Failed stays failed until someone reconnects it by hand.
/// Periods below one second are raised to one second.
pub fn spawn_health_check(
    client: LiveUpdateClient,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period.max(MIN_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Live health check stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if client.state() == ConnectionState::Disconnected {
                        info!("Live socket down, health check reconnecting");
                        client.connect();
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::live::{Connector, LiveError, LiveOptions, SocketChannel};
    use crate::session::{SessionStore, TOKEN_KEY};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use url::Url;

    #[derive(Default)]
    struct Refusing {
        opens: AtomicUsize,
    }

    #[async_trait]
    impl Connector for Refusing {
        async fn open(&self, _url: &Url) -> Result<SocketChannel, LiveError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Err(LiveError::Connect("refused".to_string()))
        }
    }

    fn client(connector: Arc<Refusing>, attempts: u32) -> LiveUpdateClient {
        let session = SessionStore::in_memory();
        session.set(TOKEN_KEY, "t1").unwrap();
        let mut options = LiveOptions::new("ws://pos.test", "/ws/admin").unwrap();
        options.max_reconnect_attempts = attempts;
        options.reconnect_delay = Duration::from_secs(3600);
        LiveUpdateClient::new(
            options,
            session,
            connector,
            EventBus::shared(),
            CancellationToken::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_disconnected_client() {
        let connector = Arc::new(Refusing::default());
        let client = client(connector.clone(), 10);
        let shutdown = CancellationToken::new();
        let handle = spawn_health_check(client.clone(), Duration::from_secs(30), shutdown.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(connector.opens.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.opens.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaves_failed_client_alone() {
        let connector = Arc::new(Refusing::default());
        let client = client(connector.clone(), 1);
        client.connect();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(client.state(), ConnectionState::Failed);

        let shutdown = CancellationToken::new();
        let _handle = spawn_health_check(client.clone(), Duration::from_secs(30), shutdown.clone());
        tokio::time::sleep(Duration::from_secs(95)).await;

        assert_eq!(connector.opens.load(Ordering::SeqCst), 1);
        shutdown.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_clamped() {
        let connector = Arc::new(Refusing::default());
        let client = client(connector.clone(), 10);
        let shutdown = CancellationToken::new();
        let handle = spawn_health_check(client, Duration::ZERO, shutdown.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(connector.opens.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
