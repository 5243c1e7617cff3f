//! Pub/sub transport capability, a Redis publisher and an in-process broker.

use crate::error::{BroadcastError, BroadcastResult};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Buffered messages per channel before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Connect/publish/disconnect over named channels.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    async fn connect(&self) -> BroadcastResult<()>;

    async fn disconnect(&self) -> BroadcastResult<()>;

    /// Deliver an already serialized payload to `channel`.
    async fn publish(&self, channel: &str, payload: String) -> BroadcastResult<()>;
}

/// Broker living inside the current process.
///
/// Each channel is a `tokio::sync::broadcast` sender created on first use.
/// Publishing to a channel nobody subscribed to is not an error.
pub struct LocalTransport {
    url: String,
    open: AtomicBool,
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
}

impl LocalTransport {
    /// `url` identifies the broker in logs, e.g. `redis://localhost:6379/3`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            open: AtomicBool::new(false),
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Receive every payload published to `channel` from now on.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        let mut channels = self.channels.write();
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("url", &self.url)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PubSubTransport for LocalTransport {
    async fn connect(&self) -> BroadcastResult<()> {
        self.open.store(true, Ordering::SeqCst);
        tracing::debug!(url = %self.url, "Broker connection opened");
        Ok(())
    }

    async fn disconnect(&self) -> BroadcastResult<()> {
        self.open.store(false, Ordering::SeqCst);
        tracing::debug!(url = %self.url, "Broker connection closed");
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: String) -> BroadcastResult<()> {
        if !self.is_open() {
            return Err(BroadcastError::Closed);
        }

        let channels = self.channels.read();
        // send() only fails when there are no receivers
        let delivered = channels
            .get(channel)
            .map_or(0, |sender| sender.send(payload).unwrap_or(0));

        tracing::trace!(channel = %channel, delivered, "Payload delivered");
        Ok(())
    }
}

/// Publishes with `PUBLISH` on a Redis server.
///
/// One multiplexed connection is held between `connect` and `disconnect`.
pub struct RedisTransport {
    url: String,
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisTransport {
    /// Parse `url` (`redis://host:port/db`). Nothing is opened until
    /// [`PubSubTransport::connect`].
    pub fn new(url: impl Into<String>) -> BroadcastResult<Self> {
        let url = url.into();
        let client = redis::Client::open(url.as_str()).map_err(|e| {
            BroadcastError::ConfigError(format!("Invalid broker URL {}: {}", url, e))
        })?;

        Ok(Self {
            url,
            client,
            connection: Mutex::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_open(&self) -> bool {
        self.connection.lock().is_some()
    }
}

impl std::fmt::Debug for RedisTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTransport")
            .field("url", &self.url)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PubSubTransport for RedisTransport {
    async fn connect(&self) -> BroadcastResult<()> {
        let connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %self.url, "Broker connection failed");
                BroadcastError::Transport(format!("Failed to connect to {}: {}", self.url, e))
            })?;

        *self.connection.lock() = Some(connection);
        tracing::debug!(url = %self.url, "Broker connection opened");
        Ok(())
    }

    async fn disconnect(&self) -> BroadcastResult<()> {
        // Dropping the last handle closes the socket.
        self.connection.lock().take();
        tracing::debug!(url = %self.url, "Broker connection closed");
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: String) -> BroadcastResult<()> {
        let mut connection = self.connection.lock().clone().ok_or(BroadcastError::Closed)?;

        let receivers: i64 = connection
            .publish(channel, payload)
            .await
            .map_err(|e| BroadcastError::Transport(format!("PUBLISH to {} failed: {}", channel, e)))?;

        tracing::trace!(channel = %channel, receivers, "Payload published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};

    type Commands = Arc<Mutex<Vec<Vec<String>>>>;

    /// Minimal RESP server: answers `PUBLISH` with one receiver and
    /// everything else with `+OK`.
    async fn fake_redis() -> (String, Commands) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("redis://{}/3", listener.local_addr().unwrap());
        let commands = Commands::default();

        let seen = commands.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_resp(stream, seen.clone()));
            }
        });

        (url, commands)
    }

    async fn serve_resp(stream: TcpStream, seen: Commands) {
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);

        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).await.unwrap_or(0) == 0 {
                return;
            }
            let count: usize = header.trim_end().trim_start_matches('*').parse().unwrap_or(0);

            let mut command = Vec::with_capacity(count);
            for _ in 0..count {
                let mut len = String::new();
                if reader.read_line(&mut len).await.unwrap_or(0) == 0 {
                    return;
                }
                let len: usize = len.trim_end().trim_start_matches('$').parse().unwrap_or(0);
                let mut arg = vec![0; len + 2];
                if reader.read_exact(&mut arg).await.is_err() {
                    return;
                }
                arg.truncate(len);
                command.push(String::from_utf8_lossy(&arg).into_owned());
            }

            let is_publish = command
                .first()
                .is_some_and(|name| name.eq_ignore_ascii_case("PUBLISH"));
            let reply: &[u8] = if is_publish { b":1\r\n" } else { b"+OK\r\n" };
            seen.lock().push(command);
            if write.write_all(reply).await.is_err() {
                return;
            }
        }
    }

    #[tokio::test]
    async fn test_redis_publish_sends_publish_command() {
        let (url, commands) = fake_redis().await;
        let transport = RedisTransport::new(url).unwrap();

        transport.connect().await.unwrap();
        assert!(transport.is_open());
        transport
            .publish("jobs", "{\"a\":1}".to_string())
            .await
            .unwrap();

        let expected = vec![
            "PUBLISH".to_string(),
            "jobs".to_string(),
            "{\"a\":1}".to_string(),
        ];
        assert!(commands.lock().contains(&expected));

        transport.disconnect().await.unwrap();
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_redis_publish_before_connect_is_closed() {
        let transport = RedisTransport::new("redis://localhost:6379/3").unwrap();

        let result = transport.publish("jobs", "x".to_string()).await;

        assert!(matches!(result, Err(BroadcastError::Closed)));
    }

    #[tokio::test]
    async fn test_redis_unreachable_broker_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = RedisTransport::new(format!("redis://{}/0", addr)).unwrap();
        let result = transport.connect().await;

        assert!(matches!(result, Err(BroadcastError::Transport(_))));
        assert!(!transport.is_open());
    }

    #[test]
    fn test_redis_invalid_url_is_config_error() {
        let result = RedisTransport::new("not a broker url");
        assert!(matches!(result, Err(BroadcastError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let transport = LocalTransport::new("redis://localhost:6379/3");
        let mut receiver = transport.subscribe("jobs");

        transport.connect().await.unwrap();
        transport.publish("jobs", "{\"a\":1}".to_string()).await.unwrap();

        assert_eq!(receiver.recv().await.unwrap(), "{\"a\":1}");
        assert_eq!(transport.subscriber_count("jobs"), 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let transport = LocalTransport::new("redis://localhost:6379/3");
        transport.connect().await.unwrap();

        transport.publish("nobody", "x".to_string()).await.unwrap();
        assert_eq!(transport.subscriber_count("nobody"), 0);
    }

    #[tokio::test]
    async fn test_publish_while_disconnected_is_closed() {
        let transport = LocalTransport::new("redis://localhost:6379/3");

        let result = transport.publish("jobs", "x".to_string()).await;
        assert!(matches!(result, Err(BroadcastError::Closed)));

        transport.connect().await.unwrap();
        transport.disconnect().await.unwrap();
        let result = transport.publish("jobs", "x".to_string()).await;
        assert!(matches!(result, Err(BroadcastError::Closed)));
    }
}
