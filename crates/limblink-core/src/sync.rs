//! Control channel transport.
//!
//! A background thread owns the WebSocket to the controller daemon and
//! talks to the rest of the app over std mpsc channels. The thread also
//! drives reconnection: when the link fails it backs off per
//! [`ReconnectPolicy`] and tries again, until the policy says stop or
//! the owner closes the channel.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tungstenite::{connect, Message, WebSocket};
use url::Url;

/// Connection state as shown to the operator. `Connecting` covers the
/// whole automatic retry cycle, not just the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Raw transport events handed up from the socket thread.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Link established (or re-established)
    Connected,
    /// An established link ended, whether asked for or not
    Disconnected,
    /// One connect attempt failed; repeats once per retry
    ConnectFailed(String),
    /// A transport fault worth logging but not acting on
    Error(String),
    /// A text frame from the controller, unparsed
    Message(String),
}

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// Backoff schedule for automatic reconnection.
///
/// Delays double from `initial_delay` up to `max_delay`. After
/// `max_attempts` consecutive failures the thread gives up and exits;
/// reconnecting after that takes an explicit `connect` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl ReconnectPolicy {
    /// Whether another attempt should follow this many consecutive failures
    pub fn should_retry(&self, failures: u32) -> bool {
        failures < self.max_attempts
    }

    /// Delay before the next attempt after `failures` consecutive
    /// failures (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let doublings = failures.saturating_sub(1).min(31);
        let millis = self
            .initial_delay
            .as_millis()
            .saturating_mul(1u128 << doublings);
        Duration::from_millis(millis.min(self.max_delay.as_millis()) as u64)
    }
}

/// How one established connection ended, seen from the socket thread.
enum ConnectionEnd {
    /// The owner asked for the close; do not reconnect.
    Closed,
    /// The peer went away or the transport failed; reconnect.
    Dropped,
    /// The owning side of the command channel is gone; exit quietly.
    ChannelGone,
}

/// WebSocket client for native platforms.
///
/// Uses a background thread for non-blocking operation. `connect`
/// returns as soon as the thread is spawned; progress arrives later
/// through `poll_events`. Sends are fire-and-forget, and messages
/// queued while the link is down are dropped.
pub struct NativeWebSocket {
    policy: ReconnectPolicy,
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Option<Receiver<ChannelEvent>>,
    /// Handle to the WebSocket thread.
    _thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    /// Create a new disconnected client with the default retry policy.
    pub fn new() -> Self {
        Self::with_policy(ReconnectPolicy::default())
    }

    pub fn with_policy(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Start connecting to a controller daemon.
    pub fn connect(&mut self, url: &str) -> Result<(), String> {
        if self.cmd_tx.is_some() {
            return Err("Already connected".to_string());
        }

        // Validate URL before spawning anything
        let parsed = Url::parse(url).map_err(|e| format!("Invalid URL: {}", e))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(format!("Invalid WebSocket URL scheme: {}", parsed.scheme()));
        }

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<ChannelEvent>();
        let policy = self.policy;
        let url = url.to_string();

        let handle = thread::spawn(move || {
            log::info!("Control channel thread: connecting to {}", url);
            run_channel(&url, policy, &cmd_rx, &event_tx);
            log::info!("Control channel thread exiting");
        });

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);

        Ok(())
    }

    /// Ask the thread to close the link and shut down.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
    }

    /// Queue a text frame for sending.
    pub fn send(&self, msg: &str) -> Result<(), String> {
        if let Some(ref tx) = self.cmd_tx {
            tx.send(WsCommand::Send(msg.to_string()))
                .map_err(|e| format!("Send failed: {}", e))
        } else {
            Err("Not connected".to_string())
        }
    }

    /// Poll for pending events (non-blocking).
    pub fn poll_events(&mut self) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        if let Some(ref rx) = self.event_rx {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        events
    }
}

impl Default for NativeWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Thread body: connect, serve, back off and reconnect until told to stop.
fn run_channel(
    url: &str,
    policy: ReconnectPolicy,
    cmd_rx: &Receiver<WsCommand>,
    event_tx: &Sender<ChannelEvent>,
) {
    let mut failures: u32 = 0;
    loop {
        match connect(url) {
            Ok((mut socket, response)) => {
                log::info!("Control channel connected, status: {}", response.status());
                failures = 0;
                if event_tx.send(ChannelEvent::Connected).is_err() {
                    return;
                }

                // Short read timeout on the underlying TCP stream so the
                // loop keeps servicing the command channel between frames.
                {
                    let stream = socket.get_mut();
                    match stream {
                        tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
                            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                        }
                        #[allow(unreachable_patterns)]
                        _ => {
                            log::debug!("TLS or other stream - using default timeout handling");
                        }
                    }
                }

                match serve_connection(&mut socket, cmd_rx, event_tx) {
                    ConnectionEnd::Closed => {
                        let _ = event_tx.send(ChannelEvent::Disconnected);
                        return;
                    }
                    ConnectionEnd::Dropped => {
                        if event_tx.send(ChannelEvent::Disconnected).is_err() {
                            return;
                        }
                        // Fall through and dial again
                    }
                    ConnectionEnd::ChannelGone => return,
                }
            }
            Err(e) => {
                failures += 1;
                log::error!("Control channel connection failed: {}", e);
                let report = ChannelEvent::ConnectFailed(format!("Connection failed: {}", e));
                if event_tx.send(report).is_err() {
                    return;
                }
                if !policy.should_retry(failures) {
                    log::warn!(
                        "Control channel: giving up after {} failed attempts",
                        failures
                    );
                    return;
                }
                let delay = policy.delay_for(failures);
                log::info!(
                    "Control channel: retrying in {:?} ({}/{})",
                    delay,
                    failures,
                    policy.max_attempts
                );
                // Park on the command channel so a close can interrupt
                // the backoff wait.
                match cmd_rx.recv_timeout(delay) {
                    Ok(WsCommand::Close) => return,
                    Ok(WsCommand::Send(_)) => {} // nothing to send it to
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        }
    }
}

/// Serve one established connection until it ends one way or another.
fn serve_connection(
    socket: &mut WebSocket<tungstenite::stream::MaybeTlsStream<std::net::TcpStream>>,
    cmd_rx: &Receiver<WsCommand>,
    event_tx: &Sender<ChannelEvent>,
) -> ConnectionEnd {
    loop {
        // Check for commands (non-blocking)
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(msg)) => {
                log::debug!("Control channel sending: {}", &msg[..msg.len().min(100)]);
                if let Err(e) = socket.send(Message::Text(msg)) {
                    log::error!("Control channel send error: {}", e);
                    let _ = event_tx.send(ChannelEvent::Error(format!("Send failed: {}", e)));
                    return ConnectionEnd::Dropped;
                }
            }
            Ok(WsCommand::Close) => {
                log::info!("Control channel close requested");
                let _ = socket.close(None);
                return ConnectionEnd::Closed;
            }
            Err(TryRecvError::Disconnected) => {
                let _ = socket.close(None);
                return ConnectionEnd::ChannelGone;
            }
            Err(TryRecvError::Empty) => {}
        }

        // Check for incoming frames (with timeout)
        match socket.read() {
            Ok(Message::Text(txt)) => {
                log::debug!("Control channel received: {}", &txt[..txt.len().min(100)]);
                if event_tx.send(ChannelEvent::Message(txt)).is_err() {
                    return ConnectionEnd::ChannelGone;
                }
            }
            Ok(Message::Ping(data)) => {
                // Respond to ping with pong
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("Control channel received close frame");
                return ConnectionEnd::Dropped;
            }
            Ok(_) => {} // Ignore binary, pong
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // Timeout on read, keep looping
            }
            Err(e) => {
                log::error!("Control channel read error: {}", e);
                let _ = event_tx.send(ChannelEvent::Error(format!("WebSocket error: {}", e)));
                return ConnectionEnd::Dropped;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(5000));
        assert_eq!(policy.delay_for(9), Duration::from_millis(5000));
    }

    #[test]
    fn test_backoff_is_finite_for_huge_failure_counts() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(5000));
    }

    #[test]
    fn test_retries_stop_after_max_attempts() {
        let policy = ReconnectPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(9));
        assert!(!policy.should_retry(10));
        assert!(!policy.should_retry(11));
    }

    #[test]
    fn test_connect_rejects_bad_urls() {
        let mut ws = NativeWebSocket::new();
        assert!(ws.connect("not a url").is_err());
        assert!(ws.connect("http://localhost:5000/ws").is_err());
        assert!(ws.poll_events().is_empty());
    }

    #[test]
    fn test_send_requires_a_connection() {
        let ws = NativeWebSocket::new();
        assert!(ws.send("{}").is_err());
    }
}
