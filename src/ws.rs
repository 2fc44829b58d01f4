use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket, connect};

use crate::models::StatusUpdate;
use crate::stomp::Frame;

/// Fixed reconnect delay. The retry loop is deliberately dumb: no backoff
/// growth, no attempt cap — the full connect sequence is retried until the
/// view goes away.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

const READ_TIMEOUT: Duration = Duration::from_millis(400);
const SUBSCRIPTION_ID: &str = "sub-0";

#[derive(Debug)]
pub enum FeedEvent {
    Connected,
    Disconnected,
    Update(StatusUpdate),
}

#[derive(Debug, Error)]
enum FeedError {
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("broker error: {0}")]
    Broker(String),
    #[error("connection closed by server")]
    Closed,
}

/// Background subscription to `/topic/charging/{sessionId}`. Owns the one
/// extra thread in the program; everything crosses back over the channel.
pub struct StatusFeed {
    events: Receiver<FeedEvent>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StatusFeed {
    pub fn connect(ws_url: String, session_id: String) -> Self {
        let (sender, events) = channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = thread::spawn(move || run_loop(&ws_url, &session_id, &sender, &stop_flag));
        Self {
            events,
            stop,
            handle: Some(handle),
        }
    }

    /// Drains whatever arrived since the last UI tick.
    pub fn drain(&self) -> Vec<FeedEvent> {
        self.events.try_iter().collect()
    }

    /// Signals the reader thread and waits for it to send DISCONNECT and
    /// close the socket.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatusFeed {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn run_loop(url: &str, session_id: &str, events: &Sender<FeedEvent>, stop: &AtomicBool) {
    while !stop.load(Ordering::Relaxed) {
        match run_connection(url, session_id, events, stop) {
            Ok(()) => break,
            Err(err) => warn!(session_id, error = %err, "charging feed dropped"),
        }
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if events.send(FeedEvent::Disconnected).is_err() {
            break;
        }
        sleep_with_stop(RETRY_DELAY, stop);
    }
}

fn run_connection(
    url: &str,
    session_id: &str,
    events: &Sender<FeedEvent>,
    stop: &AtomicBool,
) -> Result<(), FeedError> {
    let (mut socket, _) = connect(url)?;
    set_read_timeout(&mut socket);

    socket.send(Message::Text(Frame::connect(&host_of(url)).serialize()))?;
    wait_for_connected(&mut socket, stop)?;

    socket.send(Message::Text(
        Frame::subscribe(SUBSCRIPTION_ID, &topic_destination(session_id)).serialize(),
    ))?;
    // Ask the server for an immediate status push instead of waiting for
    // the next broadcast tick.
    socket.send(Message::Text(
        Frame::send(&request_destination(session_id), "{}").serialize(),
    ))?;

    info!(session_id, "subscribed to charging feed");
    let _ = events.send(FeedEvent::Connected);

    loop {
        if stop.load(Ordering::Relaxed) {
            let _ = socket.send(Message::Text(Frame::disconnect().serialize()));
            let _ = socket.close(None);
            return Ok(());
        }
        match socket.read() {
            Ok(Message::Text(text)) => {
                let Ok(frame) = Frame::parse(&text) else {
                    warn!(session_id, "discarding unparsable frame");
                    continue;
                };
                match frame.command.as_str() {
                    "MESSAGE" => match serde_json::from_str::<StatusUpdate>(&frame.body) {
                        Ok(update) => {
                            if events.send(FeedEvent::Update(update)).is_err() {
                                return Ok(());
                            }
                        }
                        Err(err) => warn!(session_id, error = %err, "bad status payload"),
                    },
                    "ERROR" => {
                        let message = frame
                            .header_value("message")
                            .unwrap_or("unspecified")
                            .to_string();
                        return Err(FeedError::Broker(message));
                    }
                    _ => {}
                }
            }
            Ok(Message::Ping(payload)) => {
                socket.send(Message::Pong(payload))?;
            }
            Ok(Message::Close(_)) => return Err(FeedError::Closed),
            Ok(_) => {}
            Err(tungstenite::Error::Io(err))
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn wait_for_connected(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    stop: &AtomicBool,
) -> Result<(), FeedError> {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if stop.load(Ordering::Relaxed) || Instant::now() > deadline {
            return Err(FeedError::Closed);
        }
        match socket.read() {
            Ok(Message::Text(text)) => {
                let frame = Frame::parse(&text)
                    .map_err(|err| FeedError::Broker(err.to_string()))?;
                return match frame.command.as_str() {
                    "CONNECTED" => Ok(()),
                    "ERROR" => Err(FeedError::Broker(
                        frame
                            .header_value("message")
                            .unwrap_or("handshake rejected")
                            .to_string(),
                    )),
                    other => Err(FeedError::Broker(format!("unexpected frame {other}"))),
                };
            }
            Ok(Message::Close(_)) => return Err(FeedError::Closed),
            Ok(_) => {}
            Err(tungstenite::Error::Io(err))
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut => {}
            Err(err) => return Err(err.into()),
        }
    }
}

fn set_read_timeout(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>) {
    // Short socket timeout so the stop flag stays responsive.
    if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
        let _ = stream.set_read_timeout(Some(READ_TIMEOUT));
    }
}

fn sleep_with_stop(total: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + total;
    while Instant::now() < deadline {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
}

pub fn topic_destination(session_id: &str) -> String {
    format!("/topic/charging/{session_id}")
}

pub fn request_destination(session_id: &str) -> String {
    format!("/app/charging/status/{session_id}")
}

/// Host portion of a ws:// url, for the STOMP CONNECT header.
fn host_of(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    without_scheme
        .split(['/', '?'])
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destinations_are_scoped_by_session() {
        assert_eq!(topic_destination("17"), "/topic/charging/17");
        assert_eq!(request_destination("17"), "/app/charging/status/17");
    }

    #[test]
    fn host_is_extracted_from_ws_urls() {
        assert_eq!(host_of("ws://localhost:8080/ws"), "localhost:8080");
        assert_eq!(host_of("wss://charge.example.com/ws?x=1"), "charge.example.com");
        assert_eq!(host_of("localhost:8080"), "localhost:8080");
    }
}
