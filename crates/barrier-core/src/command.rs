//! Inbound commands and the queue that carries them.
//!
//! The bus gateway's event loop is the single producer; the coordinating
//! loop is the single consumer and polls without blocking.

use std::fmt;

use tokio::sync::mpsc;
use tracing::warn;

/// A command received on `barrier/commands/{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open,
    Close,
    /// Anything else; kept verbatim for logging.
    Unknown(String),
}

impl Command {
    /// Exact, case-sensitive match.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "open" => Self::Open,
            "close" => Self::Close,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
            Self::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// Create a connected sender/queue pair.
pub fn command_queue() -> (CommandSender, CommandQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, CommandQueue { rx })
}

/// Producer half, owned by the bus gateway.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<String>,
}

impl CommandSender {
    /// Decode a raw payload and enqueue it.
    ///
    /// Payloads that are not valid UTF-8 are logged and discarded. Returns
    /// whether the command was queued.
    pub fn enqueue(&self, payload: &[u8]) -> bool {
        match std::str::from_utf8(payload) {
            Ok(text) => self.enqueue_text(text),
            Err(e) => {
                warn!(
                    "Discarding malformed command payload ({}): {}",
                    e,
                    String::from_utf8_lossy(payload)
                );
                false
            }
        }
    }

    pub fn enqueue_text(&self, text: &str) -> bool {
        if self.tx.send(text.to_string()).is_err() {
            warn!("Command queue is closed, dropping command {}", text);
            return false;
        }
        true
    }
}

/// Consumer half, owned by the coordinating loop.
#[derive(Debug)]
pub struct CommandQueue {
    rx: mpsc::UnboundedReceiver<String>,
}

impl CommandQueue {
    /// Dequeue the oldest command, if any, without waiting.
    pub fn try_next(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(Command::parse("open"), Command::Open);
        assert_eq!(Command::parse("close"), Command::Close);
        assert_eq!(Command::parse("Open"), Command::Unknown("Open".to_string()));
        assert_eq!(Command::parse(" close"), Command::Unknown(" close".to_string()));
        assert_eq!(Command::parse("foo").to_string(), "foo");
    }

    #[test]
    fn test_queue_is_fifo() {
        let (sender, mut queue) = command_queue();
        assert!(sender.enqueue(b"open"));
        assert!(sender.enqueue(b"close"));
        assert!(sender.enqueue(b"foo"));

        assert_eq!(queue.try_next().as_deref(), Some("open"));
        assert_eq!(queue.try_next().as_deref(), Some("close"));
        assert_eq!(queue.try_next().as_deref(), Some("foo"));
        assert_eq!(queue.try_next(), None);
    }

    #[test]
    fn test_malformed_payload_is_discarded() {
        let (sender, mut queue) = command_queue();
        assert!(!sender.enqueue(&[0xff, 0xfe, 0x00]));
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn test_closed_queue() {
        let (sender, queue) = command_queue();
        drop(queue);
        assert!(!sender.enqueue_text("open"));
    }
}
