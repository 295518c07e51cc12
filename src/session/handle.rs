use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

pub type SessionId = String;

/// A connected session and the sending side of its outbound channel.
///
/// The writer task on the other end of `sender` owns the WebSocket sink;
/// sends fail once the connection is gone, which delivery paths treat as
/// "already removed, skip".
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub sender: UnboundedSender<WsMessage>,
    /// Privileged sessions bypass the topic allow-list. Only the
    /// in-process ingestion subscriber is privileged.
    pub privileged: bool,
}

impl Session {
    /// Create a new session with a sender channel. The `id` is a UUID used
    /// to identify the session across broker and fanout operations.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            privileged: false,
        }
    }

    /// Create an internal privileged session with a well-known id.
    pub fn internal(id: &str, sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: id.to_string(),
            sender,
            privileged: true,
        }
    }
}
