//! Live transport connections and outbound delivery.
//!
//! Each socket task owns the receiving half of an unbounded channel; the
//! registry keeps the sending half keyed by connection id.

use plotline_protocol::ServerMessage;
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

pub type ConnectionId = Uuid;
pub type Outbox = mpsc::UnboundedSender<String>;

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Outbox>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ConnectionId, outbox: Outbox) {
        if self.connections.insert(id, outbox).is_some() {
            tracing::warn!(connection_id = %id, "Connection re-registered, replacing outbox");
        } else {
            tracing::debug!(connection_id = %id, "Connection registered");
        }
    }

    /// Dropping the outbox ends the socket's writer task, which closes the socket.
    pub fn unregister(&mut self, id: ConnectionId) -> bool {
        let removed = self.connections.remove(&id).is_some();
        if removed {
            tracing::debug!(connection_id = %id, "Connection unregistered");
        }
        removed
    }

    #[cfg(test)]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// False when the id is unknown or the socket already went away.
    pub fn send_to(&self, id: ConnectionId, msg: &ServerMessage) -> bool {
        let Some(outbox) = self.connections.get(&id) else {
            tracing::warn!(connection_id = %id, kind = kind_of(msg), "Send to unknown connection");
            return false;
        };
        let Some(text) = encode(msg) else {
            return false;
        };
        if outbox.send(text).is_err() {
            tracing::warn!(connection_id = %id, "Connection outbox closed");
            return false;
        }
        true
    }

    /// Best effort: a failed send is logged and the rest still go out.
    pub fn broadcast(&self, msg: &ServerMessage) -> usize {
        let Some(text) = encode(msg) else {
            return 0;
        };
        let mut delivered = 0;
        for (id, outbox) in &self.connections {
            if outbox.send(text.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::warn!(connection_id = %id, "Failed to broadcast message");
            }
        }
        delivered
    }
}

fn encode(msg: &ServerMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode outbound message");
            None
        }
    }
}

fn kind_of(msg: &ServerMessage) -> &'static str {
    match msg {
        ServerMessage::Joined { .. } => "joined",
        ServerMessage::StartGame => "start_game",
        ServerMessage::ShowPrompt { .. } => "show_prompt",
        ServerMessage::ShowAnswer { .. } => "show_answer",
        ServerMessage::ShowChoices { .. } => "show_choices",
        ServerMessage::GameOver { .. } => "game_over",
        ServerMessage::Error { .. } => "error",
    }
}
