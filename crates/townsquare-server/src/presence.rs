use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{RwLock, mpsc};

use townsquare_core::net::messages::ServerMessage;
use townsquare_core::net::protocol::encode_server_message;

/// Identifies one live notification connection.
pub type ConnectionId = u64;

/// Per-connection sender for outbound WebSocket binary messages.
/// Bounded by `limits.notification_buffer` so a slow client cannot grow
/// memory. Uses `Bytes` for zero-copy cloning across a user's connections.
pub type NotificationSender = mpsc::Sender<Bytes>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PresenceStats {
    pub online_users: usize,
    pub connections: usize,
}

/// Per-user notification groups. A user may hold several connections at
/// once; each receives every notification addressed to that user.
pub struct PresenceHub {
    groups: RwLock<HashMap<String, HashMap<ConnectionId, NotificationSender>>>,
    next_connection_id: AtomicU64,
    buffer: usize,
}

impl PresenceHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Add a connection to `user_id`'s group, creating the group if needed.
    pub async fn connect(&self, user_id: &str) -> (ConnectionId, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let mut groups = self.groups.write().await;
        groups
            .entry(user_id.to_string())
            .or_default()
            .insert(connection_id, tx);
        tracing::debug!(user = %user_id, connection_id, "Notification connection added");
        (connection_id, rx)
    }

    /// Remove one connection. The group disappears with its last member.
    /// Returns whether the connection was present.
    pub async fn disconnect(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        let mut groups = self.groups.write().await;
        let Some(group) = groups.get_mut(user_id) else {
            return false;
        };
        let removed = group.remove(&connection_id).is_some();
        if group.is_empty() {
            groups.remove(user_id);
        }
        removed
    }

    /// Deliver `message` to every connection currently in `user_id`'s group.
    /// Offline users get nothing and nothing is queued for later. Returns the
    /// number of connections the message was handed to.
    pub async fn notify(&self, user_id: &str, message: &ServerMessage) -> usize {
        let data = match encode_server_message(message) {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                tracing::warn!(user = %user_id, error = %e, "Failed to encode notification");
                return 0;
            },
        };

        let groups = self.groups.read().await;
        let Some(group) = groups.get(user_id) else {
            tracing::debug!(
                user = %user_id,
                msg_type = ?message.message_type(),
                "User offline, notification dropped"
            );
            return 0;
        };

        let mut delivered = 0;
        for (&connection_id, sender) in group {
            match sender.try_send(data.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::debug!(
                    user = %user_id, connection_id, error = %e,
                    "Skipping notification to slow or closed connection"
                ),
            }
        }
        delivered
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.groups.read().await.contains_key(user_id)
    }

    pub async fn stats(&self) -> PresenceStats {
        let groups = self.groups.read().await;
        PresenceStats {
            online_users: groups.len(),
            connections: groups.values().map(HashMap::len).sum(),
        }
    }
}
