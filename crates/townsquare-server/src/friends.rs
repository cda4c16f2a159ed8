use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use townsquare_core::net::messages::{
    FriendRequestAcceptedMsg, FriendRequestSentMsg, ServerMessage,
};

use crate::presence::PresenceHub;
use crate::store::{StoreError, UserStore};

/// Result of sending a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FriendRequestStatus {
    /// A request from the sender is now pending (new or already present).
    RequestSent,
    /// The recipient had already asked; the two are now friends.
    RequestReceived,
    AlreadyFriends,
}

/// A user's friends and pending requests in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendOverview {
    pub friends: Vec<String>,
    /// Friends with at least one live notification connection.
    pub online: Vec<String>,
    /// Users waiting for this user to accept.
    pub incoming: Vec<String>,
    /// Users this user is waiting on.
    pub outgoing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FriendError {
    Validation(String),
    NotFound(String),
    Store(StoreError),
}

impl std::fmt::Display for FriendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(m) | Self::NotFound(m) => write!(f, "{m}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FriendError {}

impl From<StoreError> for FriendError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Friend requests and acceptance on top of a `UserStore`, with live
/// notifications through the presence hub.
pub struct FriendService {
    store: Arc<dyn UserStore>,
    presence: Arc<PresenceHub>,
    /// Serializes read-check-write sequences on the friend graph.
    graph_lock: Mutex<()>,
}

impl FriendService {
    pub fn new(store: Arc<dyn UserStore>, presence: Arc<PresenceHub>) -> Self {
        Self {
            store,
            presence,
            graph_lock: Mutex::new(()),
        }
    }

    /// Ask `to` to become friends with `from`. A pending request in the
    /// opposite direction counts as acceptance.
    pub async fn send_request(
        &self,
        from: &str,
        to: &str,
    ) -> Result<FriendRequestStatus, FriendError> {
        if from.is_empty() || to.is_empty() {
            return Err(FriendError::Validation("user ids must not be empty".to_string()));
        }
        if from == to {
            return Err(FriendError::Validation(
                "cannot send a friend request to yourself".to_string(),
            ));
        }

        let (status, event) = {
            let _graph = self.graph_lock.lock().await;
            if self.store.are_friends(from, to).await? {
                (FriendRequestStatus::AlreadyFriends, None)
            } else if self.store.has_pending(to, from).await? {
                self.store.add_friendship(from, to).await?;
                self.store.remove_pending(to, from).await?;
                self.store.remove_pending(from, to).await?;
                let msg = ServerMessage::FriendRequestAccepted(FriendRequestAcceptedMsg {
                    from_user_id: from.to_string(),
                });
                (FriendRequestStatus::RequestReceived, Some(msg))
            } else if self.store.insert_pending(from, to).await? {
                let msg = ServerMessage::FriendRequestSent(FriendRequestSentMsg {
                    from_user_id: from.to_string(),
                });
                (FriendRequestStatus::RequestSent, Some(msg))
            } else {
                (FriendRequestStatus::RequestSent, None)
            }
        };

        tracing::info!(from, to, ?status, "Friend request processed");
        if let Some(msg) = event {
            self.presence.notify(to, &msg).await;
        }
        Ok(status)
    }

    /// `accepter` accepts the pending request from `requester`.
    pub async fn accept_request(&self, requester: &str, accepter: &str) -> Result<(), FriendError> {
        if requester.is_empty() || accepter.is_empty() {
            return Err(FriendError::Validation("user ids must not be empty".to_string()));
        }

        {
            let _graph = self.graph_lock.lock().await;
            if !self.store.has_pending(requester, accepter).await? {
                return Err(FriendError::NotFound(format!(
                    "no pending friend request from {requester} to {accepter}"
                )));
            }
            self.store.add_friendship(requester, accepter).await?;
            self.store.remove_pending(requester, accepter).await?;
            self.store.remove_pending(accepter, requester).await?;
        }

        tracing::info!(requester, accepter, "Friend request accepted");
        let msg = ServerMessage::FriendRequestAccepted(FriendRequestAcceptedMsg {
            from_user_id: accepter.to_string(),
        });
        self.presence.notify(requester, &msg).await;
        Ok(())
    }

    pub async fn overview(&self, user_id: &str) -> Result<FriendOverview, FriendError> {
        if user_id.is_empty() {
            return Err(FriendError::Validation("user id must not be empty".to_string()));
        }
        let friends = self.store.friends_of(user_id).await?;
        let mut online = Vec::new();
        for friend in &friends {
            if self.presence.is_online(friend).await {
                online.push(friend.clone());
            }
        }
        Ok(FriendOverview {
            friends,
            online,
            incoming: self.store.pending_for(user_id).await?,
            outgoing: self.store.pending_from(user_id).await?,
        })
    }
}
