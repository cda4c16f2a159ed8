use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Durable user record. Only used to resolve display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
}

/// Failure reported by a persistence backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Unavailable(String),
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(m) => write!(f, "store unavailable: {m}"),
            Self::Backend(m) => write!(f, "store error: {m}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence capability for user profiles, pending friend requests, and
/// friendships. Pending requests are directed (requester, recipient);
/// friendships are symmetric.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    async fn upsert_user(&self, profile: UserProfile) -> Result<(), StoreError>;

    /// Remove a profile together with its friendships and pending requests.
    /// Returns whether a profile existed.
    async fn delete_user(&self, user_id: &str) -> Result<bool, StoreError>;

    /// Record `from -> to`. Returns `false` when it was already pending.
    async fn insert_pending(&self, from: &str, to: &str) -> Result<bool, StoreError>;

    /// Returns whether a pending request was removed.
    async fn remove_pending(&self, from: &str, to: &str) -> Result<bool, StoreError>;

    async fn has_pending(&self, from: &str, to: &str) -> Result<bool, StoreError>;

    async fn add_friendship(&self, a: &str, b: &str) -> Result<(), StoreError>;

    async fn are_friends(&self, a: &str, b: &str) -> Result<bool, StoreError>;

    async fn friends_of(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    /// Users with a pending request addressed to `user_id`.
    async fn pending_for(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    /// Users `user_id` has a pending request addressed to.
    async fn pending_from(&self, user_id: &str) -> Result<Vec<String>, StoreError>;
}

#[derive(Default)]
struct StoreData {
    users: HashMap<String, UserProfile>,
    pending: BTreeSet<(String, String)>,
    /// Each friendship stored once, smaller id first.
    friendships: BTreeSet<(String, String)>,
}

fn friend_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// In-process `UserStore`, used by the binary and tests.
#[derive(Default)]
pub struct InMemoryUserStore {
    data: RwLock<StoreData>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.data.read().await.users.get(user_id).cloned())
    }

    async fn upsert_user(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.data
            .write()
            .await
            .users
            .insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut data = self.data.write().await;
        let existed = data.users.remove(user_id).is_some();
        data.pending
            .retain(|(from, to)| from != user_id && to != user_id);
        data.friendships
            .retain(|(a, b)| a != user_id && b != user_id);
        Ok(existed)
    }

    async fn insert_pending(&self, from: &str, to: &str) -> Result<bool, StoreError> {
        Ok(self
            .data
            .write()
            .await
            .pending
            .insert((from.to_string(), to.to_string())))
    }

    async fn remove_pending(&self, from: &str, to: &str) -> Result<bool, StoreError> {
        Ok(self
            .data
            .write()
            .await
            .pending
            .remove(&(from.to_string(), to.to_string())))
    }

    async fn has_pending(&self, from: &str, to: &str) -> Result<bool, StoreError> {
        Ok(self
            .data
            .read()
            .await
            .pending
            .contains(&(from.to_string(), to.to_string())))
    }

    async fn add_friendship(&self, a: &str, b: &str) -> Result<(), StoreError> {
        self.data.write().await.friendships.insert(friend_key(a, b));
        Ok(())
    }

    async fn are_friends(&self, a: &str, b: &str) -> Result<bool, StoreError> {
        Ok(self
            .data
            .read()
            .await
            .friendships
            .contains(&friend_key(a, b)))
    }

    async fn friends_of(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let data = self.data.read().await;
        let mut friends: Vec<String> = data
            .friendships
            .iter()
            .filter_map(|(a, b)| {
                if a == user_id {
                    Some(b.clone())
                } else if b == user_id {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect();
        friends.sort();
        Ok(friends)
    }

    async fn pending_for(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .pending
            .iter()
            .filter(|(_, to)| to == user_id)
            .map(|(from, _)| from.clone())
            .collect())
    }

    async fn pending_from(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .pending
            .iter()
            .filter(|(from, _)| from == user_id)
            .map(|(_, to)| to.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, name: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            display_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_and_get_user() {
        let store = InMemoryUserStore::new();
        assert_eq!(store.get_user("a").await.unwrap(), None);

        store.upsert_user(profile("a", "Alice")).await.unwrap();
        store.upsert_user(profile("a", "Alicia")).await.unwrap();
        assert_eq!(
            store.get_user("a").await.unwrap(),
            Some(profile("a", "Alicia"))
        );
    }

    #[tokio::test]
    async fn pending_requests_are_directed_and_idempotent() {
        let store = InMemoryUserStore::new();
        assert!(store.insert_pending("a", "b").await.unwrap());
        assert!(!store.insert_pending("a", "b").await.unwrap());

        assert!(store.has_pending("a", "b").await.unwrap());
        assert!(!store.has_pending("b", "a").await.unwrap());
        assert_eq!(store.pending_for("b").await.unwrap(), vec!["a"]);
        assert_eq!(store.pending_from("a").await.unwrap(), vec!["b"]);
        assert!(store.pending_for("a").await.unwrap().is_empty());

        assert!(store.remove_pending("a", "b").await.unwrap());
        assert!(!store.remove_pending("a", "b").await.unwrap());
    }

    #[tokio::test]
    async fn friendships_are_symmetric() {
        let store = InMemoryUserStore::new();
        store.add_friendship("b", "a").await.unwrap();
        store.add_friendship("a", "b").await.unwrap();
        store.add_friendship("a", "c").await.unwrap();

        assert!(store.are_friends("a", "b").await.unwrap());
        assert!(store.are_friends("b", "a").await.unwrap());
        assert!(!store.are_friends("b", "c").await.unwrap());
        assert_eq!(store.friends_of("a").await.unwrap(), vec!["b", "c"]);
        assert_eq!(store.friends_of("b").await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn delete_user_removes_relations() {
        let store = InMemoryUserStore::new();
        store.upsert_user(profile("a", "Alice")).await.unwrap();
        store.add_friendship("a", "b").await.unwrap();
        store.insert_pending("c", "a").await.unwrap();
        store.insert_pending("b", "c").await.unwrap();

        assert!(store.delete_user("a").await.unwrap());
        assert!(!store.delete_user("a").await.unwrap());
        assert!(store.friends_of("b").await.unwrap().is_empty());
        assert!(store.pending_from("c").await.unwrap().is_empty());
        assert!(store.has_pending("b", "c").await.unwrap());
    }
}
