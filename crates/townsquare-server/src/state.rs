use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ServerConfig;
use crate::friends::FriendService;
use crate::games::ServerGameRegistry;
use crate::presence::PresenceHub;
use crate::session_registry::SessionRegistry;
use crate::store::{InMemoryUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub presence: Arc<PresenceHub>,
    pub friends: Arc<FriendService>,
    pub store: Arc<dyn UserStore>,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
}

impl AppState {
    /// State backed by the in-memory user store.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryUserStore::new()))
    }

    pub fn with_store(config: ServerConfig, store: Arc<dyn UserStore>) -> Self {
        let presence = Arc::new(PresenceHub::new(config.limits.notification_buffer));
        let games = ServerGameRegistry::new(config.games.clone());
        Self {
            sessions: Arc::new(SessionRegistry::new(games, config.limits.max_sessions)),
            friends: Arc::new(FriendService::new(
                Arc::clone(&store),
                Arc::clone(&presence),
            )),
            presence,
            store,
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Increments a shared counter on creation and decrements it on drop.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_guard_tracks_count() {
        let counter = Arc::new(AtomicUsize::new(0));
        let a = ConnectionGuard::new(Arc::clone(&counter));
        let b = ConnectionGuard::new(Arc::clone(&counter));
        assert_eq!(counter.load(Ordering::Relaxed), 2);
        drop(a);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        drop(b);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
