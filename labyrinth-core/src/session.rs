//! Session host: one engine per connected device.
//!
//! The transport hands every inbound action to [`SessionHost::dispatch`].
//! Actions for the same device are serialized behind a per-session lock;
//! sessions for different devices run in parallel. Emitted events are
//! returned in order for the transport to relay outbound.

use crate::content::ContentTables;
use crate::dice::Dice;
use crate::engine::GameEngine;
use crate::events::Event;
use crate::persist::{
    LeaderboardStore, MemoryLeaderboard, MemorySaveStore, ReviewSubmitter, SaveStore,
    UnconfiguredReviews,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// What to do with engine state when a transport disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectPolicy {
    /// Keep the session so the same device id can reconnect. The default.
    #[default]
    Retain,
    /// Drop the session immediately.
    Discard,
}

/// Shared stores injected into every engine this host creates.
#[derive(Clone)]
pub struct HostConfig {
    pub tables: Arc<ContentTables>,
    pub saves: Arc<dyn SaveStore>,
    pub leaderboard: Arc<dyn LeaderboardStore>,
    pub reviews: Arc<dyn ReviewSubmitter>,
    pub disconnect: DisconnectPolicy,
}

impl HostConfig {
    /// In-memory everything; suitable for tests and local play.
    pub fn in_memory() -> Self {
        Self {
            tables: ContentTables::shared(),
            saves: Arc::new(MemorySaveStore::new()),
            leaderboard: Arc::new(MemoryLeaderboard::new()),
            reviews: Arc::new(UnconfiguredReviews),
            disconnect: DisconnectPolicy::default(),
        }
    }

    pub fn with_saves(mut self, saves: Arc<dyn SaveStore>) -> Self {
        self.saves = saves;
        self
    }

    pub fn with_leaderboard(mut self, leaderboard: Arc<dyn LeaderboardStore>) -> Self {
        self.leaderboard = leaderboard;
        self
    }

    pub fn with_reviews(mut self, reviews: Arc<dyn ReviewSubmitter>) -> Self {
        self.reviews = reviews;
        self
    }

    pub fn with_disconnect(mut self, policy: DisconnectPolicy) -> Self {
        self.disconnect = policy;
        self
    }
}

/// Owns every live session in the process.
pub struct SessionHost {
    config: HostConfig,
    sessions: Mutex<HashMap<String, Arc<Mutex<GameEngine>>>>,
}

impl SessionHost {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Find or create the session for `device_id`.
    async fn session(&self, device_id: &str) -> Arc<Mutex<GameEngine>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(device_id.to_string())
            .or_insert_with(|| {
                let engine = GameEngine::new(
                    self.config.tables.clone(),
                    Dice::from_entropy(),
                    self.config.saves.clone(),
                    self.config.leaderboard.clone(),
                    self.config.reviews.clone(),
                    device_id,
                );
                Arc::new(Mutex::new(engine))
            })
            .clone()
    }

    /// A device connected: create its session and emit the opening screen.
    pub async fn connect(&self, device_id: &str) -> Vec<Event> {
        let session = self.session(device_id).await;
        let mut engine = session.lock().await;
        engine.start()
    }

    /// Route one inbound action. The per-session lock is held for the whole
    /// handler, so events from action N are always delivered before any
    /// event from action N+1 on the same session.
    pub async fn dispatch(&self, device_id: &str, action: &str, payload: Option<&Value>) -> Vec<Event> {
        let session = self.session(device_id).await;
        let mut engine = session.lock().await;
        engine.handle_action(action, payload)
    }

    /// A device disconnected; apply the configured retention policy.
    pub async fn disconnect(&self, device_id: &str) {
        if self.config.disconnect == DisconnectPolicy::Discard {
            self.sessions.lock().await.remove(device_id);
        }
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Run `f` against a session's engine, e.g. to seed dice in tests.
    pub async fn with_engine<R>(
        &self,
        device_id: &str,
        f: impl FnOnce(&mut GameEngine) -> R,
    ) -> R {
        let session = self.session(device_id).await;
        let mut engine = session.lock().await;
        f(&mut engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;

    fn first_menu_ids(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .find_map(|ev| match ev {
                Event::Menu { items } => {
                    Some(items.iter().map(|i| i.id.clone()).collect::<Vec<_>>())
                }
                _ => None,
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn connect_emits_the_main_menu() {
        let host = SessionHost::new(HostConfig::in_memory());
        let events = host.connect("device-a").await;
        let ids = first_menu_ids(&events);
        assert!(ids.contains(&"main:new_game".to_string()));
        assert_eq!(host.session_count().await, 1);
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_device() {
        let host = SessionHost::new(HostConfig::in_memory());
        host.connect("device-a").await;
        host.connect("device-b").await;
        host.dispatch("device-a", "main:new_game", None).await;
        // Device A is on the difficulty screen; device B is untouched.
        let b_events = host.dispatch("device-b", "nonsense", None).await;
        let ids = first_menu_ids(&b_events);
        assert!(ids.contains(&"main:new_game".to_string()));
        assert_eq!(host.session_count().await, 2);
    }

    #[tokio::test]
    async fn discard_policy_drops_sessions() {
        let config = HostConfig::in_memory().with_disconnect(DisconnectPolicy::Discard);
        let host = SessionHost::new(config);
        host.connect("device-a").await;
        host.disconnect("device-a").await;
        assert_eq!(host.session_count().await, 0);

        // Retain keeps the session alive for reconnects.
        let host = SessionHost::new(HostConfig::in_memory());
        host.connect("device-a").await;
        host.disconnect("device-a").await;
        assert_eq!(host.session_count().await, 1);
    }

    #[tokio::test]
    async fn rapid_actions_observe_prior_state() {
        let host = SessionHost::new(HostConfig::in_memory());
        host.connect("device-a").await;
        host.dispatch("device-a", "main:new_game", None).await;
        let events = host.dispatch("device-a", "difficulty:normal", None).await;
        let ids = first_menu_ids(&events);
        assert!(ids.contains(&"intro:continue".to_string()));
    }
}
