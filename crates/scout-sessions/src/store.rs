use dashmap::DashMap;
use tracing::debug;

use scout_core::ChatMode;

use crate::types::Session;

/// In-memory session table.
///
/// Shared across handlers via `Arc`; the map gives per-entry consistency
/// only. Two concurrent turns on the same key may interleave their history
/// appends in either order — accepted, not serialized here.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the session for `key`, creating it on first sight.
    ///
    /// A mode hint overwrites the stored mode and persists for subsequent
    /// turns that arrive without one. Returns the mode now in effect.
    pub fn ensure(&self, key: &str, hint: Option<ChatMode>) -> ChatMode {
        let mut entry = self
            .sessions
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(session = %key, "creating session");
                Session::new(hint.unwrap_or_default())
            });
        if let Some(mode) = hint {
            entry.mode = mode;
        }
        entry.mode
    }

    /// Append a user utterance to the session's history.
    ///
    /// Called before generation starts, so the in-flight turn sees its own
    /// message; an aborted turn leaves the entry behind.
    pub fn append_history(&self, key: &str, text: &str) {
        if let Some(mut session) = self.sessions.get_mut(key) {
            session.history.push(text.to_string());
        }
    }

    /// Snapshot of the session's history (empty for unknown keys).
    pub fn history(&self, key: &str) -> Vec<String> {
        self.sessions
            .get(key)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    pub fn mode(&self, key: &str) -> Option<ChatMode> {
        self.sessions.get(key).map(|s| s.mode)
    }

    /// Drop every session. Used by the administrative clear-all operation.
    pub fn clear_all(&self) {
        let dropped = self.sessions.len();
        self.sessions.clear();
        debug!(dropped, "cleared all sessions");
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_create_with_default_mode() {
        let store = SessionStore::new();
        assert!(store.mode("s1").is_none());
        let mode = store.ensure("s1", None);
        assert_eq!(mode, ChatMode::Research);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn mode_hint_persists_for_later_turns() {
        let store = SessionStore::new();
        store.ensure("s1", Some(ChatMode::Pdf));
        // second turn without a hint keeps the stored mode
        let mode = store.ensure("s1", None);
        assert_eq!(mode, ChatMode::Pdf);
    }

    #[test]
    fn mode_hint_overwrites_stored_mode() {
        let store = SessionStore::new();
        store.ensure("s1", Some(ChatMode::Pdf));
        let mode = store.ensure("s1", Some(ChatMode::Research));
        assert_eq!(mode, ChatMode::Research);
        assert_eq!(store.mode("s1"), Some(ChatMode::Research));
    }

    #[test]
    fn history_appends_in_order() {
        let store = SessionStore::new();
        store.ensure("s1", None);
        store.append_history("s1", "first");
        store.append_history("s1", "second");
        assert_eq!(store.history("s1"), vec!["first", "second"]);
    }

    #[test]
    fn append_to_unknown_key_is_a_no_op() {
        let store = SessionStore::new();
        store.append_history("ghost", "lost");
        assert!(store.history("ghost").is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn clear_all_drops_everything() {
        let store = SessionStore::new();
        store.ensure("a", None);
        store.ensure("b", Some(ChatMode::Pdf));
        store.clear_all();
        assert!(store.is_empty());
        assert!(store.mode("b").is_none());
    }
}
