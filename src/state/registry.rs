use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::{SessionId, UserId};

/// A live registration: which transport session a user identifier is bound
/// to, and when that binding was last active.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub session_id: SessionId,
    pub last_seen: DateTime<Utc>,
}

/// Mapping from user identifier to live session, with a reverse index from
/// session id to user identifier for constant-time disconnect cleanup.
///
/// Invariants: at most one session per identifier and one identifier per
/// session. A second `register` for the same identifier overwrites the first;
/// the displaced connection is not notified and simply stops matching on
/// `remove_by_session`.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    users: HashMap<UserId, UserSession>,
    by_session: HashMap<SessionId, UserId>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the binding for `user_id` with a fresh
    /// `last_seen`. Always succeeds.
    pub fn register(&mut self, user_id: &str, session_id: &str) {
        // A connection holds at most one identifier; rebinding it releases
        // the old one.
        if let Some(old_user) = self.by_session.remove(session_id) {
            if old_user != user_id {
                self.users.remove(&old_user);
            }
        }
        if let Some(old) = self.users.insert(
            user_id.to_string(),
            UserSession {
                session_id: session_id.to_string(),
                last_seen: Utc::now(),
            },
        ) {
            self.by_session.remove(&old.session_id);
        }
        self.by_session
            .insert(session_id.to_string(), user_id.to_string());
    }

    pub fn lookup(&self, user_id: &str) -> Option<&UserSession> {
        self.users.get(user_id)
    }

    /// Refreshes `last_seen` if the identifier is registered; no-op otherwise.
    pub fn touch(&mut self, user_id: &str) {
        if let Some(session) = self.users.get_mut(user_id) {
            session.last_seen = Utc::now();
        }
    }

    /// Removes the entry bound to `session_id`, returning the freed
    /// identifier. A binding already overwritten by a later `register` no
    /// longer matches and is left alone.
    pub fn remove_by_session(&mut self, session_id: &str) -> Option<UserId> {
        let user_id = self.by_session.remove(session_id)?;
        self.users.remove(&user_id);
        Some(user_id)
    }

    /// Drops every entry whose `last_seen` is older than `ttl` before `now`.
    pub fn sweep(&mut self, now: DateTime<Utc>, ttl: Duration) {
        let cutoff = now - ttl;
        let stale: Vec<UserId> = self
            .users
            .iter()
            .filter(|(_, session)| session.last_seen < cutoff)
            .map(|(user_id, _)| user_id.clone())
            .collect();
        for user_id in stale {
            if let Some(session) = self.users.remove(&user_id) {
                self.by_session.remove(&session.session_id);
            }
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Identifiers currently online.
    pub fn online_users(&self) -> Vec<UserId> {
        self.users.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_returns_bound_session() {
        let mut registry = PresenceRegistry::new();
        registry.register("alice", "s1");

        let session = registry.lookup("alice").expect("alice registered");
        assert_eq!(session.session_id, "s1");
        assert!(registry.contains("alice"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reregister_is_last_write_wins() {
        let mut registry = PresenceRegistry::new();
        registry.register("alice", "s1");
        registry.register("alice", "s2");

        let session = registry.lookup("alice").expect("alice registered");
        assert_eq!(session.session_id, "s2");
        assert_eq!(registry.len(), 1);
        // The displaced connection no longer matches anything.
        assert_eq!(registry.remove_by_session("s1"), None);
        assert!(registry.contains("alice"));
    }

    #[test]
    fn rebinding_a_session_releases_its_old_identifier() {
        let mut registry = PresenceRegistry::new();
        registry.register("alice", "s1");
        registry.register("bob", "s1");

        assert!(!registry.contains("alice"));
        assert_eq!(registry.lookup("bob").unwrap().session_id, "s1");
        assert_eq!(registry.remove_by_session("s1"), Some("bob".to_string()));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_by_session_frees_the_identifier() {
        let mut registry = PresenceRegistry::new();
        registry.register("alice", "s1");

        assert_eq!(registry.remove_by_session("s1"), Some("alice".to_string()));
        assert!(registry.lookup("alice").is_none());
        assert_eq!(registry.remove_by_session("s1"), None);
    }

    #[test]
    fn touch_on_unknown_identifier_is_a_noop() {
        let mut registry = PresenceRegistry::new();
        registry.touch("ghost");
        assert!(registry.is_empty());
    }

    #[test]
    fn touch_refreshes_last_seen() {
        let mut registry = PresenceRegistry::new();
        registry.register("alice", "s1");
        let before = registry.lookup("alice").unwrap().last_seen;

        registry.touch("alice");
        let after = registry.lookup("alice").unwrap().last_seen;
        assert!(after >= before);
    }

    #[test]
    fn sweep_drops_entries_older_than_ttl() {
        let mut registry = PresenceRegistry::new();
        registry.register("alice", "s1");
        let ttl = Duration::minutes(5);

        // Four minutes of idleness is within the TTL.
        registry.sweep(Utc::now() + Duration::minutes(4), ttl);
        assert!(registry.contains("alice"));

        // Six minutes is past it.
        registry.sweep(Utc::now() + Duration::minutes(6), ttl);
        assert!(!registry.contains("alice"));
        // Reverse index was cleaned with it.
        assert_eq!(registry.remove_by_session("s1"), None);
    }

    #[test]
    fn sweep_keeps_recently_touched_entries() {
        let mut registry = PresenceRegistry::new();
        registry.register("alice", "s1");
        registry.register("bob", "s2");

        registry.touch("bob");
        registry.sweep(Utc::now(), Duration::minutes(5));

        assert!(registry.contains("alice"));
        assert!(registry.contains("bob"));
        assert_eq!(registry.online_users().len(), 2);
    }
}
