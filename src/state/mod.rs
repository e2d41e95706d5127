//! Shared server state. All mutation goes through one `tokio::sync::Mutex`;
//! no lock is held across network I/O — outbound delivery is an unbounded
//! channel send, which never blocks.

pub mod registry;

pub use registry::{PresenceRegistry, UserSession};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use hyper_tungstenite::tungstenite::Message;
use tokio::sync::Mutex;

use crate::messages::ServerMessage;
use crate::{OutboundSender, SessionId, UserId};

/// Registry entries idle longer than this are dropped by the on-demand sweep.
pub const SWEEP_TTL_MINUTES: i64 = 5;

pub type SharedState = Arc<Mutex<ServerState>>;

#[derive(Default)]
pub struct ServerState {
    /// user_id -> live session binding.
    pub registry: PresenceRegistry,
    /// Outbound channel of every connected session, registered or not.
    sessions: HashMap<SessionId, OutboundSender>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedState {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Called when a transport connection is accepted.
    pub fn attach_session(&mut self, session_id: &str, sender: OutboundSender) {
        self.sessions.insert(session_id.to_string(), sender);
    }

    /// The outbound channel of the session a user is registered on, if both
    /// the registration and the connection are still live.
    pub fn sender_for_user(&self, user_id: &str) -> Option<&OutboundSender> {
        let session = self.registry.lookup(user_id)?;
        self.sessions.get(&session.session_id)
    }

    /// Tears down a closed connection: drops its outbound channel and its
    /// registry binding, and tells every remaining session when a registered
    /// identifier goes away. No pairing relationship is tracked, so the
    /// notification goes to everyone still connected.
    pub fn drop_session(&mut self, session_id: &str) -> Option<UserId> {
        self.sessions.remove(session_id);
        let user_id = self.registry.remove_by_session(session_id)?;
        self.broadcast(&ServerMessage::OpponentDisconnected {
            user_id: user_id.clone(),
        });
        Some(user_id)
    }

    /// Sends `msg` to every connected session.
    pub fn broadcast(&self, msg: &ServerMessage) {
        let Ok(json) = serde_json::to_string(msg) else {
            return;
        };
        for sender in self.sessions.values() {
            let _ = sender.send(Message::Text(json.clone()));
        }
    }

    /// Drops idle registrations. Every status query calls this before
    /// reading, which is what keeps the TTL honest without a background
    /// timer.
    pub fn sweep_idle(&mut self) {
        self.registry
            .sweep(Utc::now(), Duration::minutes(SWEEP_TTL_MINUTES));
    }
}
