//! WebRTC signaling relay for peer-to-peer chess sessions.
//!
//! The server never inspects the session descriptions or ICE candidates it
//! carries. It tracks which user identifiers currently have a live WebSocket
//! connection and routes handshake events between them; everything else is
//! negotiated directly between the peers.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `messages` | JSON wire events exchanged with clients |
//! | `state` | Shared server state and the presence registry |
//! | `dispatch` | Per-event relay logic |
//! | `connection` | WebSocket lifecycle (accept, pump, teardown) |
//! | `server` | HTTP routing, status endpoints, WebSocket upgrade |

pub mod connection;
pub mod dispatch;
pub mod messages;
pub mod server;
pub mod state;

pub type UserId = String;
pub type SessionId = String;

/// Outbound half of a client connection. Sends never block; a per-connection
/// writer task drains the channel into the WebSocket sink.
pub type OutboundSender =
    tokio::sync::mpsc::UnboundedSender<hyper_tungstenite::tungstenite::Message>;
