use serde::{Deserialize, Serialize};

/// Events a client may send over its WebSocket connection.
///
/// Relay fields are optional at the serde layer: field presence is a protocol
/// decision, not a parse failure. A challenge missing its offer gets an
/// `error` reply, while an ICE candidate missing a field is dropped silently;
/// both need the message to decode first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind a user identifier to this connection.
    Register {
        #[serde(default)]
        user_id: Option<String>,
    },
    /// Relay an SDP offer to another registered user.
    Challenge {
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        offer: Option<String>,
    },
    /// Relay an SDP answer to another registered user.
    Answer {
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        answer: Option<String>,
    },
    /// Relay a network-reachability candidate; best-effort, never acked.
    IceCandidate {
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        candidate: Option<String>,
    },
    /// Application-level keepalive.
    Ping {
        #[serde(default)]
        user_id: Option<String>,
    },
    /// Ask whether an identifier is currently online.
    CheckUser {
        #[serde(default)]
        user_id: Option<String>,
    },
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting on transport accept, carrying the fresh session id.
    Connected { session_id: String },
    Registered { user_id: String, status: String },
    Error { message: String },
    ChallengeFailed { message: String, to: String },
    ChallengeReceived { from: String, offer: String },
    ChallengeSent { to: String, status: String },
    AnswerFailed { message: String, to: String },
    AnswerReceived { from: String, answer: String },
    AnswerSent { to: String, status: String },
    IceCandidate { from: String, candidate: String },
    Pong { timestamp: String },
    UserStatus { user_id: String, online: bool },
    /// Broadcast to every remaining connection when a registered user's
    /// transport goes away.
    OpponentDisconnected { user_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_decode_by_type_tag() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"register","user_id":"alice"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Register { user_id: Some(ref u) } if u == "alice"));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"challenge","from":"a","to":"b","offer":"sdp"}"#)
                .unwrap();
        assert!(matches!(msg, ClientMessage::Challenge { .. }));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"check_user","user_id":"bob"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::CheckUser { .. }));
    }

    #[test]
    fn missing_relay_fields_still_decode() {
        // Field presence is validated by the dispatcher, not by serde.
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"ice_candidate","from":"a","to":"b"}"#).unwrap();
        match msg {
            ClientMessage::IceCandidate { from, to, candidate } => {
                assert_eq!(from.as_deref(), Some("a"));
                assert_eq!(to.as_deref(), Some("b"));
                assert!(candidate.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping { user_id: None }));
    }

    #[test]
    fn unknown_event_type_is_a_parse_error() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"resign"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn server_events_carry_snake_case_tags() {
        let json = serde_json::to_string(&ServerMessage::OpponentDisconnected {
            user_id: "alice".into(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"opponent_disconnected""#));

        let json = serde_json::to_string(&ServerMessage::ChallengeSent {
            to: "bob".into(),
            status: "delivered".into(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"challenge_sent""#));
        assert!(json.contains(r#""status":"delivered""#));

        let json = serde_json::to_string(&ServerMessage::UserStatus {
            user_id: "bob".into(),
            online: false,
        })
        .unwrap();
        assert!(json.contains(r#""type":"user_status""#));
        assert!(json.contains(r#""online":false"#));
    }
}
