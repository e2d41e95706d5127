//! Relay protocol dispatch: one inbound event in, a registry consultation,
//! and a forward, acknowledgement, or rejection out.

use chrono::Utc;
use hyper_tungstenite::tungstenite::Message;
use log::info;

use crate::messages::{ClientMessage, ServerMessage};
use crate::state::SharedState;
use crate::OutboundSender;

/// Returns the field value if it is present and non-empty. The wire protocol
/// treats `""` the same as an absent field.
fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}

/// Fire-and-forget delivery; the transport confirms nothing.
pub fn forward(sender: &OutboundSender, msg: &ServerMessage) {
    if let Ok(json) = serde_json::to_string(msg) {
        let _ = sender.send(Message::Text(json));
    }
}

/// Reply to the originating connection. Failures surface so the connection
/// loop can log them; they never affect other sessions.
fn reply(sender: &OutboundSender, msg: &ServerMessage) -> Result<(), String> {
    let json = serde_json::to_string(msg)
        .map_err(|e| format!("Failed to serialize response: {}", e))?;
    sender
        .send(Message::Text(json))
        .map_err(|e| format!("Failed to send response: {}", e))
}

pub async fn handle_message(
    msg: ClientMessage,
    session_id: &str,
    state: &SharedState,
    sender: &OutboundSender,
) -> Result<(), String> {
    match msg {
        ClientMessage::Register { user_id } => {
            let Some(user_id) = required(&user_id) else {
                return reply(
                    sender,
                    &ServerMessage::Error {
                        message: "user_id required".to_string(),
                    },
                );
            };

            {
                let mut st = state.lock().await;
                st.registry.register(user_id, session_id);
            }

            info!("User registered: {} -> {}", user_id, session_id);

            reply(
                sender,
                &ServerMessage::Registered {
                    user_id: user_id.to_string(),
                    status: "success".to_string(),
                },
            )
        }

        ClientMessage::Challenge { from, to, offer } => {
            let (Some(from), Some(to), Some(offer)) =
                (required(&from), required(&to), required(&offer))
            else {
                return reply(
                    sender,
                    &ServerMessage::Error {
                        message: "Invalid challenge data".to_string(),
                    },
                );
            };

            let mut st = state.lock().await;
            let Some(target) = st.sender_for_user(to).cloned() else {
                return reply(
                    sender,
                    &ServerMessage::ChallengeFailed {
                        message: format!("User {} is not online", to),
                        to: to.to_string(),
                    },
                );
            };
            st.registry.touch(from);
            drop(st);

            info!("Challenge: {} -> {}", from, to);

            forward(
                &target,
                &ServerMessage::ChallengeReceived {
                    from: from.to_string(),
                    offer: offer.to_string(),
                },
            );

            reply(
                sender,
                &ServerMessage::ChallengeSent {
                    to: to.to_string(),
                    status: "delivered".to_string(),
                },
            )
        }

        ClientMessage::Answer { from, to, answer } => {
            let (Some(from), Some(to), Some(answer)) =
                (required(&from), required(&to), required(&answer))
            else {
                return reply(
                    sender,
                    &ServerMessage::Error {
                        message: "Invalid answer data".to_string(),
                    },
                );
            };

            let mut st = state.lock().await;
            let Some(target) = st.sender_for_user(to).cloned() else {
                return reply(
                    sender,
                    &ServerMessage::AnswerFailed {
                        message: format!("User {} is not online", to),
                        to: to.to_string(),
                    },
                );
            };
            st.registry.touch(from);
            drop(st);

            info!("Answer: {} -> {}", from, to);

            forward(
                &target,
                &ServerMessage::AnswerReceived {
                    from: from.to_string(),
                    answer: answer.to_string(),
                },
            );

            reply(
                sender,
                &ServerMessage::AnswerSent {
                    to: to.to_string(),
                    status: "delivered".to_string(),
                },
            )
        }

        ClientMessage::IceCandidate {
            from,
            to,
            candidate,
        } => {
            // Candidates arrive in bursts and stray ones near teardown are
            // expected noise: a malformed or undeliverable candidate is
            // dropped without telling anyone.
            let (Some(from), Some(to), Some(candidate)) =
                (required(&from), required(&to), required(&candidate))
            else {
                return Ok(());
            };

            let st = state.lock().await;
            if let Some(target) = st.sender_for_user(to) {
                forward(
                    target,
                    &ServerMessage::IceCandidate {
                        from: from.to_string(),
                        candidate: candidate.to_string(),
                    },
                );
            }
            Ok(())
        }

        ClientMessage::Ping { user_id } => {
            {
                let mut st = state.lock().await;
                if let Some(user_id) = required(&user_id) {
                    st.registry.touch(user_id);
                }
            }

            // Pong is unconditional; clients may probe liveness before
            // registering.
            reply(
                sender,
                &ServerMessage::Pong {
                    timestamp: Utc::now().to_rfc3339(),
                },
            )
        }

        ClientMessage::CheckUser { user_id } => {
            let user_id = user_id.unwrap_or_default();
            let online = {
                let st = state.lock().await;
                st.registry.contains(&user_id)
            };

            reply(sender, &ServerMessage::UserStatus { user_id, online })
        }
    }
}
