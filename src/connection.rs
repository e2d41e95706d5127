//! WebSocket connection lifecycle: accept, pump inbound frames through the
//! dispatcher, tear down on close.
//!
//! Each connection moves through `Connected` (transport accepted, no identity
//! yet) to `Registered` (a `register` event bound an identifier to it) and
//! back to `Disconnected` when the transport closes. The states are implicit:
//! `Connected` is an entry in the sessions map, `Registered` adds a registry
//! binding.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use hyper_tungstenite::tungstenite::Message;
use hyper_tungstenite::WebSocketStream;
use log::{error, info, warn};
use tokio::sync::mpsc;

use crate::dispatch::{self, forward};
use crate::messages::{ClientMessage, ServerMessage};
use crate::state::SharedState;

pub async fn handle_connection(
    ws: WebSocketStream<hyper::upgrade::Upgraded>,
    addr: SocketAddr,
    state: SharedState,
) {
    info!("WebSocket connection established from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws.split();
    let session_id = uuid::Uuid::new_v4().to_string();

    let (tx, mut rx) = mpsc::unbounded_channel();

    // Writer task: drains the outbound channel into the WebSocket sink.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    {
        let mut st = state.lock().await;
        st.attach_session(&session_id, tx.clone());
    }

    forward(
        &tx,
        &ServerMessage::Connected {
            session_id: session_id.clone(),
        },
    );

    loop {
        tokio::select! {
            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => {
                                if let Err(e) =
                                    dispatch::handle_message(msg, &session_id, &state, &tx).await
                                {
                                    warn!("Error handling message from {}: {}", addr, e);
                                    forward(&tx, &ServerMessage::Error { message: e });
                                }
                            }
                            Err(e) => {
                                warn!("Failed to parse message from {}: {}", addr, e);
                                forward(
                                    &tx,
                                    &ServerMessage::Error {
                                        message: format!("Invalid message format: {}", e),
                                    },
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} closed connection", addr);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        // Transport-level keepalive; registry liveness is the
                        // inactivity sweep.
                        let _ = tx.send(Message::Pong(data));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut send_task => {
                break;
            }
        }
    }

    // Teardown: free the identifier, notify everyone still connected.
    {
        let mut st = state.lock().await;
        if let Some(user_id) = st.drop_session(&session_id) {
            info!("User disconnected: {}", user_id);
        }
    }

    send_task.abort();
}
