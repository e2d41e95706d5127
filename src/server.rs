//! HTTP routing: CORS preflight, the read-only status surface, and the
//! WebSocket upgrade that hands connections to the lifecycle handler.

use std::net::SocketAddr;

use chrono::Utc;
use hyper::{Body, Method, Request, Response, StatusCode};
use log::error;
use serde_json::json;

use crate::connection;
use crate::state::SharedState;

fn decode_path_segment(seg: &str) -> String {
    match urlencoding::decode(seg) {
        Ok(s) => s.into_owned(),
        Err(_) => seg.to_string(),
    }
}

fn json_response(body: String) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

pub async fn handle_request(
    mut req: Request<Body>,
    addr: SocketAddr,
    state: SharedState,
) -> Result<Response<Body>, hyper::Error> {
    // CORS preflight (browser clients call the status endpoints directly).
    if req.method() == Method::OPTIONS {
        return Ok(Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "GET, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type")
            .header("Access-Control-Max-Age", "86400")
            .body(Body::empty())
            .unwrap());
    }

    // WebSocket upgrade
    if hyper_tungstenite::is_upgrade_request(&req) {
        match hyper_tungstenite::upgrade(&mut req, None) {
            Ok((response, websocket)) => {
                tokio::spawn(async move {
                    match websocket.await {
                        Ok(ws) => connection::handle_connection(ws, addr, state).await,
                        Err(e) => error!("WebSocket handshake with {} failed: {}", addr, e),
                    }
                });
                return Ok(response);
            }
            Err(e) => {
                error!("WebSocket upgrade error from {}: {}", addr, e);
                return Ok(Response::builder()
                    .status(StatusCode::BAD_REQUEST)
                    .body(Body::from("Invalid WebSocket upgrade request"))
                    .unwrap());
            }
        }
    }

    let mut resp = route_status(&req, &state).await;
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", "*".parse().unwrap());
    headers.insert("Access-Control-Allow-Methods", "GET, OPTIONS".parse().unwrap());
    headers.insert("Access-Control-Allow-Headers", "Content-Type".parse().unwrap());
    Ok(resp)
}

/// Read-only status surface. Each endpoint sweeps idle registrations before
/// reading so reported presence reflects the inactivity TTL.
async fn route_status(req: &Request<Body>, state: &SharedState) -> Response<Body> {
    let path = req.uri().path();

    if req.method() != Method::GET {
        return Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .body(Body::from("Method not allowed"))
            .unwrap();
    }

    if path == "/health" {
        let mut st = state.lock().await;
        st.sweep_idle();
        return json_response(
            json!({
                "status": "healthy",
                "active_users": st.registry.len(),
                "timestamp": Utc::now().to_rfc3339(),
            })
            .to_string(),
        );
    }

    if path == "/users/online" {
        let mut st = state.lock().await;
        st.sweep_idle();
        let users = st.registry.online_users();
        return json_response(
            json!({
                "count": users.len(),
                "users": users,
            })
            .to_string(),
        );
    }

    // GET /user/{user_id}/status
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() == 4 && parts[1] == "user" && parts[3] == "status" {
        let user_id = decode_path_segment(parts[2]);
        let mut st = state.lock().await;
        st.sweep_idle();
        return json_response(
            json!({
                "user_id": user_id,
                "online": st.registry.contains(&user_id),
            })
            .to_string(),
        );
    }

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from(
            "Not found. Use /health, /users/online, /user/{user_id}/status, or upgrade to WebSocket.",
        ))
        .unwrap()
}
