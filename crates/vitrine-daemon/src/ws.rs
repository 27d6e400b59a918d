//! WebSocket endpoint for the page-side viewer bridge
//!
//! One socket per mount. The page bridge relays the provider embed client's
//! callbacks up and applies our commands down; everything in between happens
//! in the exhibit controller.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use vitrine_core::{ExhibitStatus, SessionId};
use vitrine_viewer::{BridgeEvent, ExhibitController, ViewerSession};

use crate::state::AppState;

/// WebSocket upgrade handler for `/ws/{mount}`
pub async fn bridge_handler(
    ws: WebSocketUpgrade,
    Path(mount): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_bridge(socket, state, mount))
}

async fn handle_bridge(socket: WebSocket, state: Arc<AppState>, mount: String) {
    let Some(exhibit) = state.exhibit_for_mount(&mount) else {
        warn!(mount = %mount, "bridge connected for unknown mount");
        return;
    };

    let session_id = SessionId::new();
    info!(mount = %mount, session = %session_id, "bridge connected");

    let (session, mut link) = ViewerSession::pair(state.config.query_timeout());
    let (status_tx, status_rx) = watch::channel(ExhibitStatus::waiting());
    state.track_session(exhibit.mount.clone(), status_rx).await;

    let controller = ExhibitController::new(
        exhibit,
        state.settings.clone(),
        session,
        status_tx,
        session_id,
    );
    let runner = tokio::spawn(controller.run());

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Forward controller commands to the bridge
            command = link.commands.recv() => {
                match command {
                    Some(command) => {
                        let json = match serde_json::to_string(&command) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!(mount = %mount, error = %e, "failed to encode command");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    // Controller is gone; nothing left to forward
                    None => break,
                }
            }

            // Route bridge messages into the session
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<BridgeEvent>(text.as_str()) {
                            Ok(event) => link.deliver(event).await,
                            Err(e) => {
                                warn!(mount = %mount, error = %e, "undecodable bridge message")
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(mount = %mount, error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    link.close().await;
    match runner.await {
        Ok(Ok(())) => info!(mount = %mount, session = %session_id, "bridge session ended"),
        Ok(Err(e)) => {
            warn!(mount = %mount, session = %session_id, error = %e, "exhibit went inert")
        }
        Err(e) => warn!(mount = %mount, error = %e, "controller task failed"),
    }
}
