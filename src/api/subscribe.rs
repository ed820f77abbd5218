//! `GET /subscriptions`: every change event, as JSON text frames, from the
//! moment the socket connects. Nothing is replayed.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::api::routes::ApiState;
use crate::state::MatchStore;
use crate::types::ChangeEvent;

pub async fn subscriptions<S: MatchStore>(
    State(state): State<ApiState<S>>,
    ws: WebSocketUpgrade,
) -> Response {
    let rx = state.bus.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, rx))
}

async fn stream_events(mut socket: WebSocket, mut rx: broadcast::Receiver<ChangeEvent>) {
    info!("Subscriber connected");
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(t) => t,
                        Err(e) => {
                            warn!("Could not encode change event: {e}");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Subscriber lagging, skipped {n} events");
                }
                Err(RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(other)) => debug!("Ignoring client frame: {other:?}"),
            },
        }
    }
    info!("Subscriber disconnected");
}
