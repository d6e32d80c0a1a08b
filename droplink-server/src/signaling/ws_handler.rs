use crate::signaling::SignalingRouter;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use droplink_core::{ClientEnvelope, ConnectionId};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(router): State<SignalingRouter>,
) -> impl IntoResponse {
    let conn_id = ConnectionId::new();
    ws.on_upgrade(move |socket| handle_socket(socket, conn_id, router))
}

async fn handle_socket(socket: WebSocket, conn_id: ConnectionId, router: SignalingRouter) {
    info!("new signaling connection: {conn_id}");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    router.register_connection(conn_id, tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let json = match serde_json::to_string(&envelope) {
                Ok(json) => json,
                Err(e) => {
                    error!("failed to serialize envelope: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let router = router.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientEnvelope>(&text) {
                        Ok(envelope) => router.dispatch(conn_id, envelope),
                        // A malformed envelope never kills the connection.
                        Err(e) => warn!("invalid envelope from {conn_id}: {e}"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    router.disconnect(conn_id);
    info!("signaling connection closed: {conn_id}");
}
