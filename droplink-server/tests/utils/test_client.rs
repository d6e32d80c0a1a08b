use droplink_core::{ClientEnvelope, ConnectionId, RoomId, ServerEnvelope, UserId};
use droplink_server::{ConnectionRegistry, RoomRegistry, SignalingRouter};
use std::sync::Arc;
use tokio::sync::mpsc;

pub fn create_test_router() -> SignalingRouter {
    SignalingRouter::new(
        Arc::new(ConnectionRegistry::new()),
        Arc::new(RoomRegistry::new()),
    )
}

/// In-process stand-in for one WebSocket client: an outbound envelope
/// receiver plus direct dispatch into the router. The router is fully
/// synchronous, so every reply is observable immediately via `try_recv`.
pub struct TestClient {
    pub conn_id: ConnectionId,
    rx: mpsc::UnboundedReceiver<ServerEnvelope>,
    router: SignalingRouter,
}

impl TestClient {
    pub fn connect(router: &SignalingRouter) -> Self {
        let conn_id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        router.register_connection(conn_id, tx);
        Self {
            conn_id,
            rx,
            router: router.clone(),
        }
    }

    pub fn send(&self, envelope: ClientEnvelope) {
        self.router.dispatch(self.conn_id, envelope);
    }

    pub fn disconnect(&self) {
        self.router.disconnect(self.conn_id);
    }

    pub fn recv(&mut self) -> ServerEnvelope {
        self.rx.try_recv().expect("expected an envelope")
    }

    pub fn try_recv(&mut self) -> Option<ServerEnvelope> {
        self.rx.try_recv().ok()
    }

    pub fn drain(&mut self) -> Vec<ServerEnvelope> {
        let mut envelopes = Vec::new();
        while let Ok(envelope) = self.rx.try_recv() {
            envelopes.push(envelope);
        }
        envelopes
    }

    pub fn create_room(&mut self, name: &str, genre: &str, is_private: bool) -> RoomId {
        self.send(ClientEnvelope::CreateRoom {
            room_name: name.into(),
            genre: genre.into(),
            is_private,
        });
        match self.recv() {
            ServerEnvelope::Room { room_id } => room_id,
            other => panic!("expected room reply, got {other:?}"),
        }
    }

    /// Join and expect success, returning the allocated user id.
    pub fn join(&mut self, room_id: RoomId, user_name: &str) -> UserId {
        self.send(ClientEnvelope::JoinRoom {
            room_id,
            user_name: user_name.into(),
        });
        match self.recv() {
            ServerEnvelope::User { user_id } => user_id,
            other => panic!("expected user reply, got {other:?}"),
        }
    }

    /// Join and expect an `error` reply, returning its message.
    pub fn join_expecting_error(&mut self, room_id: RoomId, user_name: &str) -> String {
        self.send(ClientEnvelope::JoinRoom {
            room_id,
            user_name: user_name.into(),
        });
        match self.recv() {
            ServerEnvelope::Error { message } => message,
            other => panic!("expected error reply, got {other:?}"),
        }
    }
}
