use dashmap::DashMap;
use droplink_core::{ConnectionId, ServerEnvelope, UserId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub type EnvelopeSender = mpsc::UnboundedSender<ServerEnvelope>;

/// Connection bookkeeping: one outbound envelope queue per live socket and
/// the bidirectional connection-to-user binding. Pure bookkeeping, no
/// policy.
#[derive(Default)]
pub struct ConnectionRegistry {
    senders: DashMap<ConnectionId, EnvelopeSender>,
    conn_to_user: DashMap<ConnectionId, UserId>,
    user_to_conn: DashMap<UserId, ConnectionId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conn_id: ConnectionId, sender: EnvelopeSender) {
        self.senders.insert(conn_id, sender);
    }

    pub fn deregister(&self, conn_id: &ConnectionId) {
        self.senders.remove(conn_id);
    }

    pub fn bind(&self, conn_id: ConnectionId, user_id: UserId) {
        self.conn_to_user.insert(conn_id, user_id);
        self.user_to_conn.insert(user_id, conn_id);
    }

    /// Remove the connection's user binding, returning the user exactly once.
    ///
    /// Under a concurrent close/leave race both sides call this; only the
    /// removal winner sees `Some` and performs the room cleanup.
    pub fn unbind(&self, conn_id: &ConnectionId) -> Option<UserId> {
        let (_, user_id) = self.conn_to_user.remove(conn_id)?;
        self.user_to_conn.remove(&user_id);
        Some(user_id)
    }

    pub fn connection_of(&self, user_id: &UserId) -> Option<ConnectionId> {
        self.user_to_conn.get(user_id).map(|entry| *entry.value())
    }

    pub fn is_reachable(&self, user_id: &UserId) -> bool {
        self.connection_of(user_id)
            .is_some_and(|conn_id| self.senders.contains_key(&conn_id))
    }

    /// Fire-and-forget delivery to a connection. A missing or closed
    /// sender is skipped, not an error: the peer may have vanished between
    /// lookup and send.
    pub fn send_to_conn(&self, conn_id: &ConnectionId, envelope: ServerEnvelope) {
        match self.senders.get(conn_id) {
            Some(sender) => {
                if sender.send(envelope).is_err() {
                    debug!("outbound queue for {conn_id} already closed");
                }
            }
            None => warn!("attempted to send to unregistered connection {conn_id}"),
        }
    }

    pub fn send_to_user(&self, user_id: &UserId, envelope: ServerEnvelope) {
        if let Some(conn_id) = self.connection_of(user_id) {
            self.send_to_conn(&conn_id, envelope);
        } else {
            debug!("no live connection for user {user_id}, envelope dropped");
        }
    }
}
