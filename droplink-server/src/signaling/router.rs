use crate::registry::{ConnectionRegistry, EnvelopeSender, RoomRegistry};
use droplink_core::{
    ClientEnvelope, ConnectionId, ProtocolError, RoomVisibility, ServerEnvelope, UserId,
};
use std::sync::Arc;
use tracing::{debug, info};

/// The one server-side component with protocol logic: parses nothing and
/// stores nothing itself, just dispatches envelopes against the two
/// registries and forwards typed replies to the right connection(s).
///
/// Negotiation payloads (offer/answer/candidate) stay opaque; the router is
/// a pure relay keyed by target user id.
#[derive(Clone)]
pub struct SignalingRouter {
    connections: Arc<ConnectionRegistry>,
    rooms: Arc<RoomRegistry>,
}

impl SignalingRouter {
    pub fn new(connections: Arc<ConnectionRegistry>, rooms: Arc<RoomRegistry>) -> Self {
        Self { connections, rooms }
    }

    /// Attach a freshly accepted connection's outbound queue.
    pub fn register_connection(&self, conn_id: ConnectionId, sender: EnvelopeSender) {
        self.connections.register(conn_id, sender);
    }

    pub fn dispatch(&self, conn_id: ConnectionId, envelope: ClientEnvelope) {
        match envelope {
            ClientEnvelope::CreateRoom {
                room_name,
                genre,
                is_private,
            } => self.handle_create_room(conn_id, room_name, genre, is_private),

            ClientEnvelope::JoinRoom { room_id, user_name } => {
                self.handle_join_room(conn_id, room_id, user_name)
            }

            ClientEnvelope::CreateOffer {
                sdp,
                target_user_id,
                user_id,
                user_name,
            } => self.forward_description(
                conn_id,
                target_user_id,
                ServerEnvelope::Offer {
                    sdp,
                    user_id,
                    user_name,
                },
            ),

            ClientEnvelope::CreateAnswer {
                sdp,
                target_user_id,
                user_id,
                user_name,
            } => self.forward_description(
                conn_id,
                target_user_id,
                ServerEnvelope::Answer {
                    sdp,
                    user_id,
                    user_name,
                },
            ),

            ClientEnvelope::IceCandidate {
                candidate,
                target_user_id,
                user_id,
            } => self.forward_description(
                conn_id,
                target_user_id,
                ServerEnvelope::IceCandidate { candidate, user_id },
            ),

            ClientEnvelope::ChatMessage { sender_id, msg } => {
                self.handle_chat(conn_id, sender_id, msg)
            }

            ClientEnvelope::ListPublicRooms { query } => {
                let rooms = self.rooms.list_public(&query);
                self.connections
                    .send_to_conn(&conn_id, ServerEnvelope::PublicRoomsList { rooms });
            }
        }
    }

    /// Connection teardown: explicit leave and abrupt close share this path.
    /// `unbind` hands the user to exactly one caller, so the room cleanup
    /// and `member-left` fan-out run once even under close/leave races.
    pub fn disconnect(&self, conn_id: ConnectionId) {
        if let Some(user_id) = self.connections.unbind(&conn_id) {
            let remaining = self.rooms.leave(&user_id);
            info!("user {user_id} left ({} co-members remain)", remaining.len());
            for member in remaining {
                self.connections
                    .send_to_user(&member, ServerEnvelope::MemberLeft { user_id });
            }
        }
        self.connections.deregister(&conn_id);
    }

    fn handle_create_room(
        &self,
        conn_id: ConnectionId,
        room_name: String,
        genre: String,
        is_private: bool,
    ) {
        let visibility = if is_private {
            RoomVisibility::Private
        } else {
            RoomVisibility::Public
        };
        let room_id = self.rooms.create_room(room_name, genre, visibility);
        self.connections
            .send_to_conn(&conn_id, ServerEnvelope::Room { room_id });
    }

    fn handle_join_room(
        &self,
        conn_id: ConnectionId,
        room_id: droplink_core::RoomId,
        user_name: String,
    ) {
        match self.rooms.join(room_id, user_name.clone()) {
            Ok(outcome) => {
                self.connections.bind(conn_id, outcome.user_id);
                self.connections.send_to_conn(
                    &conn_id,
                    ServerEnvelope::User {
                        user_id: outcome.user_id,
                    },
                );

                // Only the members that were already present learn about the
                // newcomer; the newcomer never receives its own join.
                for member in outcome.prior_members {
                    self.connections.send_to_user(
                        &member,
                        ServerEnvelope::NewMember {
                            user_id: outcome.user_id,
                            user_name: user_name.clone(),
                        },
                    );
                }
                info!("{user_name} joined room {room_id}");
            }
            Err(err) => self.reply_error(conn_id, err),
        }
    }

    /// Forward an opaque negotiation payload to the target's connection, or
    /// report `TargetUserNotFound` back to the sender. The target must still
    /// be in a room and have a live connection.
    fn forward_description(
        &self,
        conn_id: ConnectionId,
        target_user_id: UserId,
        envelope: ServerEnvelope,
    ) {
        let target_has_room = self.rooms.room_of(&target_user_id).is_some();
        if !target_has_room || !self.connections.is_reachable(&target_user_id) {
            self.reply_error(conn_id, ProtocolError::TargetUserNotFound);
            return;
        }

        debug!("forwarding negotiation payload to {target_user_id}");
        self.connections.send_to_user(&target_user_id, envelope);
    }

    fn handle_chat(&self, conn_id: ConnectionId, sender_id: UserId, msg: String) {
        match self.rooms.co_members(&sender_id) {
            Some(members) => {
                for member in members {
                    self.connections.send_to_user(
                        &member,
                        ServerEnvelope::ChatMessage {
                            sender_id,
                            msg: msg.clone(),
                        },
                    );
                }
            }
            // A sender without a current room gets a visible error rather
            // than a silent drop.
            None => self.reply_error(conn_id, ProtocolError::RoomNotFound),
        }
    }

    fn reply_error(&self, conn_id: ConnectionId, err: ProtocolError) {
        self.connections.send_to_conn(
            &conn_id,
            ServerEnvelope::Error {
                message: err.to_string(),
            },
        );
    }
}
