use crate::model::ids::{RoomId, UserId};
use crate::model::room::RoomSummary;
use serde::{Deserialize, Serialize};

/// Everything a client may send over its signaling connection.
///
/// `sdp` and `candidate` payloads are opaque to the server; it relays them
/// untouched to the target connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEnvelope {
    /// Metadata fields default so a bare `{"type":"create-room"}` from an
    /// older client still parses: unnamed rooms stay private.
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        #[serde(default)]
        room_name: String,
        #[serde(default)]
        genre: String,
        #[serde(default = "default_private")]
        is_private: bool,
    },
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId, user_name: String },
    #[serde(rename_all = "camelCase")]
    CreateOffer {
        sdp: String,
        target_user_id: UserId,
        user_id: UserId,
        user_name: String,
    },
    #[serde(rename_all = "camelCase")]
    CreateAnswer {
        sdp: String,
        target_user_id: UserId,
        user_id: UserId,
        user_name: String,
    },
    #[serde(rename_all = "camelCase")]
    IceCandidate {
        candidate: String,
        target_user_id: UserId,
        user_id: UserId,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage { sender_id: UserId, msg: String },
    #[serde(rename_all = "camelCase")]
    ListPublicRooms {
        #[serde(default)]
        query: String,
    },
}

fn default_private() -> bool {
    true
}

/// Everything the server may send to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEnvelope {
    #[serde(rename_all = "camelCase")]
    Room { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    User { user_id: UserId },
    #[serde(rename_all = "camelCase")]
    NewMember { user_id: UserId, user_name: String },
    #[serde(rename_all = "camelCase")]
    MemberLeft { user_id: UserId },
    #[serde(rename_all = "camelCase")]
    Offer {
        sdp: String,
        user_id: UserId,
        user_name: String,
    },
    #[serde(rename_all = "camelCase")]
    Answer {
        sdp: String,
        user_id: UserId,
        user_name: String,
    },
    #[serde(rename_all = "camelCase")]
    IceCandidate { candidate: String, user_id: UserId },
    #[serde(rename_all = "camelCase")]
    ChatMessage { sender_id: UserId, msg: String },
    #[serde(rename_all = "camelCase")]
    PublicRoomsList { rooms: Vec<RoomSummary> },
    Error { message: String },
}
