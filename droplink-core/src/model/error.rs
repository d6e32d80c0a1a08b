use thiserror::Error;

/// Registry-level failures the router reports back to the originating
/// client as an `error` envelope. The display texts are the wire strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Room or target user not found")]
    TargetUserNotFound,
}
