use crate::link::TransitionError;
use crate::transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Room command issued before the server confirmed the join.
    #[error("not joined to a room")]
    NotJoined,

    /// File send attempted before the transfer channel is open. Local
    /// failure only; nothing reaches the network.
    #[error("transfer channel not ready")]
    ChannelNotReady,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}
