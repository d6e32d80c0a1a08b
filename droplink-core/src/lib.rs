pub mod model;

pub use model::{
    ClientEnvelope, ConnectionId, ProtocolError, RoomId, RoomSummary, RoomVisibility,
    ServerEnvelope, UserId,
};
