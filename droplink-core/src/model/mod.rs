mod envelope;
mod error;
mod ids;
mod room;

pub use envelope::{ClientEnvelope, ServerEnvelope};
pub use error::ProtocolError;
pub use ids::{ConnectionId, RoomId, UserId};
pub use room::{RoomSummary, RoomVisibility};
