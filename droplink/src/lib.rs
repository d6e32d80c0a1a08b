pub use droplink_core::{RoomId, UserId};

pub mod model {
    pub use droplink_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use droplink_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use droplink_client::*;
}
