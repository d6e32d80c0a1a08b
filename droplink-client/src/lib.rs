mod error;
mod link;
mod session;
mod transfer;
mod transport;

pub use error::*;
pub use link::*;
pub use session::*;
pub use transfer::*;
pub use transport::*;
