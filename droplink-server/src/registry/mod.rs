mod connections;
mod rooms;

pub use connections::*;
pub use rooms::*;
