
pub use mock_transport::*;
