pub mod buffer;
pub mod connection;

pub use buffer::FeedBuffer;
pub use connection::{ConnectionStatus, LiveStream};
