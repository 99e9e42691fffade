mod backoff;
mod message;
mod socket;

pub use backoff::{ConnectionState, ReconnectPolicy};
pub use message::LiveMessage;
pub use socket::LiveSyncClient;
