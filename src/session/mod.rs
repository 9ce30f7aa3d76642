mod protocol;
mod server;
mod store;

pub use protocol::{ClientMessage, ServerMessage, SessionHandler};
pub use server::SessionServer;
pub use store::{Admission, GroupSnapshot, GroupStore, StudentRecord, GROUP_CAPACITY, GROUP_COUNT};
