//! Live verification status: push channel wire types, transport seam,
//! and the subscription state machine.

pub mod channel;
pub mod event;
pub mod transport;

pub use channel::{ConnectionState, StatusSync, SyncStats};
pub use event::{ClientMessage, ServerEvent, StatusCache};
pub use transport::{Connection, Link, MemoryTransport, Transport, TransportEvent};
