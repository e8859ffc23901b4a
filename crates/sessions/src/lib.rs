//! Session lifecycle for SessionKeeper.
//!
//! Server-side state for already-logged-in clients: a concurrent in-memory
//! registry, unpredictable identifiers, inactivity expiry and a line-based
//! durable file that carries sessions across graceful restarts.

pub mod codec;
pub mod expiry;
pub mod lifecycle;
pub mod record;
pub mod session_id;
pub mod store;
pub mod sweeper;
pub mod transport;

pub use lifecycle::SessionLifecycleService;
pub use record::SessionRecord;
pub use session_id::redact;
pub use store::SessionStore;
pub use sweeper::Sweeper;
pub use transport::{ClientInfo, TransportBinding};
