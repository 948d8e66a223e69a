//! Connection lifecycle: handles, the live-connection pool, room
//! registry, and handshake authentication.

pub mod authenticator;
pub mod handle;
pub mod pool;
pub mod rooms;

pub use authenticator::WsAuthenticator;
pub use handle::{ConnectionHandle, ConnectionId};
pub use pool::ConnectionPool;
pub use rooms::RoomRegistry;
