//! C9: WebSocket protocol (§4.7). Framing, handshake lifecycle,
//! per-connection back-pressure/rate-limiting, and subscription fan-out —
//! a thin adaptor in front of whatever [`handler::RequestHandler`]
//! implementation owns the actual indexer/mempool/VM state.

pub mod connection;
pub mod frame;
pub mod handler;
pub mod messages;
pub mod notification;
pub mod opcode;
pub mod server;

pub use connection::{ConnectionError, ConnectionState, RateLimiter};
pub use frame::{ClientFrame, FrameError, ServerFrame};
pub use handler::{HandlerError, RequestHandler};
pub use notification::NotificationManager;
pub use opcode::{CloseCode, Opcode, SubscriptionType};
pub use server::{serve, AppState, ServerConfig};
