//! Real-time chat between trusted pairs.
//!
//! Provides the ticket store that gates connections, the identity-keyed
//! delivery hub, heartbeat pings, and the HTTP upgrade handler.

mod handler;
mod heartbeat;
pub mod hub;
pub mod message;
pub mod ticket;

pub use handler::chat_handler;
pub use heartbeat::start_heartbeat;
pub use hub::Hub;
pub use ticket::TicketStore;
