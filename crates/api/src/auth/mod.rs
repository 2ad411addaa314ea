//! Session credentials and the device proof protocol.

pub mod device;
pub mod jwt;
pub mod session;
