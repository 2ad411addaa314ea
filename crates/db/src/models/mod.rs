//! Entity models shared by both storage backends.

pub mod device;
pub mod link_card;
pub mod nonce;
pub mod session;
pub mod trust_request;
