//! PostgreSQL repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` as the first argument. Multi-statement operations that must be
//! atomic open their own transaction.

pub mod device_repo;
pub mod link_card_repo;
pub mod nonce_repo;
pub mod session_repo;
pub mod trust_request_repo;

pub use device_repo::DeviceRepo;
pub use link_card_repo::LinkCardRepo;
pub use nonce_repo::NonceRepo;
pub use session_repo::SessionRepo;
pub use trust_request_repo::TrustRequestRepo;
