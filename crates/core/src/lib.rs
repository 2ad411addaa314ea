//! Domain primitives shared by the storage and API layers.
//!
//! Nothing in here performs I/O: identity derivation, proof verification,
//! random code generation and the trust state rules are all pure functions
//! so both storage backends and the protocol services can reuse them.

pub mod codes;
pub mod error;
pub mod hashing;
pub mod identity;
pub mod proof;
pub mod trust;
pub mod types;
