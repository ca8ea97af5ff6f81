//! # API Types
//!
//! Records and payloads exchanged between providers, validators and the store.

pub mod claims;
pub mod cluster;
pub mod kafka;
pub mod secret;

pub use claims::{require_claims, Claims};
pub use cluster::*;
pub use kafka::*;
pub use secret::SecretString;
