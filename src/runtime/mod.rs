//! # Runtime Module
//!
//! Runtime components of the fleet manager: initialization, the reconcile loop
//! and its error handling.

pub mod error_policy;
pub mod initialization;
pub mod reconcile_loop;

pub use error_policy::*;
pub use initialization::*;
pub use reconcile_loop::*;
