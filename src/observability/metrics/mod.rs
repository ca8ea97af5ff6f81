//! # Metrics Module
//!
//! Prometheus metrics for monitoring the fleet manager, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text encoding
//! - `reconcile_metrics` - Cluster reconcile passes and per-resource apply outcomes
//! - `validation_metrics` - Validation pipeline failures by reason

pub mod reconcile_metrics;
pub mod registry;
pub mod validation_metrics;

pub use reconcile_metrics::*;
pub use registry::*;
pub use validation_metrics::*;
