//! # Controller
//!
//! Resource reconciliation against data plane clusters, the error backoff of
//! the reconcile loop and the metrics/probe HTTP server.

pub mod backoff;
pub mod reconciler;
pub mod server;
