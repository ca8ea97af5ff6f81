//! # Observability
//!
//! Prometheus metrics for the reconcile loop, the applier and the validation
//! pipelines. Logging is plain `tracing`, configured in `runtime::initialization`.

pub mod metrics;
