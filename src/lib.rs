//! # Kafka Fleet Manager
//!
//! Control plane for a fleet of managed Kafka data plane clusters.
//!
//! ## Overview
//!
//! The fleet manager keeps every data plane cluster it knows about in line
//! with what the control plane declares for it:
//!
//! 1. **Cluster providers** - Each cluster is driven through the provider of its
//!    provider type (OCM, standalone), resolved at runtime by the provider factory
//! 2. **Operator installation** - Once provisioned, clusters get the strimzi
//!    operator and the fleet-shard agent installed through OLM resources
//! 3. **Reconciling applier** - Resources are applied in order and only written
//!    when they differ from what was last applied
//! 4. **Validation pipelines** - Kafka creation, update and promotion requests and
//!    enterprise cluster registrations are checked by ordered, fail-fast validators
//!
//! ## Features
//!
//! - **Idempotent applies**: the last-applied configuration annotation decides whether to write
//! - **Per-cluster backoff**: a failing cluster is retried on a Fibonacci schedule
//! - **Prometheus metrics**: exposed with liveness and readiness probes
//! - **Dry runs**: apply against an in-memory cluster instead of real data plane clusters

pub mod api;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod enterprise;
pub mod error;
pub mod observability;
pub mod provider;
pub mod runtime;
pub mod services;
pub mod validation;
