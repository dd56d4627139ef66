//! DriftSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `DocumentConflict`, `ConflictResolutionResult`, `QueuedOperation`, `QueueState`
//! - **Port definitions** - Traits for adapters: `IQueueStore`, `IConnectivityMonitor`
//! - **Configuration** - Typed YAML configuration with defaults
//! - **Logging** - `tracing` subscriber setup driven by configuration
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement. The conflict
//! engine (`driftsync-conflict`) and the offline queue (`driftsync-queue`)
//! build on the types defined here.

pub mod config;
pub mod domain;
pub mod logging;
pub mod ports;
