//! Core node infrastructure
//!
//! Logging, configuration, node naming and the synchronization primitives
//! shared by the interrupt, radio-callback and task contexts.

pub mod config;
pub mod logging;
pub mod node_name;
pub mod sync;
