//! Communication Protocols
//!
//! # Protocols
//!
//! - **Command link**: short command packets over a connectionless radio
//!   - Fixed 10-byte header, up to 16 payload bytes
//!   - Broadcast discovery of a single peer
//!   - Table-driven command dispatch
//!
//! # Transport Layers
//!
//! - ESP-NOW style radios: peer table, asynchronous send with completion
//!   callback, receive callback

pub mod link;
