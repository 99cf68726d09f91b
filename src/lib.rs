#![cfg_attr(not(test), no_std)]

//! relay_node - Button relay node over a peer-to-peer radio link
//!
//! This library provides the platform abstraction, the command packet link
//! (codec, transport, discovery, dispatch) and the button event pipeline of a
//! small node that counts button presses and reports them to a discovered peer.

// Platform abstraction layer (radio, GPIO, mocks)
pub mod platform;

// Device drivers using platform abstraction
pub mod devices;

// Core systems (configuration, logging, synchronization)
pub mod core;

// Communication protocols (command link)
pub mod communication;
