//! Mock platform implementation for testing
//!
//! This module provides mock implementations of platform traits that can be used
//! for unit testing without requiring actual hardware.
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled
//!
//! # Example
//!
//! ```ignore
//! use relay_node::platform::mock::MockRadio;
//! use relay_node::platform::traits::{MacAddress, RadioInterface, SendStatus};
//!
//! let radio = MockRadio::new(MacAddress::new([0x24, 0x6F, 0x28, 0, 0, 1]));
//! radio.set_auto_complete(Some(SendStatus::Success));
//! radio.send_async(&MacAddress::BROADCAST, b"CDSC")?;
//! ```

#![cfg(any(test, feature = "mock"))]

mod gpio;
mod radio;

pub use gpio::MockButtonPin;
pub use radio::{MockRadio, SentFrame, MAX_MOCK_FRAME, OUTBOX_CAPACITY, PEER_CAPACITY};
