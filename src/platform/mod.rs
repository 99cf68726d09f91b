//! Platform abstraction layer
//!
//! This module provides the hardware collaborators the node consumes: the
//! connectionless radio and the button's edge interrupt. Radio bring-up and
//! pin muxing stay in the board crate; only these narrow traits cross over.

pub mod error;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{GpioError, PlatformError, RadioError, Result};
pub use traits::{EdgeHandler, EdgeInterrupt, MacAddress, RadioEvents, RadioInterface, SendStatus};
