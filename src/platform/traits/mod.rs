//! Platform abstraction traits
//!
//! This module defines the traits that platform implementations must provide.

pub mod gpio;
pub mod radio;

// Re-export trait interfaces
pub use gpio::{EdgeHandler, EdgeInterrupt, EdgeTrigger, Pull};
pub use radio::{MacAddress, RadioEvents, RadioInterface, SendStatus, ADDRESS_LEN};
