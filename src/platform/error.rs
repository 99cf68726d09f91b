//! Platform error types
//!
//! This module defines error types for the hardware collaborators (radio and
//! GPIO) consumed by the link layer and the button pipeline.

use core::fmt;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, PlatformError>;

/// Platform-level errors
///
/// All platform implementations map their driver-specific errors to these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlatformError {
    /// Radio operation failed
    Radio(RadioError),
    /// GPIO operation failed
    Gpio(GpioError),
    /// Platform initialization failed
    InitializationFailed,
    /// Invalid configuration provided
    InvalidConfig,
    /// Resource not available
    ResourceUnavailable,
}

/// Radio-specific errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// Radio stack not started
    NotStarted,
    /// Submission rejected by the radio stack
    SendRejected,
    /// Destination has not been registered as a peer
    PeerNotFound,
    /// Peer already registered
    PeerExists,
    /// Peer table has no free slot
    PeerTableFull,
    /// Address or frame rejected as malformed
    InvalidArgument,
    /// Frame longer than the radio accepts
    FrameTooLong,
    /// Callback registration failed
    CallbackRegistration,
}

/// GPIO-specific errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioError {
    /// Invalid pin number
    InvalidPin,
    /// Invalid mode for operation
    InvalidMode,
    /// Interrupt handler already attached
    HandlerInUse,
}

impl From<RadioError> for PlatformError {
    fn from(error: RadioError) -> Self {
        PlatformError::Radio(error)
    }
}

impl From<GpioError> for PlatformError {
    fn from(error: GpioError) -> Self {
        PlatformError::Gpio(error)
    }
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioError::NotStarted => write!(f, "radio not started"),
            RadioError::SendRejected => write!(f, "send rejected"),
            RadioError::PeerNotFound => write!(f, "peer not found"),
            RadioError::PeerExists => write!(f, "peer already registered"),
            RadioError::PeerTableFull => write!(f, "peer table full"),
            RadioError::InvalidArgument => write!(f, "invalid argument"),
            RadioError::FrameTooLong => write!(f, "frame too long"),
            RadioError::CallbackRegistration => write!(f, "callback registration failed"),
        }
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Radio(e) => write!(f, "Radio error: {}", e),
            PlatformError::Gpio(e) => write!(f, "GPIO error: {:?}", e),
            PlatformError::InitializationFailed => write!(f, "Platform initialization failed"),
            PlatformError::InvalidConfig => write!(f, "Invalid configuration"),
            PlatformError::ResourceUnavailable => write!(f, "Resource not available"),
        }
    }
}
