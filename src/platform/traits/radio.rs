//! Radio interface trait
//!
//! This module defines the connectionless radio link (ESP-NOW style) that
//! platform implementations must provide: asynchronous frame submission, a
//! send-completion callback, a receive callback, the node's own link-layer
//! address and a peer table for unicast destinations.
//!
//! # Execution contexts
//!
//! [`RadioEvents`] methods run on the radio stack's own context (a driver
//! task or an interrupt-level callback), never on the caller's task. They must
//! not block.

use core::fmt;

use crate::platform::error::RadioError;

/// Length of a link-layer address
pub const ADDRESS_LEN: usize = 6;

/// Six-byte link-layer address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddress(pub [u8; ADDRESS_LEN]);

impl MacAddress {
    /// All-ones broadcast address
    pub const BROADCAST: Self = Self([0xFF; ADDRESS_LEN]);

    /// All-zero address, used as the "unknown" sentinel
    pub const UNSPECIFIED: Self = Self([0x00; ADDRESS_LEN]);

    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// `true` iff every byte is `0xFF`
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// `true` iff every byte is zero
    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }

    /// `true` if the group bit (LSB of the first octet) is set
    pub fn is_group(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// `true` for addresses a frame can be unicast to
    pub fn is_unicast(&self) -> bool {
        !self.is_unspecified() && !self.is_group()
    }
}

impl From<[u8; ADDRESS_LEN]> for MacAddress {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Outcome reported by the send-completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendStatus {
    /// Frame left the radio (and was acknowledged for unicast)
    Success,
    /// Transmission failed
    Failure,
}

/// Callbacks invoked by the radio stack
///
/// Exactly one sink is registered per radio for the lifetime of the process.
pub trait RadioEvents: Sync {
    /// Called exactly once per accepted [`RadioInterface::send_async`]
    fn on_send_complete(&self, destination: &MacAddress, status: SendStatus);

    /// Called once per inbound frame with the transport-reported bytes
    fn on_receive(&self, source: &MacAddress, frame: &[u8]);
}

/// Radio interface trait
///
/// # Safety Invariants
///
/// - `register_events` is called once, before any frame is submitted
/// - At most one `send_async` is outstanding (the link transport serializes)
/// - Unicast destinations must be added with `add_peer` before sending
pub trait RadioInterface {
    /// This node's own link-layer address
    fn own_address(&self) -> MacAddress;

    /// Install the process-wide callback sink
    ///
    /// # Errors
    ///
    /// Returns `RadioError::CallbackRegistration` if the stack refuses.
    fn register_events(&self, events: &'static dyn RadioEvents) -> Result<(), RadioError>;

    /// Add a unicast destination to the radio's peer table
    ///
    /// # Errors
    ///
    /// - `RadioError::PeerTableFull` if no slot is free
    /// - `RadioError::PeerExists` if the address is already registered
    /// - `RadioError::InvalidArgument` for a malformed address
    fn add_peer(&self, address: &MacAddress) -> Result<(), RadioError>;

    /// Submit a frame for transmission
    ///
    /// Returns as soon as the frame is queued; the outcome is delivered later
    /// through [`RadioEvents::on_send_complete`]. A submission error means no
    /// completion callback will follow.
    fn send_async(&self, destination: &MacAddress, frame: &[u8]) -> Result<(), RadioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_only_for_all_ones() {
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert!(!MacAddress::UNSPECIFIED.is_broadcast());
        assert!(!MacAddress::new([0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]).is_broadcast());
        assert!(!MacAddress::new([0x24, 0x6F, 0x28, 0x01, 0x02, 0x03]).is_broadcast());
    }

    #[test]
    fn unicast_excludes_group_and_zero() {
        assert!(MacAddress::new([0x24, 0x6F, 0x28, 0x01, 0x02, 0x03]).is_unicast());
        assert!(!MacAddress::UNSPECIFIED.is_unicast());
        assert!(!MacAddress::BROADCAST.is_unicast());
        assert!(!MacAddress::new([0x01, 0x00, 0x5E, 0x00, 0x00, 0x01]).is_unicast());
    }

    #[test]
    fn display_is_colon_separated_hex() {
        let addr = MacAddress::new([0x24, 0x6F, 0x28, 0xAB, 0x0C, 0x01]);
        assert_eq!(format!("{}", addr), "24:6F:28:AB:0C:01");
    }
}
