//! Packet encoding and decoding.
//!
//! Converts between the host-side [`Package`] and the wire [`Frame`]. Pure
//! functions, no state, no I/O.
//!
//! ## Frame Format
//!
//! | Field       | Size (bytes)             | Description                                  |
//! |-------------|--------------------------|----------------------------------------------|
//! | destination | 6                        | Recipient address, or all-ones for broadcast |
//! | command     | 4 (`COMMAND_LEN`)        | Raw identifier bytes, no terminator          |
//! | data        | 0..=16 (`MAX_PAYLOAD`)   | Payload                                      |
//!
//! The payload length is not on the wire: it is the transport-reported frame
//! length minus [`HEADER_LEN`].

use core::fmt;
use core::mem::size_of;

use bytemuck::Pod;

use crate::platform::traits::{MacAddress, ADDRESS_LEN};

/// Command identifier length
pub const COMMAND_LEN: usize = 4;

/// Maximum payload carried by one frame
pub const MAX_PAYLOAD: usize = 16;

/// Fixed header: destination + command
pub const HEADER_LEN: usize = ADDRESS_LEN + COMMAND_LEN;

/// Largest frame on the wire
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD;

const COMMAND_OFFSET: usize = ADDRESS_LEN;
const DATA_OFFSET: usize = HEADER_LEN;

/// Four-byte command identifier
///
/// Identifiers always compare on exactly four bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId([u8; COMMAND_LEN]);

impl CommandId {
    /// Create an identifier from its four bytes
    pub const fn new(bytes: [u8; COMMAND_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw identifier bytes
    pub const fn as_bytes(&self) -> &[u8; COMMAND_LEN] {
        &self.0
    }

    /// Identifier as text; `"????"` if the bytes are not UTF-8
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Debug for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandId({:?})", self.as_str())
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CommandId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.as_str())
    }
}

/// Decoded, host-side message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Package {
    /// Command identifier
    pub command: CommandId,
    data: [u8; MAX_PAYLOAD],
    data_len: usize,
    /// Sender address; unspecified on locally built packages
    pub source: MacAddress,
    /// Recipient address
    pub destination: MacAddress,
    /// Destination is the broadcast address
    pub is_broadcast: bool,
    /// Destination is this node's own address (set on receipt only)
    pub is_for_me: bool,
}

impl Package {
    /// Command-only package (no payload)
    pub fn new(destination: MacAddress, command: CommandId) -> Self {
        Self {
            command,
            data: [0; MAX_PAYLOAD],
            data_len: 0,
            source: MacAddress::UNSPECIFIED,
            destination,
            is_broadcast: destination.is_broadcast(),
            is_for_me: false,
        }
    }

    /// Package with raw payload; anything past [`MAX_PAYLOAD`] is dropped
    pub fn with_payload(destination: MacAddress, command: CommandId, payload: &[u8]) -> Self {
        let mut package = Self::new(destination, command);
        package.set_payload(payload);
        package
    }

    /// Package carrying the bytes of a plain-data value
    ///
    /// Values larger than [`MAX_PAYLOAD`] are truncated.
    pub fn with_value<T: Pod>(destination: MacAddress, command: CommandId, value: &T) -> Self {
        Self::with_payload(destination, command, bytemuck::bytes_of(value))
    }

    /// Read the payload as `T`
    ///
    /// Returns `None` unless the payload is exactly `size_of::<T>()` bytes.
    pub fn value<T: Pod>(&self) -> Option<T> {
        if self.data_len != size_of::<T>() {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(self.payload()))
    }

    /// Payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.data_len]
    }

    /// Payload length (0..=16)
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Addressed to this node specifically, not a broadcast
    pub fn is_only_for_me(&self) -> bool {
        self.is_for_me && !self.is_broadcast
    }

    fn set_payload(&mut self, payload: &[u8]) {
        let len = payload.len().min(MAX_PAYLOAD);
        self.data[..len].copy_from_slice(&payload[..len]);
        self.data_len = len;
    }
}

/// Wire representation of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    buf: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl Frame {
    /// Bytes to hand to the radio
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// On-wire length (10..=26)
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: a frame carries at least its header
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Frame decode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Shorter than the fixed header
    TooShort(usize),
    /// Longer than header + maximum payload
    TooLong(usize),
    /// Reported length exceeds the bytes provided
    Truncated {
        /// Length reported by the transport
        declared: usize,
        /// Bytes actually available
        available: usize,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::TooShort(len) => {
                write!(f, "frame too short: {} < {} bytes", len, HEADER_LEN)
            }
            CodecError::TooLong(len) => {
                write!(f, "frame too long: {} > {} bytes", len, MAX_FRAME_LEN)
            }
            CodecError::Truncated {
                declared,
                available,
            } => write!(
                f,
                "frame truncated: {} bytes declared, {} available",
                declared, available
            ),
        }
    }
}

/// Encode a package into its wire frame
pub fn encode(package: &Package) -> Frame {
    let mut buf = [0u8; MAX_FRAME_LEN];
    buf[..ADDRESS_LEN].copy_from_slice(package.destination.as_bytes());
    buf[COMMAND_OFFSET..DATA_OFFSET].copy_from_slice(package.command.as_bytes());

    let payload = package.payload();
    buf[DATA_OFFSET..DATA_OFFSET + payload.len()].copy_from_slice(payload);

    Frame {
        buf,
        len: HEADER_LEN + payload.len(),
    }
}

/// Decode `length` bytes of `raw` received from `source`
///
/// `is_broadcast` / `is_for_me` are left `false`; they depend on the node's
/// own address and are filled in by the transport.
///
/// # Errors
///
/// - [`CodecError::TooShort`] if `length < HEADER_LEN`
/// - [`CodecError::TooLong`] if `length > MAX_FRAME_LEN`
/// - [`CodecError::Truncated`] if `raw` holds fewer than `length` bytes
pub fn decode(raw: &[u8], length: usize, source: MacAddress) -> Result<Package, CodecError> {
    if length < HEADER_LEN {
        return Err(CodecError::TooShort(length));
    }
    if length > MAX_FRAME_LEN {
        return Err(CodecError::TooLong(length));
    }
    if raw.len() < length {
        return Err(CodecError::Truncated {
            declared: length,
            available: raw.len(),
        });
    }

    let mut destination = [0u8; ADDRESS_LEN];
    destination.copy_from_slice(&raw[..ADDRESS_LEN]);
    let mut command = [0u8; COMMAND_LEN];
    command.copy_from_slice(&raw[COMMAND_OFFSET..DATA_OFFSET]);

    let mut package = Package::new(MacAddress::new(destination), CommandId::new(command));
    package.is_broadcast = false;
    package.set_payload(&raw[DATA_OFFSET..length]);
    package.source = source;
    Ok(package)
}
