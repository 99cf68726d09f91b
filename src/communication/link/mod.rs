//! Command packet link
//!
//! Short, typed command packets exchanged with peers over a connectionless
//! radio, a discovery handshake that learns one counterpart's address, and a
//! table-driven dispatcher for inbound commands.
//!
//! # Architecture
//!
//! ```text
//!  button task ──report──┐            ┌── discovery/receive loop
//!                        ▼            ▼
//!                 ┌──────────────────────────┐
//!                 │ LinkManager              │  peer state + CommandRouter
//!                 └───────┬──────────▲───────┘  (one async mutex)
//!                   send  │          │ receive
//!                 ┌───────▼──────────┴───────┐
//!                 │ LinkTransport            │  send gate, inbound queue (10)
//!                 └───────┬──────────▲───────┘
//!               encode    │          │ decode (radio callback context)
//!                 ┌───────▼──────────┴───────┐
//!                 │ RadioInterface           │  platform driver
//!                 └──────────────────────────┘
//! ```

pub mod codec;
pub mod manager;
pub mod router;
pub mod transport;

use core::fmt;

use crate::platform::error::RadioError;

pub use codec::{CommandId, Frame, Package};
pub use manager::{
    DiscoveryState, DisplayUpdate, LinkManager, LinkState, ManagerStats, NodeIdentity,
};
pub use router::{CommandRoute, CommandRouter, DispatchOutcome, MatchFlags};
pub use transport::{LinkTransport, TransportStats, RX_QUEUE_CAPACITY};

/// Reserved command identifiers
pub mod commands {
    use super::CommandId;

    /// Discovery request, broadcast while no peer is known
    pub const DISCOVERY_REQUEST: CommandId = CommandId::new(*b"CDSC");

    /// Discovery reply, unicast to the requesting node
    pub const DISCOVERY_REPLY: CommandId = CommandId::new(*b"RDSC");

    /// Button press count (`i32`), unicast to the learned peer
    pub const BUTTON_COUNT: CommandId = CommandId::new(*b"CBUT");

    /// Score update (`i32`) for the local display
    pub const SCORE_UPDATE: CommandId = CommandId::new(*b"CSCR");
}

/// Link-layer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// `LinkTransport::init` has not completed
    NotInitialized,
    /// Radio driver error (setup or submission)
    Radio(RadioError),
    /// Address cannot be used as a unicast peer
    InvalidAddress,
    /// Radio peer table has no free slot
    PeerTableFull,
    /// Completion callback reported a failed transmission
    SendFailed,
    /// Timed out waiting for the send gate or the completion callback
    Timeout,
    /// No peer has been discovered yet
    PeerUnknown,
}

impl From<RadioError> for LinkError {
    fn from(error: RadioError) -> Self {
        LinkError::Radio(error)
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::NotInitialized => write!(f, "link not initialized"),
            LinkError::Radio(e) => write!(f, "radio error: {}", e),
            LinkError::InvalidAddress => write!(f, "invalid peer address"),
            LinkError::PeerTableFull => write!(f, "peer table full"),
            LinkError::SendFailed => write!(f, "send failed"),
            LinkError::Timeout => write!(f, "operation timed out"),
            LinkError::PeerUnknown => write!(f, "peer not discovered"),
        }
    }
}
