//! Mock radio implementation for testing
//!
//! Records submitted frames and lets the test drive the radio-stack side:
//! completing sends (or letting them complete automatically) and delivering
//! inbound frames to the registered [`RadioEvents`] sink.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;

use crate::platform::{
    error::RadioError,
    traits::{MacAddress, RadioEvents, RadioInterface, SendStatus},
};

/// Largest frame the mock accepts (ESP-NOW payload limit)
pub const MAX_MOCK_FRAME: usize = 250;

/// Number of submitted frames kept for inspection
pub const OUTBOX_CAPACITY: usize = 32;

/// Peer table size (ESP-NOW default)
pub const PEER_CAPACITY: usize = 20;

/// Frame captured by [`MockRadio::send_async`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    /// Destination passed to `send_async`
    pub destination: MacAddress,
    /// Frame bytes as submitted
    pub bytes: Vec<u8, MAX_MOCK_FRAME>,
}

struct MockRadioState {
    events: Option<&'static dyn RadioEvents>,
    peers: Vec<MacAddress, PEER_CAPACITY>,
    peer_limit: usize,
    outbox: Vec<SentFrame, OUTBOX_CAPACITY>,
    last_destination: Option<MacAddress>,
    auto_complete: Option<SendStatus>,
    submit_error: Option<RadioError>,
    register_error: Option<RadioError>,
}

/// Mock radio
///
/// Interior mutability through a critical-section mutex, so the same
/// instance can sit inside a `static` link transport shared across tasks.
pub struct MockRadio {
    address: MacAddress,
    state: Mutex<RefCell<MockRadioState>>,
}

impl MockRadio {
    /// Create a mock radio with the given own address
    ///
    /// Sends stay pending until [`MockRadio::complete_send`] is called.
    pub const fn new(address: MacAddress) -> Self {
        Self {
            address,
            state: Mutex::new(RefCell::new(MockRadioState {
                events: None,
                peers: Vec::new(),
                peer_limit: PEER_CAPACITY,
                outbox: Vec::new(),
                last_destination: None,
                auto_complete: None,
                submit_error: None,
                register_error: None,
            })),
        }
    }

    /// Complete every accepted send immediately with `status`
    /// (`None` = leave sends pending)
    pub fn set_auto_complete(&self, status: Option<SendStatus>) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).auto_complete = status);
    }

    /// Limit the peer table below [`PEER_CAPACITY`]
    pub fn set_peer_limit(&self, limit: usize) {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).peer_limit = limit.min(PEER_CAPACITY)
        });
    }

    /// Reject the next `send_async` with `error`
    pub fn fail_next_submit(&self, error: RadioError) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).submit_error = Some(error));
    }

    /// Reject `register_events` with `error`
    pub fn fail_registration(&self, error: RadioError) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).register_error = Some(error));
    }

    /// `true` once a callback sink is registered
    pub fn has_events(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).events.is_some())
    }

    /// Fire the send-completion callback for the last submitted frame
    ///
    /// Returns `false` if nothing was submitted or no sink is registered.
    pub fn complete_send(&self, status: SendStatus) -> bool {
        let target = critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            state.events.zip(state.last_destination)
        });
        match target {
            Some((events, destination)) => {
                events.on_send_complete(&destination, status);
                true
            }
            None => false,
        }
    }

    /// Deliver an inbound frame to the registered sink
    ///
    /// Returns `false` if no sink is registered.
    pub fn deliver(&self, source: &MacAddress, frame: &[u8]) -> bool {
        let events = critical_section::with(|cs| self.state.borrow_ref(cs).events);
        match events {
            Some(events) => {
                events.on_receive(source, frame);
                true
            }
            None => false,
        }
    }

    /// Frames submitted so far (oldest first)
    pub fn sent_frames(&self) -> Vec<SentFrame, OUTBOX_CAPACITY> {
        critical_section::with(|cs| self.state.borrow_ref(cs).outbox.clone())
    }

    /// Number of frames currently held in the outbox
    pub fn sent_count(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).outbox.len())
    }

    /// Forget recorded frames
    pub fn clear_sent(&self) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).outbox.clear());
    }

    /// `true` if `address` is in the peer table
    pub fn is_peer(&self, address: &MacAddress) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).peers.contains(address))
    }
}

impl RadioInterface for MockRadio {
    fn own_address(&self) -> MacAddress {
        self.address
    }

    fn register_events(&self, events: &'static dyn RadioEvents) -> Result<(), RadioError> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if let Some(error) = state.register_error.take() {
                return Err(error);
            }
            state.events = Some(events);
            Ok(())
        })
    }

    fn add_peer(&self, address: &MacAddress) -> Result<(), RadioError> {
        if address.is_group() || address.is_unspecified() {
            return Err(RadioError::InvalidArgument);
        }
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.peers.contains(address) {
                return Err(RadioError::PeerExists);
            }
            if state.peers.len() >= state.peer_limit {
                return Err(RadioError::PeerTableFull);
            }
            state
                .peers
                .push(*address)
                .map_err(|_| RadioError::PeerTableFull)
        })
    }

    fn send_async(&self, destination: &MacAddress, frame: &[u8]) -> Result<(), RadioError> {
        let bytes = Vec::from_slice(frame).map_err(|_| RadioError::FrameTooLong)?;

        let completion = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if let Some(error) = state.submit_error.take() {
                return Err(error);
            }
            if !destination.is_broadcast() && !state.peers.contains(destination) {
                return Err(RadioError::PeerNotFound);
            }
            if state.outbox.is_full() {
                state.outbox.remove(0);
            }
            let _ = state.outbox.push(SentFrame {
                destination: *destination,
                bytes,
            });
            state.last_destination = Some(*destination);
            Ok(state.events.zip(state.auto_complete))
        })?;

        // Callback runs outside the critical section, like a driver task would
        if let Some((events, status)) = completion {
            events.on_send_complete(destination, status);
        }
        Ok(())
    }
}
