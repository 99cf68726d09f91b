//! Link transport
//!
//! Turns the radio's asynchronous submit/callback API into two awaitable
//! operations:
//!
//! - [`LinkTransport::send`] submits a frame and, unless told not to wait,
//!   suspends until the radio's completion callback reports the outcome.
//! - [`LinkTransport::receive`] suspends on a bounded queue that the radio's
//!   receive callback fills.
//!
//! # Single instance
//!
//! The radio stack has one callback slot. [`LinkTransport::init`] registers the
//! transport as that slot's `&'static` sink for the rest of the process, so a
//! transport normally lives in a `static` (or a `StaticCell`). There is no
//! teardown.
//!
//! # Send gate
//!
//! A one-unit [`CountingSemaphore`] bounds the link to one frame in flight.
//! A sender takes the unit before submitting and it comes back exactly once
//! per accepted submission:
//!
//! - fire-and-forget, or the waiting sender already gave up: the completion
//!   callback releases it
//! - a sender is waiting: the callback hands the status over and the sender
//!   releases it after taking the status, also when the send future is
//!   dropped mid-wait
//!
//! A positive send timeout is one deadline for the gate and the completion
//! together.
//!
//! A rejected submission gives the unit back immediately because no callback
//! will follow.
//!
//! # Inbound overflow
//!
//! The receive callback never blocks: when the queue already holds
//! [`RX_QUEUE_CAPACITY`] packages the new one is dropped and counted.

use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::Instant;

use super::codec::{self, Package};
use super::LinkError;
use crate::core::config::NodeConfig;
use crate::core::sync::{wait_bounded, CountingSemaphore, Timeout};
use crate::platform::error::RadioError;
use crate::platform::traits::{MacAddress, RadioEvents, RadioInterface, SendStatus};
use crate::{log_error, log_info, log_warn};

/// Inbound queue depth
pub const RX_QUEUE_CAPACITY: usize = 10;

/// Transport statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportStats {
    /// Frames accepted by the radio
    pub frames_sent: u32,
    /// Submissions rejected or completions reporting failure
    pub send_failures: u32,
    /// Sends that gave up waiting for the gate or the completion
    pub send_timeouts: u32,
    /// Inbound packages queued
    pub frames_received: u32,
    /// Inbound packages dropped (queue full or not initialized)
    pub rx_dropped: u32,
    /// Inbound frames with an invalid length
    pub decode_errors: u32,
}

impl TransportStats {
    const fn new() -> Self {
        Self {
            frames_sent: 0,
            send_failures: 0,
            send_timeouts: 0,
            frames_received: 0,
            rx_dropped: 0,
            decode_errors: 0,
        }
    }
}

/// Awaitable send/receive over a callback-driven radio
pub struct LinkTransport<R> {
    radio: R,
    own_address: Mutex<CriticalSectionRawMutex, Cell<Option<MacAddress>>>,
    rx_queue: Channel<CriticalSectionRawMutex, Package, RX_QUEUE_CAPACITY>,
    send_gate: CountingSemaphore<1>,
    send_status: Signal<CriticalSectionRawMutex, SendStatus>,
    awaiting_completion: Mutex<CriticalSectionRawMutex, Cell<bool>>,
    gate_timeout: Timeout,
    stats: Mutex<CriticalSectionRawMutex, Cell<TransportStats>>,
}

impl<R: RadioInterface> LinkTransport<R> {
    /// Create an uninitialized transport over `radio`
    pub const fn new(radio: R, config: &NodeConfig) -> Self {
        Self {
            radio,
            own_address: Mutex::new(Cell::new(None)),
            rx_queue: Channel::new(),
            send_gate: CountingSemaphore::new(1),
            send_status: Signal::new(),
            awaiting_completion: Mutex::new(Cell::new(false)),
            gate_timeout: config.gate_timeout,
            stats: Mutex::new(Cell::new(TransportStats::new())),
        }
    }

    /// Underlying radio driver
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Own address captured by `init`, `None` before
    pub fn own_address(&self) -> Option<MacAddress> {
        self.own_address.lock(|cell| cell.get())
    }

    /// Snapshot of the statistics counters
    pub fn stats(&self) -> TransportStats {
        self.stats.lock(|cell| cell.get())
    }

    /// Packages waiting in the inbound queue
    pub fn pending_inbound(&self) -> usize {
        self.rx_queue.len()
    }

    /// Register a unicast destination with the radio
    ///
    /// The broadcast address needs no registration. Registering a peer twice
    /// is not an error.
    ///
    /// # Errors
    ///
    /// - [`LinkError::InvalidAddress`] for the all-zero or a group address
    /// - [`LinkError::PeerTableFull`] if the radio has no free slot
    pub fn register_peer(&self, address: &MacAddress) -> Result<(), LinkError> {
        if address.is_broadcast() {
            return Ok(());
        }
        if !address.is_unicast() {
            return Err(LinkError::InvalidAddress);
        }

        match self.radio.add_peer(address) {
            Ok(()) => {
                log_info!("Registered peer {}", address);
                Ok(())
            }
            Err(RadioError::PeerExists) => Ok(()),
            Err(RadioError::PeerTableFull) => Err(LinkError::PeerTableFull),
            Err(RadioError::InvalidArgument) => Err(LinkError::InvalidAddress),
            Err(e) => Err(LinkError::Radio(e)),
        }
    }

    /// Encode and transmit `package`
    ///
    /// With [`Timeout::Immediate`] the call returns as soon as the radio
    /// accepts the frame (fire-and-forget). Otherwise it waits up to `timeout`
    /// for the completion callback.
    ///
    /// # Errors
    ///
    /// - [`LinkError::NotInitialized`] before `init`
    /// - [`LinkError::Timeout`] if the previous send still holds the gate, or
    ///   the completion did not arrive in time
    /// - [`LinkError::Radio`] if the radio rejected the submission
    /// - [`LinkError::SendFailed`] if the completion reported failure
    pub async fn send(&self, package: &Package, timeout: Timeout) -> Result<(), LinkError> {
        if self.own_address().is_none() {
            return Err(LinkError::NotInitialized);
        }

        let frame = codec::encode(package);

        // One deadline covers both the gate and the completion wait
        let deadline = match timeout {
            Timeout::After(limit) => Some(Instant::now() + limit),
            _ => None,
        };
        let gate_wait = if timeout.is_immediate() {
            self.gate_timeout
        } else {
            timeout
        };
        if !self.send_gate.acquire_within(gate_wait).await {
            self.bump(|s| s.send_timeouts += 1);
            log_warn!(
                "Send {} to {} timed out waiting for previous send",
                package.command,
                package.destination
            );
            return Err(LinkError::Timeout);
        }

        let completion_wait = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(left) if left.as_ticks() > 0 => Timeout::After(left),
                _ => {
                    self.send_gate.release();
                    self.bump(|s| s.send_timeouts += 1);
                    return Err(LinkError::Timeout);
                }
            },
            None => timeout,
        };

        let wait = !timeout.is_immediate();
        self.send_status.reset();
        self.awaiting_completion.lock(|cell| cell.set(wait));

        if let Err(error) = self.radio.send_async(&package.destination, frame.as_bytes()) {
            // No completion callback follows a rejected submission
            self.awaiting_completion.lock(|cell| cell.set(false));
            self.send_gate.release();
            self.bump(|s| s.send_failures += 1);
            log_error!(
                "Send {} to {} rejected: {}",
                package.command,
                package.destination,
                error
            );
            return Err(LinkError::Radio(error));
        }
        self.bump(|s| s.frames_sent += 1);

        if !wait {
            return Ok(());
        }

        // Hands the gate back if this future is dropped mid-wait
        let pending = PendingCompletion { transport: self };
        let waited = wait_bounded(completion_wait, self.send_status.wait()).await;
        // A completion racing the timeout still counts
        let late = pending.finish();

        match waited.or(late) {
            Some(status) => {
                self.send_gate.release();
                match status {
                    SendStatus::Success => Ok(()),
                    SendStatus::Failure => Err(LinkError::SendFailed),
                }
            }
            None => {
                // Gate stays held until the late completion arrives
                self.bump(|s| s.send_timeouts += 1);
                Err(LinkError::Timeout)
            }
        }
    }

    /// Wait up to `timeout` for the next inbound package
    ///
    /// Returns `None` on timeout. Packages come out in arrival order.
    pub async fn receive(&self, timeout: Timeout) -> Option<Package> {
        match timeout {
            Timeout::Immediate => self.rx_queue.try_receive().ok(),
            _ => wait_bounded(timeout, self.rx_queue.receive()).await,
        }
    }

    fn bump(&self, update: impl FnOnce(&mut TransportStats)) {
        self.stats.lock(|cell| {
            let mut stats = cell.get();
            update(&mut stats);
            cell.set(stats);
        });
    }
}

impl<R> LinkTransport<R> {
    /// Stop waiting for the completion callback
    ///
    /// Returns a status the callback already handed over; the caller then
    /// owns the gate unit. Otherwise the late callback releases it.
    fn stop_awaiting(&self) -> Option<SendStatus> {
        self.awaiting_completion.lock(|cell| {
            cell.set(false);
            self.send_status.try_take()
        })
    }
}

/// A submitted send whose sender is still waiting for the completion
struct PendingCompletion<'a, R> {
    transport: &'a LinkTransport<R>,
}

impl<R> PendingCompletion<'_, R> {
    fn finish(self) -> Option<SendStatus> {
        let status = self.transport.stop_awaiting();
        core::mem::forget(self);
        status
    }
}

impl<R> Drop for PendingCompletion<'_, R> {
    fn drop(&mut self) {
        if self.transport.stop_awaiting().is_some() {
            self.transport.send_gate.release();
        }
    }
}

impl<R: RadioInterface + Sync + 'static> LinkTransport<R> {
    /// Bind the transport to the radio
    ///
    /// The first call captures the own address and registers this transport as
    /// the radio's callback sink; later calls return the captured address
    /// without touching the radio. The first call must not race with itself.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Radio`] if the radio refuses the registration. The
    /// transport stays uninitialized and the call may be repeated.
    pub fn init(&'static self) -> Result<MacAddress, LinkError> {
        if let Some(address) = self.own_address() {
            return Ok(address);
        }

        // Publish the address first: callbacks may fire as soon as we register
        let address = self.radio.own_address();
        self.own_address.lock(|cell| cell.set(Some(address)));

        if let Err(error) = self.radio.register_events(self) {
            self.own_address.lock(|cell| cell.set(None));
            log_error!("Radio callback registration failed: {}", error);
            return Err(LinkError::Radio(error));
        }

        log_info!("Link transport ready, own address {}", address);
        Ok(address)
    }
}

impl<R: RadioInterface + Sync> RadioEvents for LinkTransport<R> {
    fn on_send_complete(&self, _destination: &MacAddress, status: SendStatus) {
        if status == SendStatus::Failure {
            self.bump(|s| s.send_failures += 1);
        }
        self.awaiting_completion.lock(|cell| {
            if cell.get() {
                self.send_status.signal(status);
            } else {
                self.send_gate.release();
            }
        });
    }

    fn on_receive(&self, source: &MacAddress, frame: &[u8]) {
        let Some(own) = self.own_address() else {
            self.bump(|s| s.rx_dropped += 1);
            return;
        };

        match codec::decode(frame, frame.len(), *source) {
            Ok(mut package) => {
                package.is_broadcast = package.destination.is_broadcast();
                package.is_for_me = package.destination == own;
                if self.rx_queue.try_send(package).is_ok() {
                    self.bump(|s| s.frames_received += 1);
                } else {
                    self.bump(|s| s.rx_dropped += 1);
                }
            }
            Err(_) => self.bump(|s| s.decode_errors += 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::link::codec::{CommandId, Frame};
    use crate::platform::mock::MockRadio;
    use embassy_time::Duration;
    use std::time::Duration as StdDuration;

    const OWN: MacAddress = MacAddress::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x01]);
    const PEER: MacAddress = MacAddress::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x02]);
    const OTHER: MacAddress = MacAddress::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x03]);
    const PING: CommandId = CommandId::new(*b"PING");

    fn transport() -> &'static LinkTransport<MockRadio> {
        Box::leak(Box::new(LinkTransport::new(
            MockRadio::new(OWN),
            &NodeConfig::DEFAULT,
        )))
    }

    fn ready_transport() -> &'static LinkTransport<MockRadio> {
        let transport = transport();
        transport.init().unwrap();
        transport
    }

    fn frame_to(destination: MacAddress, payload: &[u8]) -> Frame {
        codec::encode(&Package::with_payload(destination, PING, payload))
    }

    #[test]
    fn test_init_is_idempotent() {
        let transport = transport();
        assert_eq!(transport.own_address(), None);
        assert_eq!(transport.init(), Ok(OWN));
        assert_eq!(transport.init(), Ok(OWN));
        assert!(transport.radio().has_events());
    }

    #[test]
    fn test_init_failure_is_reported_and_retryable() {
        let transport = transport();
        transport
            .radio()
            .fail_registration(RadioError::CallbackRegistration);

        assert_eq!(
            transport.init(),
            Err(LinkError::Radio(RadioError::CallbackRegistration))
        );
        assert_eq!(transport.own_address(), None);
        assert_eq!(transport.init(), Ok(OWN));
    }

    #[tokio::test]
    async fn test_send_before_init_fails() {
        let transport = transport();
        let package = Package::new(MacAddress::BROADCAST, PING);
        assert_eq!(
            transport.send(&package, Timeout::Immediate).await,
            Err(LinkError::NotInitialized)
        );
        assert_eq!(transport.radio().sent_count(), 0);
    }

    #[tokio::test]
    async fn test_fire_and_forget_submits_encoded_frame() {
        let transport = ready_transport();
        let package = Package::with_payload(MacAddress::BROADCAST, PING, &[9, 8]);

        transport.send(&package, Timeout::Immediate).await.unwrap();

        let sent = transport.radio().sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination, MacAddress::BROADCAST);
        assert_eq!(&sent[0].bytes[..], codec::encode(&package).as_bytes());
        assert_eq!(transport.stats().frames_sent, 1);
    }

    #[tokio::test]
    async fn test_send_waits_for_completion() {
        let transport = ready_transport();
        let timeout = Timeout::After(Duration::from_millis(200));
        let package = Package::new(MacAddress::BROADCAST, PING);

        transport.radio().set_auto_complete(Some(SendStatus::Success));
        assert_eq!(transport.send(&package, timeout).await, Ok(()));

        transport.radio().set_auto_complete(Some(SendStatus::Failure));
        assert_eq!(
            transport.send(&package, timeout).await,
            Err(LinkError::SendFailed)
        );
        assert_eq!(transport.stats().send_failures, 1);
    }

    #[tokio::test]
    async fn test_missing_completion_times_out_and_holds_gate() {
        let transport = ready_transport();
        let package = Package::new(MacAddress::BROADCAST, PING);

        let result = transport
            .send(&package, Timeout::After(Duration::from_millis(20)))
            .await;
        assert_eq!(result, Err(LinkError::Timeout));

        // Gate stays closed until the radio reports the first frame
        assert_eq!(
            transport.send(&package, Timeout::Immediate).await,
            Err(LinkError::Timeout)
        );
        assert_eq!(transport.radio().sent_count(), 1);

        assert!(transport.radio().complete_send(SendStatus::Success));
        assert_eq!(transport.send(&package, Timeout::Immediate).await, Ok(()));
        assert_eq!(transport.radio().sent_count(), 2);
    }

    #[tokio::test]
    async fn test_timeout_covers_gate_and_completion() {
        let transport = ready_transport();
        let package = Package::new(MacAddress::BROADCAST, PING);

        // Fire-and-forget frame holds the gate until the radio reports it
        transport.send(&package, Timeout::Immediate).await.unwrap();
        let radio_side = tokio::spawn(async move {
            tokio::time::sleep(StdDuration::from_millis(90)).await;
            transport.radio().complete_send(SendStatus::Success);
        });

        let started = std::time::Instant::now();
        let result = transport
            .send(&package, Timeout::After(Duration::from_millis(100)))
            .await;

        assert_eq!(result, Err(LinkError::Timeout));
        assert!(started.elapsed() < StdDuration::from_millis(160));
        radio_side.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_wait_returns_gate_on_late_completion() {
        let transport = ready_transport();
        let package = Package::new(MacAddress::BROADCAST, PING);

        let cancelled = embassy_time::with_timeout(
            Duration::from_millis(10),
            transport.send(&package, Timeout::After(Duration::from_secs(5))),
        )
        .await;
        assert!(cancelled.is_err());

        assert!(transport.radio().complete_send(SendStatus::Success));
        assert_eq!(transport.send(&package, Timeout::Immediate).await, Ok(()));
    }

    #[tokio::test]
    async fn test_cancelled_wait_returns_gate_after_completion() {
        let transport = ready_transport();
        let package = Package::new(MacAddress::BROADCAST, PING);

        let mut send = Box::pin(transport.send(&package, Timeout::After(Duration::from_secs(5))));
        assert!(wait_bounded(Timeout::Immediate, send.as_mut()).await.is_none());

        // Completion lands while the sender still waits, then the sender goes away
        assert!(transport.radio().complete_send(SendStatus::Success));
        drop(send);

        assert_eq!(transport.send(&package, Timeout::Immediate).await, Ok(()));
    }

    #[tokio::test]
    async fn test_concurrent_sends_are_serialized() {
        let transport = ready_transport();

        let first = tokio::spawn(async move {
            let package = Package::new(MacAddress::BROADCAST, PING);
            transport
                .send(&package, Timeout::After(Duration::from_secs(1)))
                .await
        });
        tokio::time::sleep(StdDuration::from_millis(20)).await;

        let second = tokio::spawn(async move {
            let package = Package::new(MacAddress::BROADCAST, CommandId::new(*b"PONG"));
            transport
                .send(&package, Timeout::After(Duration::from_secs(1)))
                .await
        });
        tokio::time::sleep(StdDuration::from_millis(20)).await;

        // Second sender is parked on the gate
        assert_eq!(transport.radio().sent_count(), 1);

        transport.radio().complete_send(SendStatus::Success);
        assert_eq!(first.await.unwrap(), Ok(()));

        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert_eq!(transport.radio().sent_count(), 2);
        transport.radio().complete_send(SendStatus::Success);
        assert_eq!(second.await.unwrap(), Ok(()));

        let sent = transport.radio().sent_frames();
        assert_eq!(&sent[1].bytes[6..10], b"PONG");
    }

    #[tokio::test]
    async fn test_rejected_submission_releases_gate() {
        let transport = ready_transport();
        let package = Package::new(MacAddress::BROADCAST, PING);

        transport.radio().fail_next_submit(RadioError::SendRejected);
        assert_eq!(
            transport.send(&package, Timeout::Immediate).await,
            Err(LinkError::Radio(RadioError::SendRejected))
        );
        assert_eq!(transport.send(&package, Timeout::Immediate).await, Ok(()));
    }

    #[tokio::test]
    async fn test_unicast_to_unregistered_peer_is_rejected() {
        let transport = ready_transport();
        let package = Package::new(PEER, PING);

        assert_eq!(
            transport.send(&package, Timeout::Immediate).await,
            Err(LinkError::Radio(RadioError::PeerNotFound))
        );
        transport.register_peer(&PEER).unwrap();
        assert_eq!(transport.send(&package, Timeout::Immediate).await, Ok(()));
    }

    #[tokio::test]
    async fn test_inbound_queue_drops_newest_when_full() {
        let transport = ready_transport();

        for i in 0..=RX_QUEUE_CAPACITY as u8 {
            let frame = frame_to(OWN, &[i]);
            assert!(transport.radio().deliver(&PEER, frame.as_bytes()));
        }

        assert_eq!(transport.pending_inbound(), RX_QUEUE_CAPACITY);
        assert_eq!(transport.stats().rx_dropped, 1);

        for i in 0..RX_QUEUE_CAPACITY as u8 {
            let package = transport.receive(Timeout::Immediate).await.unwrap();
            assert_eq!(package.payload(), &[i]);
        }
        assert!(transport.receive(Timeout::Immediate).await.is_none());
    }

    #[tokio::test]
    async fn test_receive_sets_addressing_flags() {
        let transport = ready_transport();

        transport
            .radio()
            .deliver(&PEER, frame_to(MacAddress::BROADCAST, &[]).as_bytes());
        transport.radio().deliver(&PEER, frame_to(OWN, &[]).as_bytes());
        transport.radio().deliver(&PEER, frame_to(OTHER, &[]).as_bytes());

        let broadcast = transport.receive(Timeout::Immediate).await.unwrap();
        assert!(broadcast.is_broadcast);
        assert!(!broadcast.is_for_me);
        assert!(!broadcast.is_only_for_me());
        assert_eq!(broadcast.source, PEER);

        let unicast = transport.receive(Timeout::Immediate).await.unwrap();
        assert!(unicast.is_for_me);
        assert!(unicast.is_only_for_me());

        let elsewhere = transport.receive(Timeout::Immediate).await.unwrap();
        assert!(!elsewhere.is_for_me);
        assert!(!elsewhere.is_broadcast);
    }

    #[tokio::test]
    async fn test_receive_times_out_on_empty_queue() {
        let transport = ready_transport();
        let received = transport
            .receive(Timeout::After(Duration::from_millis(20)))
            .await;
        assert!(received.is_none());
    }

    #[tokio::test]
    async fn test_receive_wakes_on_delivery() {
        let transport = ready_transport();

        let waiter = tokio::spawn(async move { transport.receive(Timeout::Forever).await });
        tokio::time::sleep(StdDuration::from_millis(10)).await;
        transport.radio().deliver(&PEER, frame_to(OWN, &[42]).as_bytes());

        let package = waiter.await.unwrap().unwrap();
        assert_eq!(package.payload(), &[42]);
    }

    #[test]
    fn test_malformed_frames_are_counted_not_queued() {
        let transport = ready_transport();
        transport.radio().deliver(&PEER, &[0u8; 5]);
        transport.radio().deliver(&PEER, &[0u8; 40]);

        assert_eq!(transport.pending_inbound(), 0);
        assert_eq!(transport.stats().decode_errors, 2);
    }

    #[test]
    fn test_frames_before_init_are_dropped() {
        let transport = transport();
        transport.on_receive(&PEER, frame_to(OWN, &[]).as_bytes());
        assert_eq!(transport.pending_inbound(), 0);
        assert_eq!(transport.stats().rx_dropped, 1);
    }

    #[test]
    fn test_register_peer_validation() {
        let transport = transport();
        transport.radio().set_peer_limit(1);

        assert_eq!(transport.register_peer(&MacAddress::BROADCAST), Ok(()));
        assert_eq!(
            transport.register_peer(&MacAddress::UNSPECIFIED),
            Err(LinkError::InvalidAddress)
        );
        assert_eq!(
            transport.register_peer(&MacAddress::new([0x01, 0, 0x5E, 0, 0, 1])),
            Err(LinkError::InvalidAddress)
        );
        assert_eq!(transport.register_peer(&PEER), Ok(()));
        assert_eq!(transport.register_peer(&PEER), Ok(()));
        assert_eq!(
            transport.register_peer(&OTHER),
            Err(LinkError::PeerTableFull)
        );
        assert!(transport.radio().is_peer(&PEER));
    }
}
