//! Link Manager
//!
//! Owns the node's link-level state: the discovered peer, the last score and
//! the manager counters. Everything sits behind one async mutex, which is also
//! held while route handlers run.
//!
//! # Discovery
//!
//! ```text
//!        ┌─────────┐   RDSC (ONLY_FOR_ME)   ┌──────────────┐
//!  boot ─► Unknown ├───────────────────────►│ Known(peer)  │
//!        └──┬───▲──┘                        └──────────────┘
//!   CDSC    │   │  receive(discovery_interval)
//!  broadcast└───┘
//! ```
//!
//! While no peer is known every [`LinkManager::step`] broadcasts a discovery
//! request and then waits on the inbound queue for up to the discovery
//! interval, which therefore doubles as the retry period. The first discovery
//! reply addressed to this node fixes the peer for the rest of the process.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

use super::codec::Package;
use super::commands;
use super::router::{CommandRoute, CommandRouter, DispatchOutcome, MatchFlags};
use super::transport::{LinkTransport, TransportStats};
use super::LinkError;
use crate::core::config::NodeConfig;
use crate::core::node_name;
use crate::core::sync::Timeout;
use crate::platform::traits::{MacAddress, RadioInterface};
use crate::{log_debug, log_error, log_info, log_warn};

/// Discovery state derived from the peer address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoveryState {
    /// No peer yet; discovery requests are broadcast
    Unknown,
    /// Peer learned from a discovery reply
    Known(MacAddress),
}

/// Manager counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManagerStats {
    /// Discovery requests handed to the radio
    pub discovery_broadcasts: u32,
    /// Button reports handed to the radio
    pub reports_sent: u32,
    /// Button reports refused because no peer is known
    pub reports_rejected: u32,
    /// Button reports the transport failed to deliver
    pub report_failures: u32,
    /// Inbound packages with an identifier no route answers
    pub unknown_commands: u32,
}

/// Value published for the display collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayUpdate {
    /// Node name shown as the title line
    pub title: &'static str,
    /// Value shown under the title
    pub value: i32,
}

/// Node identity reported by [`LinkManager::init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeIdentity {
    pub name: &'static str,
    pub address: MacAddress,
}

/// State guarded by the manager lock and mutated by route handlers
#[derive(Debug)]
pub struct LinkState {
    /// Learned peer; all-zero while unknown
    peer: MacAddress,
    /// Peer has been added to the radio's peer table
    peer_registered: bool,
    last_score: Option<i32>,
    /// Score waiting to be published once the lock is released
    pending_display: Option<i32>,
    stats: ManagerStats,
}

impl LinkState {
    pub const fn new() -> Self {
        Self {
            peer: MacAddress::UNSPECIFIED,
            peer_registered: false,
            last_score: None,
            pending_display: None,
            stats: ManagerStats {
                discovery_broadcasts: 0,
                reports_sent: 0,
                reports_rejected: 0,
                report_failures: 0,
                unknown_commands: 0,
            },
        }
    }

    pub fn discovery(&self) -> DiscoveryState {
        if self.peer.is_unspecified() {
            DiscoveryState::Unknown
        } else {
            DiscoveryState::Known(self.peer)
        }
    }

    pub fn is_known(&self) -> bool {
        !self.peer.is_unspecified()
    }

    pub fn last_score(&self) -> Option<i32> {
        self.last_score
    }

    pub fn stats(&self) -> ManagerStats {
        self.stats
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

/// `RDSC`: adopt the replying node as peer, once
fn handle_discovery_reply(state: &mut LinkState, package: &Package) {
    if let DiscoveryState::Known(peer) = state.discovery() {
        log_debug!(
            "Discovery reply from {} ignored, peer is {}",
            package.source,
            peer
        );
        return;
    }
    if !package.source.is_unicast() {
        return;
    }
    state.peer = package.source;
    log_info!("Discovered peer {}", package.source);
}

/// `CSCR`: store the score and queue it for the display
fn handle_score_update(state: &mut LinkState, package: &Package) {
    match package.value::<i32>() {
        Some(score) => {
            state.last_score = Some(score);
            state.pending_display = Some(score);
        }
        None => log_warn!(
            "Score update from {} with {} byte payload ignored",
            package.source,
            package.data_len()
        ),
    }
}

/// Inbound command table
pub static ROUTES: [CommandRoute<LinkState>; 2] = [
    CommandRoute::new(
        commands::DISCOVERY_REPLY,
        MatchFlags::ONLY_FOR_ME,
        handle_discovery_reply,
    ),
    CommandRoute::new(
        commands::SCORE_UPDATE,
        MatchFlags::BROADCAST.union(MatchFlags::FOR_ME),
        handle_score_update,
    ),
];

/// Discovery, inbound dispatch and outbound reporting for one node
pub struct LinkManager<R: 'static> {
    transport: &'static LinkTransport<R>,
    state: Mutex<CriticalSectionRawMutex, LinkState>,
    router: CommandRouter<LinkState>,
    display: Signal<CriticalSectionRawMutex, DisplayUpdate>,
    config: NodeConfig,
    name: &'static str,
}

impl<R: RadioInterface + Sync + 'static> LinkManager<R> {
    /// Create a manager over `transport`
    ///
    /// The node name is the configured override, or a pick from the built-in
    /// list by `seed`.
    pub fn new(transport: &'static LinkTransport<R>, config: NodeConfig, seed: u32) -> Self {
        Self {
            transport,
            state: Mutex::new(LinkState::new()),
            router: CommandRouter::new(&ROUTES),
            display: Signal::new(),
            config,
            name: node_name::resolve(config.name, seed),
        }
    }

    /// Bring up the transport, log the node identity and publish the boot
    /// display (node name, value 0)
    ///
    /// # Errors
    ///
    /// Returns the transport's setup error; the node cannot operate without it.
    pub fn init(&self) -> Result<NodeIdentity, LinkError> {
        let address = self.transport.init()?;
        log_info!("Node {} up at {}", self.name, address);

        // Name on screen from boot; the value line shows zero until a score arrives
        self.display.signal(DisplayUpdate {
            title: self.name,
            value: 0,
        });
        Ok(NodeIdentity {
            name: self.name,
            address,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn transport(&self) -> &'static LinkTransport<R> {
        self.transport
    }

    /// Display updates for the renderer task
    pub fn display_updates(&self) -> &Signal<CriticalSectionRawMutex, DisplayUpdate> {
        &self.display
    }

    pub async fn discovery_state(&self) -> DiscoveryState {
        self.state.lock().await.discovery()
    }

    /// Learned peer, `None` while discovery is pending
    pub async fn peer(&self) -> Option<MacAddress> {
        match self.discovery_state().await {
            DiscoveryState::Known(peer) => Some(peer),
            DiscoveryState::Unknown => None,
        }
    }

    pub async fn last_score(&self) -> Option<i32> {
        self.state.lock().await.last_score()
    }

    pub async fn stats(&self) -> ManagerStats {
        self.state.lock().await.stats()
    }

    pub fn transport_stats(&self) -> TransportStats {
        self.transport.stats()
    }

    /// Broadcast a discovery request unless a peer is already known
    ///
    /// Returns `Ok(true)` if a request went out.
    pub async fn send_discovery_if_unknown(&self) -> Result<bool, LinkError> {
        if self.state.lock().await.is_known() {
            return Ok(false);
        }

        let request = Package::new(MacAddress::BROADCAST, commands::DISCOVERY_REQUEST);
        self.transport.send(&request, self.config.send_timeout).await?;

        self.state.lock().await.stats.discovery_broadcasts += 1;
        log_debug!("Discovery request broadcast");
        Ok(true)
    }

    /// Dispatch one inbound package
    ///
    /// A peer learned by this package is registered with the radio before the
    /// lock is released; a score update is published afterwards.
    pub async fn process_package(&self, package: &Package) -> DispatchOutcome {
        let (outcome, display) = {
            let mut state = self.state.lock().await;
            let was_known = state.is_known();

            let outcome = self.router.dispatch(&mut state, package);
            if outcome == DispatchOutcome::Unknown {
                state.stats.unknown_commands += 1;
            }

            if !was_known && state.is_known() {
                let peer = state.peer;
                match self.transport.register_peer(&peer) {
                    Ok(()) => state.peer_registered = true,
                    Err(e) => log_error!("Peer {} registration failed: {}", peer, e),
                }
            }

            (outcome, state.pending_display.take())
        };

        if let Some(value) = display {
            self.display.signal(DisplayUpdate {
                title: self.name,
                value,
            });
        }
        outcome
    }

    /// Send the button press count to the peer
    ///
    /// # Errors
    ///
    /// - [`LinkError::PeerUnknown`] while discovery is pending; the report is
    ///   dropped, not queued
    /// - any transport error from registration or sending
    pub async fn report_button_presses(&self, count: i32) -> Result<(), LinkError> {
        let peer = {
            let mut state = self.state.lock().await;
            let DiscoveryState::Known(peer) = state.discovery() else {
                state.stats.reports_rejected += 1;
                log_warn!("Button count {} not sent: no peer discovered", count);
                return Err(LinkError::PeerUnknown);
            };
            if !state.peer_registered {
                if let Err(e) = self.transport.register_peer(&peer) {
                    state.stats.report_failures += 1;
                    log_warn!("Button count {} to {} failed: {}", count, peer, e);
                    return Err(e);
                }
                state.peer_registered = true;
            }
            peer
        };

        let report = Package::with_value(peer, commands::BUTTON_COUNT, &count);
        let result = self.transport.send(&report, self.config.send_timeout).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(()) => {
                state.stats.reports_sent += 1;
                log_info!("Button count {} sent to {}", count, peer);
            }
            Err(e) => {
                state.stats.report_failures += 1;
                log_warn!("Button count {} to {} failed: {}", count, peer, e);
            }
        }
        result
    }

    /// One discovery/receive iteration
    ///
    /// Returns the dispatch outcome, or `None` if nothing arrived within the
    /// discovery interval.
    pub async fn step(&self) -> Option<DispatchOutcome> {
        if let Err(e) = self.send_discovery_if_unknown().await {
            log_warn!("Discovery broadcast failed: {}", e);
        }

        let package = self
            .transport
            .receive(Timeout::After(self.config.discovery_interval))
            .await?;
        Some(self.process_package(&package).await)
    }

    /// Discovery/receive loop
    pub async fn run(&self) -> ! {
        loop {
            self.step().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::link::codec::{self, CommandId};
    use crate::platform::mock::MockRadio;
    use crate::platform::traits::SendStatus;
    use embassy_time::Duration;

    const OWN: MacAddress = MacAddress::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x01]);
    const NODE_A: MacAddress = MacAddress::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x0A]);
    const NODE_B: MacAddress = MacAddress::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x0B]);

    fn test_config() -> NodeConfig {
        NodeConfig {
            discovery_interval: Duration::from_millis(30),
            ..NodeConfig::DEFAULT
        }
    }

    fn manager_with(config: NodeConfig) -> LinkManager<MockRadio> {
        let transport: &'static LinkTransport<MockRadio> =
            Box::leak(Box::new(LinkTransport::new(MockRadio::new(OWN), &config)));
        transport.radio().set_auto_complete(Some(SendStatus::Success));
        let manager = LinkManager::new(transport, config, 3);
        manager.init().unwrap();
        manager
    }

    fn manager() -> LinkManager<MockRadio> {
        manager_with(test_config())
    }

    fn deliver(manager: &LinkManager<MockRadio>, source: MacAddress, package: &Package) {
        let frame = codec::encode(package);
        assert!(manager.transport().radio().deliver(&source, frame.as_bytes()));
    }

    fn count_sent(manager: &LinkManager<MockRadio>, command: CommandId) -> usize {
        manager
            .transport()
            .radio()
            .sent_frames()
            .iter()
            .filter(|f| &f.bytes[6..10] == command.as_bytes())
            .count()
    }

    async fn discover(manager: &LinkManager<MockRadio>, peer: MacAddress) {
        deliver(manager, peer, &Package::new(OWN, commands::DISCOVERY_REPLY));
        assert_eq!(manager.step().await, Some(DispatchOutcome::Handled));
        assert_eq!(manager.peer().await, Some(peer));
    }

    #[test]
    fn test_init_reports_identity() {
        let manager = manager();
        assert_eq!(manager.name(), "Fossy");

        let named = manager_with(NodeConfig {
            name: Some("Rexy"),
            ..test_config()
        });
        let identity = named.init().unwrap();
        assert_eq!(identity.name, "Rexy");
        assert_eq!(identity.address, OWN);
    }

    #[tokio::test]
    async fn test_discovery_learns_first_reply_only() {
        let manager = manager();

        // Broadcast reply does not qualify
        deliver(
            &manager,
            NODE_B,
            &Package::new(MacAddress::BROADCAST, commands::DISCOVERY_REPLY),
        );
        assert_eq!(manager.step().await, Some(DispatchOutcome::Ignored));
        assert_eq!(manager.discovery_state().await, DiscoveryState::Unknown);

        discover(&manager, NODE_A).await;
        assert!(manager.transport().radio().is_peer(&NODE_A));

        // Later replies do not move the peer
        deliver(&manager, NODE_B, &Package::new(OWN, commands::DISCOVERY_REPLY));
        manager.step().await;
        deliver(
            &manager,
            NODE_B,
            &Package::new(MacAddress::BROADCAST, commands::DISCOVERY_REPLY),
        );
        manager.step().await;
        assert_eq!(manager.discovery_state().await, DiscoveryState::Known(NODE_A));
    }

    #[tokio::test]
    async fn test_discovery_broadcasts_stop_once_known() {
        let manager = manager();

        assert_eq!(manager.step().await, None);
        assert_eq!(manager.step().await, None);
        assert_eq!(count_sent(&manager, commands::DISCOVERY_REQUEST), 2);

        discover(&manager, NODE_A).await;
        assert_eq!(count_sent(&manager, commands::DISCOVERY_REQUEST), 3);

        assert_eq!(manager.send_discovery_if_unknown().await, Ok(false));
        assert_eq!(manager.step().await, None);
        assert_eq!(count_sent(&manager, commands::DISCOVERY_REQUEST), 3);
        assert_eq!(manager.stats().await.discovery_broadcasts, 3);

        let broadcast = &manager.transport().radio().sent_frames()[0];
        assert_eq!(broadcast.destination, MacAddress::BROADCAST);
        assert_eq!(broadcast.bytes.len(), codec::HEADER_LEN);
    }

    #[tokio::test]
    async fn test_report_rejected_while_unknown() {
        let manager = manager();

        assert_eq!(
            manager.report_button_presses(1).await,
            Err(LinkError::PeerUnknown)
        );
        assert_eq!(manager.transport().radio().sent_count(), 0);
        assert_eq!(manager.stats().await.reports_rejected, 1);
    }

    #[tokio::test]
    async fn test_report_unicasts_count_to_peer() {
        let manager = manager();
        discover(&manager, NODE_A).await;
        manager.transport().radio().clear_sent();

        manager.report_button_presses(7).await.unwrap();

        let sent = manager.transport().radio().sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination, NODE_A);
        assert_eq!(&sent[0].bytes[..6], NODE_A.as_bytes());
        assert_eq!(&sent[0].bytes[6..10], b"CBUT");
        assert_eq!(&sent[0].bytes[10..], &7i32.to_ne_bytes());
        assert_eq!(manager.stats().await.reports_sent, 1);
    }

    #[tokio::test]
    async fn test_score_update_publishes_display() {
        let manager = manager();

        deliver(
            &manager,
            NODE_B,
            &Package::with_value(MacAddress::BROADCAST, commands::SCORE_UPDATE, &42i32),
        );
        assert_eq!(manager.step().await, Some(DispatchOutcome::Handled));

        assert_eq!(manager.last_score().await, Some(42));
        assert_eq!(
            manager.display_updates().try_take(),
            Some(DisplayUpdate {
                title: "Fossy",
                value: 42
            })
        );
    }

    #[test]
    fn test_init_publishes_boot_display() {
        let manager = manager();
        assert_eq!(
            manager.display_updates().try_take(),
            Some(DisplayUpdate {
                title: "Fossy",
                value: 0
            })
        );
    }

    #[tokio::test]
    async fn test_report_counts_registration_failure() {
        let manager = manager();
        manager.transport().radio().set_peer_limit(0);
        discover(&manager, NODE_A).await;
        manager.transport().radio().clear_sent();

        assert_eq!(
            manager.report_button_presses(1).await,
            Err(LinkError::PeerTableFull)
        );
        assert_eq!(manager.transport().radio().sent_count(), 0);

        let stats = manager.stats().await;
        assert_eq!(stats.report_failures, 1);
        assert_eq!(stats.reports_sent, 0);
    }

    #[tokio::test]
    async fn test_malformed_score_update_is_ignored() {
        let manager = manager();
        manager.display_updates().reset();

        deliver(
            &manager,
            NODE_B,
            &Package::with_payload(OWN, commands::SCORE_UPDATE, &[1, 2]),
        );
        assert_eq!(manager.step().await, Some(DispatchOutcome::Handled));

        assert_eq!(manager.last_score().await, None);
        assert_eq!(manager.display_updates().try_take(), None);
    }

    #[tokio::test]
    async fn test_unknown_command_is_counted() {
        let manager = manager();

        let package = Package::new(OWN, CommandId::new(*b"ZZZZ"));
        assert_eq!(
            manager.process_package(&package).await,
            DispatchOutcome::Unknown
        );
        assert_eq!(manager.stats().await.unknown_commands, 1);
    }
}
