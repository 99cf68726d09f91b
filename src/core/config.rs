//! Node configuration
//!
//! Runtime tunables of the link layer and the button pipeline. Capacities
//! (inbound queue, edge semaphore, payload size) are compile-time constants in
//! their modules; only timing and naming live here.
//!
//! # Build-time defaults
//!
//! [`NodeConfig::from_build_env`] reads values captured by `build.rs`:
//!
//! - `NODE_DISCOVERY_INTERVAL_MS` - discovery broadcast period (default 10000)
//! - `NODE_SEND_TIMEOUT_MS` - send completion wait, 0 = fire-and-forget (default 0)
//! - `NODE_GATE_TIMEOUT_MS` - send gate wait for fire-and-forget sends (default 100)
//! - `NODE_NAME` - display name override (default empty)
//!
//! Values that fail to parse fall back to [`NodeConfig::DEFAULT`].

use embassy_time::Duration;

use super::sync::Timeout;

/// Default discovery broadcast period
pub const DEFAULT_DISCOVERY_INTERVAL_MS: u64 = 10_000;

/// Default send gate wait for fire-and-forget sends
pub const DEFAULT_GATE_TIMEOUT_MS: u64 = 100;

/// Link and application timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// Receive timeout of the discovery loop, which doubles as the discovery
    /// broadcast period while no peer is known
    pub discovery_interval: Duration,
    /// Completion wait for discovery broadcasts and button reports
    pub send_timeout: Timeout,
    /// Send gate wait used when `send_timeout` is [`Timeout::Immediate`]
    pub gate_timeout: Timeout,
    /// Display name override; `None` picks a name from the built-in list
    pub name: Option<&'static str>,
}

impl NodeConfig {
    /// Reference configuration
    pub const DEFAULT: Self = Self {
        discovery_interval: Duration::from_millis(DEFAULT_DISCOVERY_INTERVAL_MS),
        send_timeout: Timeout::Immediate,
        gate_timeout: Timeout::from_millis(DEFAULT_GATE_TIMEOUT_MS),
        name: None,
    };

    /// Load configuration from build-time environment variables
    pub fn from_build_env() -> Self {
        Self::from_values(
            env!("NODE_DISCOVERY_INTERVAL_MS"),
            env!("NODE_SEND_TIMEOUT_MS"),
            env!("NODE_GATE_TIMEOUT_MS"),
            env!("NODE_NAME"),
        )
    }

    fn from_values(discovery_ms: &str, send_ms: &str, gate_ms: &str, name: &'static str) -> Self {
        let discovery_interval = match discovery_ms.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Duration::from_millis(ms),
            _ => Self::DEFAULT.discovery_interval,
        };

        let send_timeout = send_ms
            .trim()
            .parse::<u64>()
            .map(Timeout::from_millis)
            .unwrap_or(Self::DEFAULT.send_timeout);

        // A zero gate wait would make every back-to-back send fail
        let gate_timeout = match gate_ms.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => Timeout::from_millis(ms),
            _ => Self::DEFAULT.gate_timeout,
        };

        let name = if name.is_empty() { None } else { Some(name) };

        Self {
            discovery_interval,
            send_timeout,
            gate_timeout,
            name,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
