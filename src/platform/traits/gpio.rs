//! GPIO edge-interrupt interface trait
//!
//! This module defines the part of GPIO the node needs: configuring an input
//! pin's pull resistor and edge trigger, and attaching a handler that the
//! platform calls from interrupt context on each matching edge.

use crate::platform::Result;

/// Input pull resistor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// Floating input
    None,
    /// Pull-up resistor enabled
    Up,
    /// Pull-down resistor enabled
    Down,
}

/// Interrupt trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeTrigger {
    /// Interrupts disabled
    Disabled,
    /// High-to-low transition (button press on a pull-up input)
    Falling,
    /// Low-to-high transition
    Rising,
    /// Both transitions
    AnyEdge,
}

impl EdgeTrigger {
    /// `true` if a transition to `level_high` fires this trigger
    pub fn fires_on(&self, level_high: bool) -> bool {
        match self {
            EdgeTrigger::Disabled => false,
            EdgeTrigger::Falling => !level_high,
            EdgeTrigger::Rising => level_high,
            EdgeTrigger::AnyEdge => true,
        }
    }
}

/// Handler invoked from interrupt context
///
/// Implementations must not block, allocate or log.
pub trait EdgeHandler: Sync {
    /// Called once per matching edge
    fn on_edge(&self);
}

/// GPIO edge-interrupt trait
///
/// # Safety Invariants
///
/// - One handler per pin
/// - The handler outlives the registration (`'static`)
pub trait EdgeInterrupt {
    /// Configure the pin as an input with the given pull and trigger
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Gpio` if the configuration is rejected.
    fn configure(&mut self, pull: Pull, trigger: EdgeTrigger) -> Result<()>;

    /// Attach the interrupt handler
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Gpio(GpioError::HandlerInUse)` if a handler is
    /// already attached.
    fn attach(&mut self, handler: &'static dyn EdgeHandler) -> Result<()>;

    /// Current input level (`true` = high)
    fn is_high(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falling_trigger_fires_on_low_only() {
        assert!(EdgeTrigger::Falling.fires_on(false));
        assert!(!EdgeTrigger::Falling.fires_on(true));
        assert!(!EdgeTrigger::Disabled.fires_on(false));
        assert!(EdgeTrigger::AnyEdge.fires_on(true));
    }
}
