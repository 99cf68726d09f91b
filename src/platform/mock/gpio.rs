//! Mock button pin for testing

use crate::platform::{
    error::{GpioError, PlatformError},
    traits::{EdgeHandler, EdgeInterrupt, EdgeTrigger, Pull},
    Result,
};

/// Mock edge-interrupt pin
///
/// Tracks pull, trigger and level; `press`/`release` simulate the physical
/// transitions and call the attached handler the way the interrupt
/// controller would.
pub struct MockButtonPin {
    level_high: bool,
    pull: Pull,
    trigger: EdgeTrigger,
    handler: Option<&'static dyn EdgeHandler>,
}

impl MockButtonPin {
    /// Create an unconfigured pin (floating, interrupts disabled)
    pub fn new() -> Self {
        Self {
            level_high: false,
            pull: Pull::None,
            trigger: EdgeTrigger::Disabled,
            handler: None,
        }
    }

    /// Configured pull resistor
    pub fn pull(&self) -> Pull {
        self.pull
    }

    /// Configured trigger
    pub fn trigger(&self) -> EdgeTrigger {
        self.trigger
    }

    /// Drive the line low (button pressed on a pull-up input)
    pub fn press(&mut self) {
        self.transition(false);
    }

    /// Drive the line high (button released)
    pub fn release(&mut self) {
        self.transition(true);
    }

    /// Full press-and-release cycle
    pub fn click(&mut self) {
        self.press();
        self.release();
    }

    fn transition(&mut self, level_high: bool) {
        if self.level_high == level_high {
            return;
        }
        self.level_high = level_high;
        if self.trigger.fires_on(level_high) {
            if let Some(handler) = self.handler {
                handler.on_edge();
            }
        }
    }
}

impl Default for MockButtonPin {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeInterrupt for MockButtonPin {
    fn configure(&mut self, pull: Pull, trigger: EdgeTrigger) -> Result<()> {
        self.pull = pull;
        self.trigger = trigger;
        // Idle level follows the pull resistor
        self.level_high = matches!(pull, Pull::Up);
        Ok(())
    }

    fn attach(&mut self, handler: &'static dyn EdgeHandler) -> Result<()> {
        if self.handler.is_some() {
            return Err(PlatformError::Gpio(GpioError::HandlerInUse));
        }
        self.handler = Some(handler);
        Ok(())
    }

    fn is_high(&self) -> bool {
        self.level_high
    }
}
