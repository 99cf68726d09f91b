//! Push button driver
//!
//! Turns falling edges on a pull-up input into press reports.
//!
//! # Pipeline
//!
//! ```text
//!  GPIO edge ──► ButtonEvents::on_edge ──► CountingSemaphore<100> ──► ButtonTask
//!  (interrupt)      release one unit                                  acquire, count,
//!                                                                     report
//! ```
//!
//! The interrupt side only gives back a semaphore unit: no allocation, no
//! logging, no blocking. Edges beyond [`BUTTON_EVENT_CAPACITY`] pending units
//! are lost. The task side takes one unit per press, so every counted edge
//! produces exactly one report.

use crate::communication::link::{LinkError, LinkManager};
use crate::core::sync::CountingSemaphore;
use crate::platform::traits::{EdgeHandler, EdgeInterrupt, EdgeTrigger, Pull, RadioInterface};
use crate::platform::Result;

/// Maximum number of unprocessed presses
pub const BUTTON_EVENT_CAPACITY: usize = 100;

/// Press events raised from interrupt context
pub struct ButtonEvents {
    presses: CountingSemaphore<BUTTON_EVENT_CAPACITY>,
}

impl ButtonEvents {
    pub const fn new() -> Self {
        Self {
            presses: CountingSemaphore::new(0),
        }
    }

    /// Configure `pin` as a pull-up, falling-edge input and route its
    /// interrupt here
    ///
    /// # Errors
    ///
    /// Returns the pin's configuration or attach error.
    pub fn install<P: EdgeInterrupt>(&'static self, pin: &mut P) -> Result<()> {
        pin.configure(Pull::Up, EdgeTrigger::Falling)?;
        pin.attach(self)
    }

    /// Presses waiting to be processed
    pub fn pending(&self) -> usize {
        self.presses.available()
    }

    /// Wait for the next press
    pub async fn wait(&self) {
        self.presses.acquire().await
    }
}

impl Default for ButtonEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeHandler for ButtonEvents {
    fn on_edge(&self) {
        // Saturates at capacity
        self.presses.release();
    }
}

/// Destination of press reports
#[allow(async_fn_in_trait)]
pub trait PressReporter {
    /// Report the running press count
    async fn report_presses(&self, count: i32) -> core::result::Result<(), LinkError>;
}

impl<R: RadioInterface + Sync + 'static> PressReporter for LinkManager<R> {
    async fn report_presses(&self, count: i32) -> core::result::Result<(), LinkError> {
        self.report_button_presses(count).await
    }
}

/// Button task: one report per press
pub struct ButtonTask<'a, P> {
    events: &'a ButtonEvents,
    reporter: &'a P,
    press_count: i32,
}

impl<'a, P: PressReporter> ButtonTask<'a, P> {
    pub fn new(events: &'a ButtonEvents, reporter: &'a P) -> Self {
        Self {
            events,
            reporter,
            press_count: 0,
        }
    }

    /// Presses counted so far
    pub fn press_count(&self) -> i32 {
        self.press_count
    }

    /// Wait for one press, count it and report the new total
    ///
    /// Report errors are returned but the press stays counted.
    pub async fn handle_next(&mut self) -> core::result::Result<(), LinkError> {
        self.events.wait().await;
        self.press_count = self.press_count.wrapping_add(1);
        self.reporter.report_presses(self.press_count).await
    }

    pub async fn run(mut self) -> ! {
        loop {
            // Failures are logged by the reporter; reports are not retried
            let _ = self.handle_next().await;
        }
    }
}
