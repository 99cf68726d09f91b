//! Device drivers
//!
//! Drivers written against the platform abstraction traits, so they run the
//! same on hardware and against the mock platform.
//!
//! ## Modules
//!
//! - `button`: push button edge counting and press reporting

pub mod button;
