//! Routes raw joystick events into per-kind typed channels
//!
//! A device's raw samples (button presses, hat axis values) go through a
//! [`device::DeviceRouter`], which remembers the last state of every button
//! and axis and derives position, angle, radius, edge, centering and
//! long-press events. Consumers register a channel per event kind and number
//! and receive only that stream.

pub mod config;
pub mod device;

pub use config::{ConfigError, RouterSettings};
