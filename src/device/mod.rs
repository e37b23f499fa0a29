//! Device subsystem: raw joystick samples in, typed event streams out
//!
//! One router per device, built from these parts:
//!
//! 1. [`state`] - last-known button and hat-axis values, plus the layout
//! 2. [`derive`] - pure derivation of typed events from one raw sample
//! 3. [`registry`] - one delivery channel per (event kind, number)
//! 4. [`router`] - the dispatch loop tying the three together
//! 5. [`injector`] - producer handle for hardware and synthetic samples
//!
//! # Architecture
//!
//! ```text
//! Reader / Simulator ──► EventInjector ──► DeviceRouter ──► subscriber channels
//!                         (RawEvent)       (derive+store)    (DerivedEvent)
//! ```
//!
//! Devices never share state; run one router per device.

pub mod derive;
pub mod event;
pub mod injector;
pub mod registry;
pub mod router;
pub mod router_handle;
pub mod state;

pub use event::{AxisRole, DerivedEvent, EventKind, RawEvent, RawEventKind};
pub use injector::{raw_channel, EventInjector, InjectError};
pub use registry::SubscriptionRegistry;
pub use router::{Configuring, DeviceRouter, RouterError, RouterStats, Routing, Stopped};
pub use router_handle::RouterHandle;
pub use state::{DeviceLayout, DeviceSnapshot, DeviceState};
