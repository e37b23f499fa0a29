//! Per-device dispatch loop with statum state machine
//!
//! # State Machine
//!
//! ```text
//! Configuring ──► Routing ──► Stopped
//!  (register)     (run)       (source closed)
//! ```
//!
//! Subscriptions can only be added while `Configuring`, so the registry never
//! changes under an active loop. `Routing` owns the state store exclusively;
//! readers get a [`DeviceSnapshot`] through a watch channel instead.
//!
//! Delivery awaits each subscriber in turn. A registered subscriber that does
//! not drain its channel stalls every later event of the same device; give
//! such subscribers a larger buffer via `register_with_capacity`.

use crate::config::{ConfigError, RouterSettings};
use crate::device::derive::{derive_button, derive_hat_axis, Derivation, Routed};
use crate::device::event::{DerivedEvent, EventKind, RawEvent, RawEventKind};
use crate::device::injector::{raw_channel, EventInjector};
use crate::device::registry::{Delivery, SubscriptionRegistry};
use crate::device::state::{DeviceLayout, DeviceSnapshot, DeviceState};
use chrono::Local;
use statum::{machine, state};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace};

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Invalid router settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Router task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Counters kept by the loop, returned when it stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub raw_events: u64,
    /// Raw events of unknown kind or on undeclared axes
    pub ignored: u64,
    pub delivered: u64,
    /// Derived events nobody was subscribed to
    pub dropped: u64,
}

#[state]
#[derive(Debug, Clone)]
pub enum RouterState {
    Configuring, // accepting subscriptions
    Routing,     // consuming raw events
    Stopped,     // raw source closed
}

#[machine]
#[derive(Debug)]
pub struct DeviceRouter<S: RouterState> {
    settings: RouterSettings,
    raw_events: mpsc::Receiver<RawEvent>,
    device: DeviceState,
    registry: SubscriptionRegistry,
    snapshot: watch::Sender<DeviceSnapshot>,
    stats: RouterStats,
}

impl<S: RouterState> DeviceRouter<S> {
    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn layout(&self) -> &DeviceLayout {
        self.device.layout()
    }

    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    pub fn read_button_state(&self, number: u8) -> bool {
        self.device.button_pressed(number)
    }

    pub fn read_hat_position(&self, hat: u8) -> Option<(f32, f32)> {
        self.device.hat_position(hat)
    }

    /// Receiver that always holds the state as of the last processed event
    pub fn subscribe_snapshot(&self) -> watch::Receiver<DeviceSnapshot> {
        self.snapshot.subscribe()
    }
}

impl DeviceRouter<Configuring> {
    pub fn create(
        layout: DeviceLayout,
        settings: RouterSettings,
        raw_events: mpsc::Receiver<RawEvent>,
    ) -> Result<Self, RouterError> {
        settings.validate()?;
        info!("Creating device router with settings: {:?}", settings);

        let device = DeviceState::new(layout);
        let (snapshot, _) = watch::channel(device.snapshot());
        let registry = SubscriptionRegistry::new(settings.delivery_capacity);

        Ok(Self::new(
            settings,
            raw_events,
            device,
            registry,
            snapshot,
            RouterStats::default(),
        ))
    }

    /// Creates a router together with the injector feeding its raw source
    pub fn with_injector(
        layout: DeviceLayout,
        settings: RouterSettings,
    ) -> Result<(Self, EventInjector), RouterError> {
        settings.validate()?;
        let (injector, raw_events) = raw_channel(settings.raw_capacity);
        let router = Self::create(layout, settings, raw_events)?;
        Ok((router, injector))
    }

    pub fn register(&mut self, kind: EventKind, number: u8) -> mpsc::Receiver<DerivedEvent> {
        self.note_undeclared(kind, number);
        self.registry.register(kind, number)
    }

    pub fn register_with_capacity(
        &mut self,
        kind: EventKind,
        number: u8,
        capacity: usize,
    ) -> mpsc::Receiver<DerivedEvent> {
        self.note_undeclared(kind, number);
        self.registry.register_with_capacity(kind, number, capacity)
    }

    pub fn unregister(&mut self, kind: EventKind, number: u8) -> bool {
        self.registry.unregister(kind, number)
    }

    fn note_undeclared(&self, kind: EventKind, number: u8) {
        let layout = self.device.layout();
        let known = if kind.is_button() {
            layout.button_exists(number)
        } else {
            layout.hat_exists(number)
        };
        if !known {
            debug!(
                "Registering {} for #{} which the device layout does not declare",
                kind, number
            );
        }
    }

    pub fn start(self) -> DeviceRouter<Routing> {
        info!(
            "Starting device router with {} subscriptions",
            self.registry.len()
        );
        self.transition()
    }
}

impl DeviceRouter<Routing> {
    /// Routes one raw event: derive, store, then deliver
    pub async fn process(&mut self, raw: RawEvent) {
        self.stats.raw_events += 1;

        let routed: Vec<Routed> = match raw.kind {
            RawEventKind::Button => {
                let number = self.device.layout().button_number(raw.index);
                let prior = self.device.button(number);
                let Derivation { state, events } =
                    derive_button(&raw, &prior, self.settings.long_press_delay());
                self.device.set_button(state);
                self.snapshot.send_modify(|snapshot| {
                    snapshot.buttons.insert(number, state.pressed);
                });
                events
            }
            RawEventKind::HatAxis => {
                let Some(prior) = self.device.hat_axis(raw.index) else {
                    debug!("Ignoring sample on undeclared axis {}", raw.index);
                    self.stats.ignored += 1;
                    return;
                };
                let partner = self.device.partner_value(raw.index);
                let Derivation { state, events } =
                    derive_hat_axis(&raw, &prior, partner, self.settings.max_axis_value);
                self.device.set_hat_axis(raw.index, state);
                if let Some(position) = self.device.hat_position(state.hat) {
                    self.snapshot.send_modify(|snapshot| {
                        snapshot.hats.insert(state.hat, position);
                    });
                }
                events
            }
            RawEventKind::Unknown(code) => {
                trace!("Ignoring raw event of unknown kind {:#04x}", code);
                self.stats.ignored += 1;
                return;
            }
        };

        for (number, event) in routed {
            match self.registry.deliver(number, event).await {
                Delivery::Delivered => self.stats.delivered += 1,
                Delivery::Unrouted | Delivery::Closed => self.stats.dropped += 1,
            }
        }
    }

    /// Runs until the raw source closes
    pub async fn run(mut self) -> DeviceRouter<Stopped> {
        info!("Entering device router loop");

        let mut window_events = 0u64;
        let mut last_stats_time = Local::now();
        let stats_interval = chrono::Duration::seconds(30);

        while let Some(raw) = self.raw_events.recv().await {
            self.process(raw).await;
            window_events += 1;

            let now = Local::now();
            if now - last_stats_time > stats_interval {
                let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
                info!(
                    "Router stats: {} raw events in {} seconds ({:.2}/sec), totals {:?}",
                    window_events,
                    elapsed_seconds,
                    window_events as f64 / elapsed_seconds as f64,
                    self.stats
                );
                window_events = 0;
                last_stats_time = now;
            }
        }

        info!("Raw event source closed, router stopped: {:?}", self.stats);
        self.transition()
    }
}

impl DeviceRouter<Stopped> {
    pub fn into_stats(self) -> RouterStats {
        self.stats
    }
}
