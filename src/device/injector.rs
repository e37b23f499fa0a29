//! Producer side of a device's raw event source
//!
//! A device reader pushes decoded hardware records through [`EventInjector::send`];
//! tests and simulators use [`EventInjector::inject`] to push synthetic ones.
//! Both land in the same queue, so the router cannot tell them apart.

use crate::device::event::{RawEvent, RawEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("Raw event source closed, router is no longer running")]
    SourceClosed(RawEvent),
}

/// Creates a raw event source and the injector feeding it
pub fn raw_channel(capacity: usize) -> (EventInjector, mpsc::Receiver<RawEvent>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    debug!("Created raw event channel with capacity {}", capacity.max(1));
    (EventInjector::new(sender), receiver)
}

/// Cloneable handle that enqueues raw events for one device
///
/// The source closes when every clone has been dropped, which ends the
/// router loop.
#[derive(Debug, Clone)]
pub struct EventInjector {
    sender: mpsc::Sender<RawEvent>,
    epoch: Instant,
}

impl EventInjector {
    pub fn new(sender: mpsc::Sender<RawEvent>) -> Self {
        Self {
            sender,
            epoch: Instant::now(),
        }
    }

    /// Time since this injector was created, used as the synthetic timestamp
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    pub async fn send(&self, event: RawEvent) -> Result<(), InjectError> {
        trace!("Enqueueing raw event {:?}", event);
        self.sender
            .send(event)
            .await
            .map_err(|e| InjectError::SourceClosed(e.0))
    }

    /// Enqueues a synthetic event stamped with the current elapsed time
    pub async fn inject(
        &self,
        value: i32,
        kind: RawEventKind,
        index: u8,
    ) -> Result<(), InjectError> {
        self.inject_at(self.elapsed(), value, kind, index).await
    }

    pub async fn inject_at(
        &self,
        timestamp: Duration,
        value: i32,
        kind: RawEventKind,
        index: u8,
    ) -> Result<(), InjectError> {
        self.send(RawEvent {
            timestamp,
            kind,
            index,
            value,
        })
        .await
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
