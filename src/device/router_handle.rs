//! Router Handle - runs a configured router on its own tokio task
//!
//! The handle keeps the read side of the router's snapshot channel, so the
//! current button and hat state can be queried without subscribing to any
//! event stream while the loop owns the state store.

use crate::device::router::{Configuring, DeviceRouter, RouterError, RouterStats};
use crate::device::state::DeviceSnapshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to a spawned device router
///
/// # Lifecycle
///
/// The task ends when every [`EventInjector`](crate::device::EventInjector)
/// feeding the router has been dropped. [`RouterHandle::join`] then yields
/// the final counters. Dropping the handle detaches the task; it keeps
/// routing until its source closes.
#[derive(Debug)]
pub struct RouterHandle {
    snapshot: watch::Receiver<DeviceSnapshot>,
    task: JoinHandle<RouterStats>,
}

impl RouterHandle {
    /// Starts the router and spawns its loop
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use joyroute::config::RouterSettings;
    /// use joyroute::device::{DeviceLayout, DeviceRouter, EventKind, RawEventKind, RouterHandle};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let (mut router, injector) =
    ///     DeviceRouter::with_injector(DeviceLayout::sequential(4, 1), RouterSettings::default())?;
    /// let mut presses = router.register(EventKind::ButtonClosed, 0);
    /// let handle = RouterHandle::spawn(router);
    ///
    /// injector.inject(1, RawEventKind::Button, 0).await?;
    /// let pressed = presses.recv().await;
    /// assert!(pressed.is_some());
    /// assert!(handle.read_button_state(0));
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(router: DeviceRouter<Configuring>) -> Self {
        let snapshot = router.subscribe_snapshot();
        let routing = router.start();

        info!("Spawning device router task");
        let task = tokio::spawn(async move {
            let stopped = routing.run().await;
            stopped.into_stats()
        });
        debug!("Tokio task spawned with handle: {:?}", task);

        Self { snapshot, task }
    }

    pub fn read_button_state(&self, number: u8) -> bool {
        self.snapshot.borrow().button_pressed(number)
    }

    pub fn read_hat_position(&self, hat: u8) -> Option<(f32, f32)> {
        self.snapshot.borrow().hat_position(hat)
    }

    /// Receiver for the snapshot, notified after every routed raw event
    pub fn snapshot(&self) -> watch::Receiver<DeviceSnapshot> {
        self.snapshot.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the loop to end and returns its counters
    pub async fn join(self) -> Result<RouterStats, RouterError> {
        let stats = self.task.await?;
        info!("Device router finished: {:?}", stats);
        Ok(stats)
    }
}
