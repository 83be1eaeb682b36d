use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

use crate::preferences::EventKind;
use crate::system::{BatchCallback, DeviceHandle, DeviceIterator, DeviceNotificationInterface};

/// Receives one call per genuine device transition
///
/// Called on the notification thread; implementations hand the event off to the UI
/// context instead of doing the work inline.
pub trait DeviceEventSink: Send + Sync {
    fn device_event(&self, kind: EventKind);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Unregistered,
    /// Registered, catch-up batches not yet drained for every kind
    DrainingInitial,
    Watching,
    /// Registration failed; device sounds stay off for this process
    Unavailable,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatcherState::Unregistered => write!(f, "unregistered"),
            WatcherState::DrainingInitial => write!(f, "draining initial batch"),
            WatcherState::Watching => write!(f, "watching"),
            WatcherState::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Visit every device in a batch, releasing each handle right after its visit
pub fn drain_devices(
    devices: &mut dyn DeviceIterator,
    mut visit: impl FnMut(DeviceHandle),
) -> usize {
    let mut drained = 0;
    while let Some(device) = devices.next_device() {
        visit(device);
        devices.release(device);
        drained += 1;
    }
    drained
}

/// State shared with the notification thread
struct WatchShared {
    sink: Arc<dyn DeviceEventSink>,
    caught_up: [AtomicBool; 2],
}

impl WatchShared {
    fn handle_batch(&self, kind: EventKind, devices: &mut dyn DeviceIterator) {
        // The first batch per kind is the catch-up enumeration of present devices
        if !self.caught_up[kind.index()].swap(true, Ordering::AcqRel) {
            let discarded = drain_devices(devices, |_| {});
            debug!(
                "Discarded {} already-present device(s) from initial {} batch",
                discarded, kind
            );
            return;
        }

        let delivered = drain_devices(devices, |device| {
            debug!("{} notification for device {:?}", kind, device);
            self.sink.device_event(kind);
        });
        debug!("Drained {} device(s) for {} notification", delivered, kind);
    }

    fn is_caught_up(&self) -> bool {
        self.caught_up
            .iter()
            .all(|flag| flag.load(Ordering::Acquire))
    }
}

/// Bridges OS attach/detach notifications into per-device events
pub struct DeviceWatcher<N: DeviceNotificationInterface> {
    notifications: N,
    shared: Option<Arc<WatchShared>>,
    unavailable: bool,
}

impl<N: DeviceNotificationInterface> DeviceWatcher<N> {
    pub fn new(notifications: N) -> Self {
        Self {
            notifications,
            shared: None,
            unavailable: false,
        }
    }

    /// Subscribe to device notifications and forward genuine transitions to `sink`.
    ///
    /// A registration failure is logged and leaves the watcher unavailable; it is
    /// never propagated, so the rest of the application keeps running.
    pub fn start(&mut self, sink: Arc<dyn DeviceEventSink>) -> WatcherState {
        if self.shared.is_some() {
            warn!("Device watcher already started, ignoring");
            return self.state();
        }

        match self.try_start(sink) {
            Ok(()) => {
                self.unavailable = false;
                info!("USB device watcher is {}", self.state());
            }
            Err(e) => {
                self.unavailable = true;
                error!("USB device notifications unavailable: {:#}", e);
            }
        }
        self.state()
    }

    /// Unsubscribe; a stopped watcher can be started again
    pub fn stop(&mut self) -> Result<()> {
        if self.shared.take().is_some() {
            info!("Stopping USB device watcher");
            self.notifications.unregister()?;
        }
        Ok(())
    }

    pub fn state(&self) -> WatcherState {
        match &self.shared {
            Some(shared) if shared.is_caught_up() => WatcherState::Watching,
            Some(_) => WatcherState::DrainingInitial,
            None if self.unavailable => WatcherState::Unavailable,
            None => WatcherState::Unregistered,
        }
    }

    /// Get reference to the notification backend (for testing)
    #[cfg(any(test, feature = "test-mocks"))]
    pub fn get_notifications(&self) -> &N {
        &self.notifications
    }

    fn try_start(&mut self, sink: Arc<dyn DeviceEventSink>) -> Result<()> {
        let shared = Arc::new(WatchShared {
            sink,
            caught_up: [AtomicBool::new(false), AtomicBool::new(false)],
        });

        let batch_target = Arc::clone(&shared);
        let callback: BatchCallback =
            Arc::new(move |kind: EventKind, devices: &mut dyn DeviceIterator| {
                batch_target.handle_batch(kind, devices)
            });

        // Set before registering: catch-up batches arrive before register() returns
        self.shared = Some(shared);
        if let Err(e) = self.notifications.register(callback) {
            self.shared = None;
            return Err(e);
        }
        Ok(())
    }
}
