#[cfg(target_os = "macos")]
pub mod iokit;
pub mod watcher;

#[cfg(target_os = "macos")]
pub use iokit::IoKitNotifications;
pub use watcher::{DeviceEventSink, DeviceWatcher, WatcherState, drain_devices};

use anyhow::{Result, bail};

use crate::system::{BatchCallback, DeviceNotificationInterface};

/// Notification backend used outside macOS: registration always fails, which leaves
/// the watcher unavailable while the rest of the service keeps running
#[derive(Debug, Default)]
pub struct UnsupportedNotifications;

impl DeviceNotificationInterface for UnsupportedNotifications {
    fn register(&mut self, _callback: BatchCallback) -> Result<()> {
        bail!("USB device notifications require macOS IOKit")
    }

    fn unregister(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(target_os = "macos")]
pub type PlatformNotifications = IoKitNotifications;

#[cfg(not(target_os = "macos"))]
pub type PlatformNotifications = UnsupportedNotifications;
