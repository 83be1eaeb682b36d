use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::preferences::{EventKind, SoundSettings};

/// Trait for file system operations - abstracts std::fs for testability
pub trait FileSystemInterface {
    /// Read the entire contents of a text file
    fn read_file(&self, path: &Path) -> Result<String>;

    /// Write text content to a file, replacing it
    fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    /// Check if a regular file exists at `path`
    fn file_exists(&self, path: &Path) -> bool;

    /// Create the directory structure for `path`
    fn create_dir(&self, path: &Path) -> Result<()>;

    /// List the entries of a directory
    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Get the last modified time of a file (for picking up external edits)
    fn modified_time(&self, path: &Path) -> Result<SystemTime>;
}

/// Trait for audio playback - abstracts the system player process
pub trait SoundPlayerInterface {
    /// Start playing the audio file at `path` and return without waiting for it to finish
    fn play(&self, path: &Path) -> Result<()>;
}

/// Opaque reference to one matched device, owned by the OS until released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u32);

/// A drainable batch of matched devices delivered by one notification wake-up
pub trait DeviceIterator {
    /// Next matched device, or None once the batch is exhausted
    fn next_device(&mut self) -> Option<DeviceHandle>;

    /// Give an inspected device handle back to the OS
    fn release(&mut self, device: DeviceHandle);
}

/// Invoked on the notification thread once per wake-up
pub type BatchCallback = Arc<dyn Fn(EventKind, &mut dyn DeviceIterator) + Send + Sync>;

/// Trait for OS device notifications - abstracts IOKit matching notifications
pub trait DeviceNotificationInterface {
    /// Subscribe to attach (first match) and removal (terminated) notifications for
    /// USB host devices.
    ///
    /// The catch-up batch of already attached devices is delivered through `callback`
    /// once per kind before this returns; every later call describes real transitions.
    fn register(&mut self, callback: BatchCallback) -> Result<()>;

    /// Tear the subscription down; no callbacks run after this returns
    fn unregister(&mut self) -> Result<()>;
}

/// Why dependent presentation state has to be rebuilt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    /// A user file disappeared and the event fell back to the bundled sound
    SoundReverted { kind: EventKind, missing: PathBuf },
    /// Settings were re-read from storage
    SettingsReloaded,
}

/// Trait for the preference UI collaborator that mirrors the current settings
pub trait PresentationInterface {
    fn rebuild(&self, settings: &SoundSettings, reason: &RebuildReason);
}
