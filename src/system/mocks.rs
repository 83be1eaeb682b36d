use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::{Duration, SystemTime};

use crate::preferences::{EventKind, SoundSettings};
use crate::system::traits::{
    BatchCallback, DeviceHandle, DeviceIterator, DeviceNotificationInterface,
    FileSystemInterface, PresentationInterface, RebuildReason, SoundPlayerInterface,
};

/// Mock file system for testing - provides controllable file operations
#[derive(Clone, Default)]
pub struct MockFileSystem {
    pub files: Arc<Mutex<HashMap<PathBuf, (String, u64)>>>,
    pub read_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub write_calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    pub directory_creation_calls: Arc<Mutex<Vec<PathBuf>>>,
    pub should_fail_read: Arc<AtomicBool>,
    pub should_fail_write: Arc<AtomicBool>,
    pub should_fail_create_dir: Arc<AtomicBool>,
    clock: Arc<AtomicU64>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the mock file system, bumping its modified time
    pub fn add_file<P: AsRef<Path>>(&self, path: P, content: &str) {
        let stamp = self.tick();
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), (content.to_string(), stamp));
    }

    /// Remove a file from the mock file system
    pub fn remove_file<P: AsRef<Path>>(&self, path: P) {
        self.files.lock().unwrap().remove(path.as_ref());
    }

    /// Current content of a file, if present
    pub fn content<P: AsRef<Path>>(&self, path: P) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path.as_ref())
            .map(|(content, _)| content.clone())
    }

    /// Get all read calls that were made
    pub fn get_read_calls(&self) -> Vec<PathBuf> {
        self.read_calls.lock().unwrap().clone()
    }

    /// Get all write calls that were made
    pub fn get_write_calls(&self) -> Vec<(PathBuf, String)> {
        self.write_calls.lock().unwrap().clone()
    }

    /// Get all directory creation calls that were made
    pub fn get_directory_creation_calls(&self) -> Vec<PathBuf> {
        self.directory_creation_calls.lock().unwrap().clone()
    }

    /// Clear all call histories
    pub fn clear_call_history(&self) {
        self.read_calls.lock().unwrap().clear();
        self.write_calls.lock().unwrap().clear();
        self.directory_creation_calls.lock().unwrap().clear();
    }

    /// Configure the mock to fail read operations
    pub fn set_read_failure(&self, should_fail: bool) {
        self.should_fail_read.store(should_fail, Ordering::Relaxed);
    }

    /// Configure the mock to fail write operations
    pub fn set_write_failure(&self, should_fail: bool) {
        self.should_fail_write.store(should_fail, Ordering::Relaxed);
    }

    /// Configure the mock to fail directory creation
    pub fn set_create_dir_failure(&self, should_fail: bool) {
        self.should_fail_create_dir
            .store(should_fail, Ordering::Relaxed);
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl FileSystemInterface for MockFileSystem {
    fn read_file(&self, path: &Path) -> Result<String> {
        self.read_calls.lock().unwrap().push(path.to_path_buf());

        if self.should_fail_read.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("Mock read failure"));
        }

        self.content(path)
            .ok_or_else(|| anyhow::anyhow!("File not found: {}", path.display()))
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        self.write_calls
            .lock()
            .unwrap()
            .push((path.to_path_buf(), content.to_string()));

        if self.should_fail_write.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("Mock write failure"));
        }

        self.add_file(path, content);
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        self.directory_creation_calls
            .lock()
            .unwrap()
            .push(path.to_path_buf());

        if self.should_fail_create_dir.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("Mock create directory failure"));
        }

        Ok(())
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        let entries: Vec<PathBuf> = files
            .keys()
            .filter(|file| file.parent() == Some(path))
            .cloned()
            .collect();

        if entries.is_empty() {
            return Err(anyhow::anyhow!("Directory not found: {}", path.display()));
        }
        Ok(entries)
    }

    fn modified_time(&self, path: &Path) -> Result<SystemTime> {
        let files = self.files.lock().unwrap();
        let (_, stamp) = files
            .get(path)
            .ok_or_else(|| anyhow::anyhow!("File not found: {}", path.display()))?;
        Ok(SystemTime::UNIX_EPOCH + Duration::from_secs(*stamp))
    }
}

/// Mock sound player for testing - records what would have been played
#[derive(Clone, Default)]
pub struct MockSoundPlayer {
    pub played: Arc<Mutex<Vec<PathBuf>>>,
    pub play_threads: Arc<Mutex<Vec<ThreadId>>>,
    pub should_fail: Arc<AtomicBool>,
}

impl MockSoundPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get every path handed to the player, in order
    pub fn get_played(&self) -> Vec<PathBuf> {
        self.played.lock().unwrap().clone()
    }

    /// Threads that playback was started from
    pub fn get_play_threads(&self) -> Vec<ThreadId> {
        self.play_threads.lock().unwrap().clone()
    }

    /// Configure the mock to fail playback
    pub fn set_play_failure(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::Relaxed);
    }
}

impl SoundPlayerInterface for MockSoundPlayer {
    fn play(&self, path: &Path) -> Result<()> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("Mock playback failure"));
        }

        self.played.lock().unwrap().push(path.to_path_buf());
        self.play_threads
            .lock()
            .unwrap()
            .push(std::thread::current().id());
        Ok(())
    }
}

/// Mock device notification source - lets tests inject attach/detach batches
#[derive(Clone, Default)]
pub struct MockDeviceNotifications {
    pub callback: Arc<Mutex<Option<BatchCallback>>>,
    pub attached_at_start: Arc<Mutex<Vec<DeviceHandle>>>,
    pub released: Arc<Mutex<Vec<DeviceHandle>>>,
    pub register_calls: Arc<AtomicUsize>,
    pub unregister_calls: Arc<AtomicUsize>,
    pub should_fail_register: Arc<AtomicBool>,
}

impl MockDeviceNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices reported by the catch-up enumeration on registration
    pub fn with_attached_devices(self, ids: &[u32]) -> Self {
        *self.attached_at_start.lock().unwrap() = ids.iter().copied().map(DeviceHandle).collect();
        self
    }

    /// Deliver an attach batch; returns false when nothing is registered
    pub fn attach(&self, ids: &[u32]) -> bool {
        self.deliver(EventKind::Connect, ids)
    }

    /// Deliver a removal batch; returns false when nothing is registered
    pub fn detach(&self, ids: &[u32]) -> bool {
        self.deliver(EventKind::Disconnect, ids)
    }

    /// Handles released by the watcher, in release order
    pub fn get_released(&self) -> Vec<DeviceHandle> {
        self.released.lock().unwrap().clone()
    }

    pub fn is_registered(&self) -> bool {
        self.callback.lock().unwrap().is_some()
    }

    /// Configure the mock to fail registration
    pub fn set_register_failure(&self, should_fail: bool) {
        self.should_fail_register
            .store(should_fail, Ordering::Relaxed);
    }

    fn deliver(&self, kind: EventKind, ids: &[u32]) -> bool {
        // Clone the callback out so it runs without holding the lock
        let callback = self.callback.lock().unwrap().clone();
        match callback {
            Some(callback) => {
                let handles: Vec<DeviceHandle> = ids.iter().copied().map(DeviceHandle).collect();
                let mut batch = MockDeviceIterator::new(handles, Arc::clone(&self.released));
                callback(kind, &mut batch);
                true
            }
            None => false,
        }
    }
}

impl DeviceNotificationInterface for MockDeviceNotifications {
    fn register(&mut self, callback: BatchCallback) -> Result<()> {
        self.register_calls.fetch_add(1, Ordering::Relaxed);

        if self.should_fail_register.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("Mock notification registration failure"));
        }

        *self.callback.lock().unwrap() = Some(callback);

        let attached = self.attached_at_start.lock().unwrap().clone();
        let ids: Vec<u32> = attached.iter().map(|handle| handle.0).collect();
        self.deliver(EventKind::Connect, &ids);
        self.deliver(EventKind::Disconnect, &[]);
        Ok(())
    }

    fn unregister(&mut self) -> Result<()> {
        self.unregister_calls.fetch_add(1, Ordering::Relaxed);
        *self.callback.lock().unwrap() = None;
        Ok(())
    }
}

/// Iterator over a fixed batch that records releases into a shared log
pub struct MockDeviceIterator {
    pending: VecDeque<DeviceHandle>,
    released: Arc<Mutex<Vec<DeviceHandle>>>,
}

impl MockDeviceIterator {
    pub fn new(devices: Vec<DeviceHandle>, released: Arc<Mutex<Vec<DeviceHandle>>>) -> Self {
        Self {
            pending: devices.into(),
            released,
        }
    }
}

impl DeviceIterator for MockDeviceIterator {
    fn next_device(&mut self) -> Option<DeviceHandle> {
        self.pending.pop_front()
    }

    fn release(&mut self, device: DeviceHandle) {
        self.released.lock().unwrap().push(device);
    }
}

/// Mock presentation collaborator that records rebuild requests
#[derive(Clone, Default)]
pub struct MockPresenter {
    pub rebuilds: Arc<Mutex<Vec<(SoundSettings, RebuildReason)>>>,
}

impl MockPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_rebuilds(&self) -> Vec<(SoundSettings, RebuildReason)> {
        self.rebuilds.lock().unwrap().clone()
    }
}

impl PresentationInterface for MockPresenter {
    fn rebuild(&self, settings: &SoundSettings, reason: &RebuildReason) {
        self.rebuilds
            .lock()
            .unwrap()
            .push((settings.clone(), reason.clone()));
    }
}
