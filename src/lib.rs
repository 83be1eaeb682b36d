pub mod config;
pub mod logging;
pub mod notifications;
pub mod preferences;
pub mod service;
pub mod sound;
pub mod system;
pub mod usb;

pub use config::RuntimeConfig;
pub use preferences::{EventKind, PreferenceStore, SoundChoice, SoundSettings};
pub use service::{AppState, EventRouter, SoundNotifierService, UiDispatcher, UiEvent};
pub use sound::{ResolutionOutcome, SoundLibrary, SoundResolver};
pub use system::*;
pub use usb::{DeviceWatcher, WatcherState};

#[cfg(any(test, feature = "test-mocks"))]
pub use notifications::TestNotificationSender;
