use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::preferences::{PreferenceStore, SoundSettings};
use crate::system::FileSystemInterface;

/// Process-owned settings with write-through persistence
///
/// Lives on the UI context; every mutation goes through [`AppState::update`] so the
/// stored record never lags the in-memory one.
pub struct AppState<F: FileSystemInterface> {
    settings: SoundSettings,
    store: PreferenceStore<F>,
    last_synced: Option<SystemTime>,
}

impl<F: FileSystemInterface> AppState<F> {
    /// Load settings from the store (defaults on any failure)
    pub fn load(store: PreferenceStore<F>) -> Self {
        let settings = store.load();
        let last_synced = store.modified_time();
        info!(
            "Loaded settings: enabled={} connect={} ({}) disconnect={} ({})",
            settings.enabled,
            settings.connect_enabled,
            settings.connect_sound,
            settings.disconnect_enabled,
            settings.disconnect_sound
        );

        Self {
            settings,
            store,
            last_synced,
        }
    }

    pub fn settings(&self) -> &SoundSettings {
        &self.settings
    }

    /// Mutate the settings and persist the result
    pub fn update(&mut self, change: impl FnOnce(&mut SoundSettings)) {
        change(&mut self.settings);
        self.store.save(&self.settings);
        self.last_synced = self.store.modified_time();
    }

    /// Replace the in-memory settings with the stored record.
    ///
    /// A missing, empty or unreadable record leaves the in-memory settings in place.
    /// Returns true when the settings were replaced.
    pub fn reload(&mut self) -> bool {
        self.last_synced = self.store.modified_time();

        match self.store.try_load() {
            Ok(Some(settings)) => {
                self.settings = settings;
                info!("Settings reloaded from {}", self.store.path().display());
                true
            }
            Ok(None) => {
                warn!(
                    "No stored record in {}, keeping current settings",
                    self.store.path().display()
                );
                false
            }
            Err(e) => {
                warn!("Keeping current settings: {:#}", e);
                false
            }
        }
    }

    /// Reload when another process wrote the preference file since our last sync.
    /// Returns true when the stored record replaced the in-memory settings.
    pub fn refresh_if_modified(&mut self) -> bool {
        let Some(modified) = self.store.modified_time() else {
            return false;
        };

        let changed = match self.last_synced {
            Some(last) => modified > last,
            None => true,
        };
        if !changed {
            return false;
        }
        debug!("Preference file changed on disk");
        self.reload()
    }

    pub fn settings_path(&self) -> &Path {
        self.store.path()
    }

    /// Get reference to the store (for testing)
    #[cfg(any(test, feature = "test-mocks"))]
    pub fn get_store(&self) -> &PreferenceStore<F> {
        &self.store
    }
}
