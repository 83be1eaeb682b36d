use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::system::FileSystemInterface;

use super::types::SoundSettings;

/// Key the settings record is stored under inside the preference document
pub const PREFERENCE_KEY: &str = "soundSettings";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceDocument {
    #[serde(rename = "soundSettings", default, skip_serializing_if = "Option::is_none")]
    sound_settings: Option<SoundSettings>,
}

/// Preference store that uses dependency injection for file system operations
pub struct PreferenceStore<F: FileSystemInterface> {
    file_system: F,
    path: PathBuf,
}

impl<F: FileSystemInterface> PreferenceStore<F> {
    pub fn new(file_system: F, path: PathBuf) -> Self {
        Self { file_system, path }
    }

    /// Load the settings record, falling back to defaults on any failure
    pub fn load(&self) -> SoundSettings {
        debug!("Loading preferences from: {}", self.path.display());

        if !self.file_system.file_exists(&self.path) {
            info!("No stored preferences, using defaults");
            return SoundSettings::default();
        }

        match self.try_load() {
            Ok(Some(settings)) => {
                debug!("Preferences loaded successfully");
                settings
            }
            Ok(None) => {
                info!(
                    "No '{}' record in {}, using defaults",
                    PREFERENCE_KEY,
                    self.path.display()
                );
                SoundSettings::default()
            }
            Err(e) => {
                warn!("Ignoring unreadable preferences: {:#}", e);
                SoundSettings::default()
            }
        }
    }

    /// Persist the settings record; failures are logged and dropped
    pub fn save(&self, settings: &SoundSettings) {
        if let Err(e) = self.try_save(settings) {
            warn!("Could not save preferences: {:#}", e);
        }
    }

    /// Last modification time of the stored record, if it exists
    pub fn modified_time(&self) -> Option<SystemTime> {
        self.file_system.modified_time(&self.path).ok()
    }

    /// Get the preference file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode a settings record as a preference document
    pub fn serialize(settings: &SoundSettings) -> Result<String> {
        let document = PreferenceDocument {
            sound_settings: Some(settings.clone()),
        };
        toml::to_string_pretty(&document).context("Failed to serialize preferences")
    }

    /// Decode a preference document; `Ok(None)` when the record key is absent
    pub fn deserialize(content: &str) -> Result<Option<SoundSettings>> {
        let document: PreferenceDocument =
            toml::from_str(content).context("Failed to parse preferences")?;
        Ok(document.sound_settings)
    }

    /// Read and decode the stored record without falling back to defaults.
    /// `Ok(None)` when the document has no record key.
    pub(crate) fn try_load(&self) -> Result<Option<SoundSettings>> {
        let content = self
            .file_system
            .read_file(&self.path)
            .with_context(|| format!("Failed to read preferences: {}", self.path.display()))?;

        Self::deserialize(&content)
            .with_context(|| format!("Invalid preferences in {}", self.path.display()))
    }

    fn try_save(&self, settings: &SoundSettings) -> Result<()> {
        debug!("Saving preferences to: {}", self.path.display());

        // Create parent directories if they don't exist
        if let Some(parent) = self.path.parent() {
            self.file_system.create_dir(parent).with_context(|| {
                format!("Failed to create preference directory: {}", parent.display())
            })?;
        }

        let content = Self::serialize(settings)?;
        self.file_system
            .write_file(&self.path, &content)
            .with_context(|| format!("Failed to write preferences: {}", self.path.display()))?;

        debug!("Preferences saved to: {}", self.path.display());
        Ok(())
    }

    /// Get reference to the file system (for testing)
    #[cfg(any(test, feature = "test-mocks"))]
    pub fn get_file_system(&self) -> &F {
        &self.file_system
    }
}

impl PreferenceStore<crate::system::StandardFileSystem> {
    pub fn new_production(path: PathBuf) -> Self {
        Self::new(crate::system::StandardFileSystem, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{EventKind, SoundChoice};
    use crate::system::MockFileSystem;

    fn store() -> (MockFileSystem, PreferenceStore<MockFileSystem>) {
        let mock_fs = MockFileSystem::new();
        let store = PreferenceStore::new(mock_fs.clone(), PathBuf::from("/prefs/settings.toml"));
        (mock_fs, store)
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let (mock_fs, store) = store();

        assert_eq!(store.load(), SoundSettings::default());
        assert!(mock_fs.get_read_calls().is_empty());
        // Loading never writes
        assert!(mock_fs.get_write_calls().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_returns_default() {
        let (mock_fs, store) = store();
        mock_fs.add_file("/prefs/settings.toml", "soundSettings = [this is not toml");

        assert_eq!(store.load(), SoundSettings::default());
    }

    #[test]
    fn test_load_wrong_types_returns_default() {
        let (mock_fs, store) = store();
        mock_fs.add_file(
            "/prefs/settings.toml",
            r#"
[soundSettings]
enabled = "yes"
"#,
        );

        assert_eq!(store.load(), SoundSettings::default());
    }

    #[test]
    fn test_load_unknown_variant_returns_default() {
        let (mock_fs, store) = store();
        mock_fs.add_file(
            "/prefs/settings.toml",
            r#"
[soundSettings.connectSound]
kind = "midi"
value = "ding"
"#,
        );

        assert_eq!(store.load(), SoundSettings::default());
    }

    #[test]
    fn test_load_read_failure_returns_default() {
        let (mock_fs, store) = store();
        mock_fs.add_file("/prefs/settings.toml", "");
        mock_fs.set_read_failure(true);

        assert_eq!(store.load(), SoundSettings::default());
    }

    #[test]
    fn test_load_existing_record() {
        let (mock_fs, store) = store();
        mock_fs.add_file(
            "/prefs/settings.toml",
            r#"
[soundSettings]
enabled = true
connectEnabled = false
disconnectEnabled = true

[soundSettings.connectSound]
kind = "system"
value = "Glass"

[soundSettings.disconnectSound]
kind = "user_file"
value = "/Users/me/unplug.wav"
"#,
        );

        let settings = store.load();
        assert!(!settings.connect_enabled);
        assert_eq!(settings.connect_sound, SoundChoice::System("Glass".to_string()));
        assert_eq!(
            settings.sound_for(EventKind::Disconnect),
            &SoundChoice::UserFile(PathBuf::from("/Users/me/unplug.wav"))
        );
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let (mock_fs, store) = store();
        mock_fs.add_file(
            "/prefs/settings.toml",
            r#"
[soundSettings]
disconnectEnabled = false
"#,
        );

        let settings = store.load();
        assert!(settings.enabled);
        assert!(settings.connect_enabled);
        assert!(!settings.disconnect_enabled);
        assert!(settings.connect_sound.is_builtin());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let (mock_fs, store) = store();
        let settings = SoundSettings {
            enabled: false,
            connect_enabled: true,
            disconnect_enabled: false,
            connect_sound: SoundChoice::UserFile(PathBuf::from("/Users/me/plug.aiff")),
            disconnect_sound: SoundChoice::System("Funk".to_string()),
        };

        store.save(&settings);

        let write_calls = mock_fs.get_write_calls();
        assert_eq!(write_calls.len(), 1);
        assert_eq!(write_calls[0].0, PathBuf::from("/prefs/settings.toml"));
        assert!(write_calls[0].1.contains(PREFERENCE_KEY));
        assert_eq!(
            mock_fs.get_directory_creation_calls(),
            vec![PathBuf::from("/prefs")]
        );

        assert_eq!(store.load(), settings);
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        let (mock_fs, store) = store();
        mock_fs.set_write_failure(true);

        store.save(&SoundSettings::default());

        assert_eq!(mock_fs.get_write_calls().len(), 1);
        assert!(mock_fs.content("/prefs/settings.toml").is_none());
    }

    #[test]
    fn test_save_skips_write_when_directory_fails() {
        let (mock_fs, store) = store();
        mock_fs.set_create_dir_failure(true);

        store.save(&SoundSettings::default());

        assert!(mock_fs.get_write_calls().is_empty());
    }

    #[test]
    fn test_try_load_reports_corrupt_record() {
        let (mock_fs, store) = store();
        mock_fs.add_file("/prefs/settings.toml", "[soundSettings]\nenabled = fal");

        assert!(store.try_load().is_err());
        assert_eq!(
            store.get_file_system().get_read_calls(),
            vec![PathBuf::from("/prefs/settings.toml")]
        );
    }

    #[test]
    fn test_document_without_record_key() {
        assert_eq!(
            PreferenceStore::<MockFileSystem>::deserialize("other = 1\n").unwrap(),
            None
        );
    }
}
