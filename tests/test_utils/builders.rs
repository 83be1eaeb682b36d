//! Test utility builders for creating sound settings and runtime configurations
//!
//! Individual methods may not be used by all tests, so dead code warnings are suppressed.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use usb_chime::{RuntimeConfig, SoundChoice, SoundSettings};

/// Builder for creating test SoundSettings instances
pub struct SettingsBuilder {
    settings: SoundSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: SoundSettings::default(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.settings.enabled = false;
        self
    }

    pub fn connect_off(mut self) -> Self {
        self.settings.connect_enabled = false;
        self
    }

    pub fn disconnect_off(mut self) -> Self {
        self.settings.disconnect_enabled = false;
        self
    }

    pub fn connect_system(mut self, name: &str) -> Self {
        self.settings.connect_sound = SoundChoice::System(name.to_string());
        self
    }

    pub fn disconnect_system(mut self, name: &str) -> Self {
        self.settings.disconnect_sound = SoundChoice::System(name.to_string());
        self
    }

    pub fn connect_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.settings.connect_sound = SoundChoice::UserFile(path.as_ref().to_path_buf());
        self
    }

    pub fn disconnect_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.settings.disconnect_sound = SoundChoice::UserFile(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> SoundSettings {
        self.settings
    }
}

/// Builder for RuntimeConfig pointing at fixed mock paths
pub struct RuntimeConfigBuilder {
    settings_path: PathBuf,
    bundle_dir: PathBuf,
    system_sound_dirs: Vec<PathBuf>,
}

impl RuntimeConfigBuilder {
    pub fn new() -> Self {
        Self {
            settings_path: PathBuf::from("/prefs/usb-chime/settings.toml"),
            bundle_dir: PathBuf::from("/App/Contents/Resources"),
            system_sound_dirs: vec![
                PathBuf::from("/System/Library/Sounds"),
                PathBuf::from("/Library/Sounds"),
            ],
        }
    }

    pub fn settings_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.settings_path = path.as_ref().to_path_buf();
        self
    }

    pub fn bundle_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.bundle_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn system_sound_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.system_sound_dirs = dirs;
        self
    }

    pub fn build(self) -> RuntimeConfig {
        RuntimeConfig {
            settings_path: self.settings_path,
            bundle_dir: self.bundle_dir,
            system_sound_dirs: self.system_sound_dirs,
        }
    }
}
