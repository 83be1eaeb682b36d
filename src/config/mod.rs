use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

pub const APP_DIR_NAME: &str = "usb-chime";

/// Locations the service reads from, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Preference file holding the sound settings record
    pub settings_path: PathBuf,
    /// Directory with the bundled `connect` / `disconnect` assets
    pub bundle_dir: PathBuf,
    /// Directories searched for named system sounds, in priority order
    pub system_sound_dirs: Vec<PathBuf>,
}

impl RuntimeConfig {
    /// Build the runtime configuration, applying command-line overrides
    pub fn resolve(settings_path: Option<PathBuf>, bundle_dir: Option<PathBuf>) -> Result<Self> {
        let settings_path = match settings_path {
            Some(path) => path,
            None => Self::default_settings_path()?,
        };
        let bundle_dir = bundle_dir.unwrap_or_else(Self::default_bundle_dir);

        let config = Self {
            settings_path,
            bundle_dir,
            system_sound_dirs: Self::default_system_sound_dirs(),
        };
        debug!("Runtime configuration: {:?}", config);
        Ok(config)
    }

    /// Get the default preference file path
    pub fn default_settings_path() -> Result<PathBuf> {
        let preference_dir = dirs::preference_dir().context("Failed to get preference directory")?;
        Ok(preference_dir.join(APP_DIR_NAME).join("settings.toml"))
    }

    /// Bundled assets live in `Contents/Resources` inside an app bundle, or in a
    /// `sounds` directory next to a bare executable
    pub fn default_bundle_dir() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()));

        match exe_dir {
            Some(dir) => {
                let resources = dir.join("../Resources");
                if resources.is_dir() {
                    resources
                } else {
                    dir.join("sounds")
                }
            }
            None => PathBuf::from("sounds"),
        }
    }

    /// System sound directories, searched in this order
    pub fn default_system_sound_dirs() -> Vec<PathBuf> {
        let mut sound_dirs = vec![
            PathBuf::from("/System/Library/Sounds"),
            PathBuf::from("/Library/Sounds"),
        ];
        if let Some(home) = dirs::home_dir() {
            sound_dirs.push(home.join("Library/Sounds"));
        }
        sound_dirs
    }
}
