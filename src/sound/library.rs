use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::preferences::EventKind;
use crate::system::FileSystemInterface;

/// File extensions treated as playable audio
pub const AUDIO_EXTENSIONS: &[&str] = &["aiff", "aif", "wav", "mp3", "m4a", "caf", "aac"];

/// True when `path` carries one of the recognised audio extensions
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Locates bundled assets and named system sounds on disk
pub struct SoundLibrary<F: FileSystemInterface> {
    file_system: F,
    bundle_dir: PathBuf,
    system_dirs: Vec<PathBuf>,
}

impl<F: FileSystemInterface> SoundLibrary<F> {
    pub fn new(file_system: F, bundle_dir: PathBuf, system_dirs: Vec<PathBuf>) -> Self {
        Self {
            file_system,
            bundle_dir,
            system_dirs,
        }
    }

    /// Bundled asset for an event, e.g. `<bundle>/connect.aiff`
    pub fn bundled_asset(&self, kind: EventKind) -> Option<PathBuf> {
        self.find_named(&self.bundle_dir, kind.asset_name())
    }

    /// Resolve a system sound name against the system sound directories, in order
    pub fn system_sound(&self, name: &str) -> Option<PathBuf> {
        self.system_dirs
            .iter()
            .find_map(|dir| self.find_named(dir, name))
    }

    /// Names of every system sound, without extensions, de-duplicated and sorted
    pub fn list_system_sounds(&self) -> Vec<String> {
        let mut names = BTreeSet::new();

        for dir in &self.system_dirs {
            let entries = match self.file_system.list_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!("Skipping sound directory {}: {}", dir.display(), e);
                    continue;
                }
            };

            for entry in entries {
                if !is_audio_file(&entry) || !self.file_system.file_exists(&entry) {
                    continue;
                }
                if let Some(stem) = entry.file_stem().and_then(|stem| stem.to_str()) {
                    names.insert(stem.to_string());
                }
            }
        }

        names.into_iter().collect()
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        self.file_system.file_exists(path)
    }

    pub fn bundle_dir(&self) -> &Path {
        &self.bundle_dir
    }

    pub fn system_dirs(&self) -> &[PathBuf] {
        &self.system_dirs
    }

    fn find_named(&self, dir: &Path, name: &str) -> Option<PathBuf> {
        AUDIO_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{name}.{ext}")))
            .find(|candidate| self.file_system.file_exists(candidate))
    }
}
