use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::system::traits::{FileSystemInterface, SoundPlayerInterface};

/// Production implementation of FileSystemInterface using std::fs
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFileSystem;

impl FileSystemInterface for StandardFileSystem {
    fn read_file(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))
    }

    /// Writes a sibling temporary file and renames it over `path`, so readers see
    /// either the old or the new content
    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in: {}", dir.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        file.persist(path)
            .with_context(|| format!("Failed to replace file: {}", path.display()))?;
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)
            .with_context(|| format!("Failed to read directory: {}", path.display()))?;

        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    fn modified_time(&self, path: &Path) -> Result<SystemTime> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to get file metadata: {}", path.display()))?;
        metadata.modified().context("Failed to get modified time")
    }
}

/// Production implementation of SoundPlayerInterface using the macOS `afplay` tool
#[derive(Debug, Clone)]
pub struct AfplayPlayer {
    program: PathBuf,
}

impl AfplayPlayer {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("afplay"),
        }
    }
}

impl Default for AfplayPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundPlayerInterface for AfplayPlayer {
    fn play(&self, path: &Path) -> Result<()> {
        debug!("Starting playback of {}", path.display());

        let mut child = Command::new(&self.program)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program.display()))?;

        // Reap the player off the calling thread so playback never blocks the caller
        let played = path.to_path_buf();
        thread::spawn(move || match child.wait() {
            Ok(status) if status.success() => debug!("Finished playing {}", played.display()),
            Ok(status) => warn!("Player exited with {} for {}", status, played.display()),
            Err(e) => warn!("Failed to wait for player: {}", e),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_file_replaces_content_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let fs = StandardFileSystem;

        fs.write_file(&path, "first").unwrap();
        fs.write_file(&path, "second").unwrap();

        assert_eq!(fs.read_file(&path).unwrap(), "second");
        // No temporary files are left next to the target
        assert_eq!(fs.list_dir(dir.path()).unwrap(), vec![path]);
    }

    #[test]
    fn test_write_file_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("settings.toml");

        assert!(StandardFileSystem.write_file(&path, "content").is_err());
        assert!(!StandardFileSystem.file_exists(&path));
    }
}
