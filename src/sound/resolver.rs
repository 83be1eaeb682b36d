use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::preferences::{EventKind, SoundChoice};
use crate::system::{FileSystemInterface, SoundPlayerInterface};

use super::library::SoundLibrary;

/// What happened when a sound choice was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Playback was started for this file
    Played(PathBuf),
    /// Nothing was played and nothing needs to change
    Skipped,
    /// The user file is gone; the event must fall back to the bundled sound
    RevertedToDefault { missing: PathBuf },
}

/// Turns a stored sound choice into playback
pub struct SoundResolver<P: SoundPlayerInterface, F: FileSystemInterface> {
    player: P,
    library: SoundLibrary<F>,
}

impl<P: SoundPlayerInterface, F: FileSystemInterface> SoundResolver<P, F> {
    pub fn new(player: P, library: SoundLibrary<F>) -> Self {
        Self { player, library }
    }

    /// Play the sound `choice` refers to. Never fails: every miss degrades to no sound.
    ///
    /// A missing user file is reported as [`ResolutionOutcome::RevertedToDefault`] and
    /// left for the caller to persist; the resolver itself does not touch settings.
    pub fn resolve_and_play(&self, choice: &SoundChoice, kind: EventKind) -> ResolutionOutcome {
        match choice {
            SoundChoice::Builtin => match self.library.bundled_asset(kind) {
                Some(asset) => self.play(&asset),
                None => {
                    warn!(
                        "Bundled '{}' sound is missing from {}",
                        kind.asset_name(),
                        self.library.bundle_dir().display()
                    );
                    ResolutionOutcome::Skipped
                }
            },
            SoundChoice::System(name) => match self.library.system_sound(name) {
                Some(sound) => self.play(&sound),
                None => {
                    // May come back after an OS update, so the choice is kept
                    debug!("System sound '{}' not found, skipping", name);
                    ResolutionOutcome::Skipped
                }
            },
            SoundChoice::UserFile(path) => {
                if self.library.file_exists(path) {
                    self.play(path)
                } else {
                    info!(
                        "{} sound {} no longer exists, reverting to default",
                        kind,
                        path.display()
                    );
                    ResolutionOutcome::RevertedToDefault {
                        missing: path.clone(),
                    }
                }
            }
        }
    }

    pub fn library(&self) -> &SoundLibrary<F> {
        &self.library
    }

    /// Get reference to the player (for testing)
    #[cfg(any(test, feature = "test-mocks"))]
    pub fn get_player(&self) -> &P {
        &self.player
    }

    fn play(&self, path: &Path) -> ResolutionOutcome {
        match self.player.play(path) {
            Ok(()) => {
                debug!("Playing {}", path.display());
                ResolutionOutcome::Played(path.to_path_buf())
            }
            Err(e) => {
                warn!("Failed to play {}: {:#}", path.display(), e);
                ResolutionOutcome::Skipped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{MockFileSystem, MockSoundPlayer};

    fn resolver(
        mock_fs: &MockFileSystem,
        player: &MockSoundPlayer,
    ) -> SoundResolver<MockSoundPlayer, MockFileSystem> {
        let library = SoundLibrary::new(
            mock_fs.clone(),
            PathBuf::from("/App/Resources"),
            vec![PathBuf::from("/System/Library/Sounds")],
        );
        SoundResolver::new(player.clone(), library)
    }

    #[test]
    fn test_builtin_plays_asset_for_event() {
        let mock_fs = MockFileSystem::new();
        mock_fs.add_file("/App/Resources/connect.aiff", "");
        mock_fs.add_file("/App/Resources/disconnect.aiff", "");
        let player = MockSoundPlayer::new();
        let resolver = resolver(&mock_fs, &player);

        let outcome = resolver.resolve_and_play(&SoundChoice::Builtin, EventKind::Disconnect);

        assert_eq!(
            outcome,
            ResolutionOutcome::Played(PathBuf::from("/App/Resources/disconnect.aiff"))
        );
        assert_eq!(
            player.get_played(),
            vec![PathBuf::from("/App/Resources/disconnect.aiff")]
        );
    }

    #[test]
    fn test_missing_builtin_asset_is_skipped() {
        let mock_fs = MockFileSystem::new();
        let player = MockSoundPlayer::new();
        let resolver = resolver(&mock_fs, &player);

        let outcome = resolver.resolve_and_play(&SoundChoice::Builtin, EventKind::Connect);

        assert_eq!(outcome, ResolutionOutcome::Skipped);
        assert!(player.get_played().is_empty());
    }

    #[test]
    fn test_system_sound_found() {
        let mock_fs = MockFileSystem::new();
        mock_fs.add_file("/System/Library/Sounds/Glass.aiff", "");
        let player = MockSoundPlayer::new();
        let resolver = resolver(&mock_fs, &player);

        let outcome =
            resolver.resolve_and_play(&SoundChoice::System("Glass".to_string()), EventKind::Connect);

        assert_eq!(
            outcome,
            ResolutionOutcome::Played(PathBuf::from("/System/Library/Sounds/Glass.aiff"))
        );
    }

    #[test]
    fn test_missing_system_sound_is_transient() {
        let mock_fs = MockFileSystem::new();
        let player = MockSoundPlayer::new();
        let resolver = resolver(&mock_fs, &player);

        let outcome =
            resolver.resolve_and_play(&SoundChoice::System("Glass".to_string()), EventKind::Connect);

        assert_eq!(outcome, ResolutionOutcome::Skipped);
        assert!(player.get_played().is_empty());
    }

    #[test]
    fn test_existing_user_file_is_played() {
        let mock_fs = MockFileSystem::new();
        mock_fs.add_file("/Users/me/plug.wav", "");
        let player = MockSoundPlayer::new();
        let resolver = resolver(&mock_fs, &player);

        let choice = SoundChoice::UserFile(PathBuf::from("/Users/me/plug.wav"));
        let outcome = resolver.resolve_and_play(&choice, EventKind::Connect);

        assert_eq!(
            outcome,
            ResolutionOutcome::Played(PathBuf::from("/Users/me/plug.wav"))
        );
    }

    #[test]
    fn test_missing_user_file_reverts() {
        let mock_fs = MockFileSystem::new();
        // The bundled asset exists but is not played on a reversion
        mock_fs.add_file("/App/Resources/connect.aiff", "");
        let player = MockSoundPlayer::new();
        let resolver = resolver(&mock_fs, &player);

        let choice = SoundChoice::UserFile(PathBuf::from("/Users/me/gone.wav"));
        let outcome = resolver.resolve_and_play(&choice, EventKind::Connect);

        assert_eq!(
            outcome,
            ResolutionOutcome::RevertedToDefault {
                missing: PathBuf::from("/Users/me/gone.wav")
            }
        );
        assert!(player.get_played().is_empty());
        assert!(mock_fs.get_write_calls().is_empty());
    }

    #[test]
    fn test_player_failure_degrades_to_skipped() {
        let mock_fs = MockFileSystem::new();
        mock_fs.add_file("/App/Resources/connect.aiff", "");
        let player = MockSoundPlayer::new();
        player.set_play_failure(true);
        let resolver = resolver(&mock_fs, &player);

        let outcome = resolver.resolve_and_play(&SoundChoice::Builtin, EventKind::Connect);

        assert_eq!(outcome, ResolutionOutcome::Skipped);
        assert!(resolver.get_player().get_played().is_empty());
        assert_eq!(
            resolver.library().bundle_dir(),
            Path::new("/App/Resources")
        );
    }
}
