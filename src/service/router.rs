use tracing::{debug, info};

use crate::preferences::{EventKind, SoundChoice};
use crate::sound::{ResolutionOutcome, SoundResolver};
use crate::system::{
    FileSystemInterface, PresentationInterface, RebuildReason, SoundPlayerInterface,
};

use super::state::AppState;

/// Routes genuine device events to the sound resolver using the current settings
pub struct EventRouter<P, F, R>
where
    P: SoundPlayerInterface,
    F: FileSystemInterface,
    R: PresentationInterface,
{
    resolver: SoundResolver<P, F>,
    presenter: R,
}

impl<P, F, R> EventRouter<P, F, R>
where
    P: SoundPlayerInterface,
    F: FileSystemInterface,
    R: PresentationInterface,
{
    pub fn new(resolver: SoundResolver<P, F>, presenter: R) -> Self {
        Self {
            resolver,
            presenter,
        }
    }

    /// Play the configured sound for `kind`.
    ///
    /// Returns `None` when the master or per-event switch is off. A missing user file
    /// resets that event to the bundled sound (persisted once) and asks the
    /// presentation to rebuild.
    pub fn on_device_event(
        &self,
        state: &mut AppState<F>,
        kind: EventKind,
    ) -> Option<ResolutionOutcome> {
        if !state.settings().is_event_enabled(kind) {
            debug!("{} sound disabled, ignoring event", kind);
            return None;
        }

        Some(self.play_configured(state, kind))
    }

    /// Resolve and play the sound configured for `kind`, ignoring the enable switches
    pub fn play_configured(&self, state: &mut AppState<F>, kind: EventKind) -> ResolutionOutcome {
        let choice = state.settings().sound_for(kind).clone();
        let outcome = self.resolver.resolve_and_play(&choice, kind);

        if let ResolutionOutcome::RevertedToDefault { missing } = &outcome {
            info!("Resetting {} sound to default", kind);
            state.update(|settings| settings.set_sound(kind, SoundChoice::Builtin));
            self.presenter.rebuild(
                state.settings(),
                &RebuildReason::SoundReverted {
                    kind,
                    missing: missing.clone(),
                },
            );
        }

        outcome
    }

    pub fn resolver(&self) -> &SoundResolver<P, F> {
        &self.resolver
    }

    pub fn presenter(&self) -> &R {
        &self.presenter
    }
}
