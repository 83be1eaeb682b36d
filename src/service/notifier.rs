use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::RuntimeConfig;
use crate::preferences::PreferenceStore;
use crate::sound::{SoundLibrary, SoundResolver};
use crate::system::{
    DeviceNotificationInterface, FileSystemInterface, PresentationInterface, RebuildReason,
    SoundPlayerInterface,
};
use crate::usb::{DeviceWatcher, WatcherState};

use super::dispatch::{UiDispatcher, UiEvent};
use super::router::EventRouter;
use super::state::AppState;

/// USB sound service with dependency injection for complete testability
///
/// The task that drives [`SoundNotifierService::process_events`] is the UI context:
/// it is the only place settings are read or written and sounds are started.
pub struct SoundNotifierService<N, P, F, R>
where
    N: DeviceNotificationInterface,
    P: SoundPlayerInterface,
    F: FileSystemInterface,
    R: PresentationInterface,
{
    watcher: DeviceWatcher<N>,
    state: AppState<F>,
    router: EventRouter<P, F, R>,
    dispatcher: UiDispatcher,
    events: mpsc::UnboundedReceiver<UiEvent>,
}

impl<N, P, F, R> SoundNotifierService<N, P, F, R>
where
    N: DeviceNotificationInterface,
    P: SoundPlayerInterface,
    F: FileSystemInterface + Clone,
    R: PresentationInterface,
{
    pub fn new(
        notifications: N,
        player: P,
        file_system: F,
        presenter: R,
        config: &RuntimeConfig,
    ) -> Self {
        let store = PreferenceStore::new(file_system.clone(), config.settings_path.clone());
        let state = AppState::load(store);

        let library = SoundLibrary::new(
            file_system,
            config.bundle_dir.clone(),
            config.system_sound_dirs.clone(),
        );
        let router = EventRouter::new(SoundResolver::new(player, library), presenter);
        let (dispatcher, events) = UiDispatcher::channel();

        Self {
            watcher: DeviceWatcher::new(notifications),
            state,
            router,
            dispatcher,
            events,
        }
    }

    /// Sender for posting work onto this service's UI context
    pub fn dispatcher(&self) -> UiDispatcher {
        self.dispatcher.clone()
    }

    /// Start watching, process events until shutdown, then stop watching
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting USB sound service");

        self.start_watching();
        self.process_events().await;

        if let Err(e) = self.watcher.stop() {
            error!("Failed to stop device watcher: {:#}", e);
        }

        info!("USB sound service stopped");
        Ok(())
    }

    /// Subscribe to device notifications; failure leaves device sounds off
    pub fn start_watching(&mut self) -> WatcherState {
        let state = self.watcher.start(Arc::new(self.dispatcher.clone()));
        if state == WatcherState::Unavailable {
            warn!("Continuing without USB device sounds");
        }
        state
    }

    /// Consume UI events until a shutdown is requested
    pub async fn process_events(&mut self) {
        while let Some(event) = self.events.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
    }

    /// Handle one UI event; returns false when the service should stop
    pub fn handle_event(&mut self, event: UiEvent) -> bool {
        match event {
            UiEvent::Device(kind) => {
                // Pick up edits made by another process before reading settings
                self.state.refresh_if_modified();
                let outcome = self.router.on_device_event(&mut self.state, kind);
                debug!("{} event handled: {:?}", kind, outcome);
                true
            }
            UiEvent::ReloadSettings => {
                self.state.reload();
                self.router
                    .presenter()
                    .rebuild(self.state.settings(), &RebuildReason::SettingsReloaded);
                true
            }
            UiEvent::Shutdown => {
                info!("Shutdown requested");
                false
            }
        }
    }

    pub fn state(&self) -> &AppState<F> {
        &self.state
    }

    pub fn watcher_state(&self) -> WatcherState {
        self.watcher.state()
    }

    /// Access the router (for testing)
    #[cfg(any(test, feature = "test-mocks"))]
    pub fn router(&self) -> &EventRouter<P, F, R> {
        &self.router
    }
}

// Convenience constructor for production use
impl
    SoundNotifierService<
        crate::usb::PlatformNotifications,
        crate::system::AfplayPlayer,
        crate::system::StandardFileSystem,
        crate::notifications::NotificationPresenter,
    >
{
    pub fn new_production(config: &RuntimeConfig) -> Self {
        Self::new(
            crate::usb::PlatformNotifications::default(),
            crate::system::AfplayPlayer::new(),
            crate::system::StandardFileSystem,
            crate::notifications::NotificationPresenter::default(),
            config,
        )
    }
}
