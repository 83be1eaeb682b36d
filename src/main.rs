use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{Level, info, warn};

use usb_chime::logging::{LoggingConfig, cleanup_old_logs, initialize_logging};
use usb_chime::notifications::NotificationPresenter;
use usb_chime::service::SignalHandler;
use usb_chime::sound::is_audio_file;
use usb_chime::{
    AfplayPlayer, AppState, EventKind, EventRouter, PreferenceStore, ResolutionOutcome,
    RuntimeConfig, SoundChoice, SoundLibrary, SoundNotifierService, SoundResolver,
    StandardFileSystem,
};

const LOG_RETENTION_DAYS: u64 = 7;

#[derive(Parser)]
#[command(name = "usb-chime")]
#[command(about = "Plays a sound whenever a USB device is connected or disconnected")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Preference file path
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Directory holding the bundled connect/disconnect sounds
    #[arg(long, global = true)]
    assets: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch for USB devices and play sounds (default)
    Run {
        /// Only log to the console
        #[arg(long)]
        no_log_file: bool,
    },
    /// Show the current sound settings
    Status,
    /// Change sound settings
    Set {
        /// Master switch for all sounds
        #[arg(long)]
        enabled: Option<bool>,
        /// Play a sound when a device is connected
        #[arg(long)]
        connect_enabled: Option<bool>,
        /// Play a sound when a device is disconnected
        #[arg(long)]
        disconnect_enabled: Option<bool>,
        /// Sound for connections: builtin, system:<name> or file:<path>
        #[arg(long, value_parser = parse_choice)]
        connect_sound: Option<SoundChoice>,
        /// Sound for disconnections: builtin, system:<name> or file:<path>
        #[arg(long, value_parser = parse_choice)]
        disconnect_sound: Option<SoundChoice>,
    },
    /// List the named system sounds that can be selected
    ListSounds,
    /// Play the configured sound for an event
    Play {
        #[arg(value_enum)]
        event: EventArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EventArg {
    Connect,
    Disconnect,
}

impl From<EventArg> for EventKind {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::Connect => EventKind::Connect,
            EventArg::Disconnect => EventKind::Disconnect,
        }
    }
}

fn parse_choice(value: &str) -> Result<SoundChoice, String> {
    value.parse().map_err(|e: anyhow::Error| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run { no_log_file: false });

    let (level, file_output) = match &command {
        Commands::Run { no_log_file } => (Level::INFO, !no_log_file),
        _ => (Level::WARN, false),
    };
    let (_guard, log_dir) = initialize_logging(LoggingConfig {
        level: if cli.verbose { Level::DEBUG } else { level },
        file_output,
        console_output: true,
        log_dir: None,
        json_format: cli.json_logs,
    })?;

    if let Some(dir) = &log_dir {
        if let Err(e) = cleanup_old_logs(dir, LOG_RETENTION_DAYS) {
            warn!("Failed to clean up old logs: {:#}", e);
        }
    }

    let config = RuntimeConfig::resolve(cli.settings, cli.assets)?;

    match command {
        Commands::Run { .. } => run_service(&config).await,
        Commands::Status => show_status(&config),
        Commands::Set {
            enabled,
            connect_enabled,
            disconnect_enabled,
            connect_sound,
            disconnect_sound,
        } => update_settings(
            &config,
            SettingsChange {
                enabled,
                connect_enabled,
                disconnect_enabled,
                connect_sound,
                disconnect_sound,
            },
        ),
        Commands::ListSounds => list_sounds(&config),
        Commands::Play { event } => play_sound(&config, event.into()),
    }
}

async fn run_service(config: &RuntimeConfig) -> Result<()> {
    info!("Preferences: {}", config.settings_path.display());
    info!("Bundled sounds: {}", config.bundle_dir.display());

    let mut service = SoundNotifierService::new_production(config);

    let signal_handler = SignalHandler::new(service.dispatcher());
    tokio::spawn(async move {
        if let Err(e) = signal_handler.listen_for_signals().await {
            warn!("Signal handler failed: {:#}", e);
        }
    });

    service.run().await
}

fn load_state(config: &RuntimeConfig) -> AppState<StandardFileSystem> {
    AppState::load(PreferenceStore::new_production(config.settings_path.clone()))
}

fn show_status(config: &RuntimeConfig) -> Result<()> {
    let state = load_state(config);
    let settings = state.settings();

    println!("Settings file: {}", state.settings_path().display());
    println!("  Sounds enabled: {}", settings.enabled);
    for kind in EventKind::ALL {
        println!(
            "  {}: {} ({})",
            kind,
            settings.sound_for(kind),
            if settings.is_event_enabled(kind) { "on" } else { "off" }
        );
    }
    Ok(())
}

struct SettingsChange {
    enabled: Option<bool>,
    connect_enabled: Option<bool>,
    disconnect_enabled: Option<bool>,
    connect_sound: Option<SoundChoice>,
    disconnect_sound: Option<SoundChoice>,
}

fn update_settings(config: &RuntimeConfig, change: SettingsChange) -> Result<()> {
    for choice in [&change.connect_sound, &change.disconnect_sound]
        .into_iter()
        .flatten()
    {
        if let SoundChoice::UserFile(path) = choice {
            if !path.is_file() {
                bail!("Sound file does not exist: {}", path.display());
            }
            if !is_audio_file(path) {
                bail!("Not a supported audio file: {}", path.display());
            }
        }
    }

    let mut state = load_state(config);
    state.update(|settings| {
        if let Some(enabled) = change.enabled {
            settings.enabled = enabled;
        }
        if let Some(enabled) = change.connect_enabled {
            settings.set_event_enabled(EventKind::Connect, enabled);
        }
        if let Some(enabled) = change.disconnect_enabled {
            settings.set_event_enabled(EventKind::Disconnect, enabled);
        }
        if let Some(choice) = change.connect_sound {
            settings.set_sound(EventKind::Connect, choice);
        }
        if let Some(choice) = change.disconnect_sound {
            settings.set_sound(EventKind::Disconnect, choice);
        }
    });

    println!("Settings saved to {}", state.settings_path().display());
    Ok(())
}

fn list_sounds(config: &RuntimeConfig) -> Result<()> {
    let library = SoundLibrary::new(
        StandardFileSystem,
        config.bundle_dir.clone(),
        config.system_sound_dirs.clone(),
    );

    let sounds = library.list_system_sounds();
    println!("Available system sounds:");
    if sounds.is_empty() {
        println!("  No system sounds found!");
    }
    for name in sounds {
        println!("  system:{}", name);
    }
    Ok(())
}

fn play_sound(config: &RuntimeConfig, kind: EventKind) -> Result<()> {
    let mut state = load_state(config);
    let library = SoundLibrary::new(
        StandardFileSystem,
        config.bundle_dir.clone(),
        config.system_sound_dirs.clone(),
    );
    let router = EventRouter::new(
        SoundResolver::new(AfplayPlayer::new(), library),
        NotificationPresenter::default(),
    );

    match router.play_configured(&mut state, kind) {
        ResolutionOutcome::Played(path) => println!("Playing {}", path.display()),
        ResolutionOutcome::Skipped => println!("No playable sound for {}", kind),
        ResolutionOutcome::RevertedToDefault { missing } => println!(
            "{} no longer exists; {} sound reset to default",
            missing.display(),
            kind
        ),
    }
    Ok(())
}
