use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which side of a device transition an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Connect,
    Disconnect,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Connect, EventKind::Disconnect];

    /// Logical name of the bundled asset played for `SoundChoice::Builtin`
    pub fn asset_name(self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Disconnect => "disconnect",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            EventKind::Connect => 0,
            EventKind::Disconnect => 1,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Connect => write!(f, "Connect"),
            EventKind::Disconnect => write!(f, "Disconnect"),
        }
    }
}

/// The sound configured for one event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SoundChoice {
    /// Asset shipped with the application
    #[default]
    Builtin,
    /// Sound looked up by name in the system sound directories
    System(String),
    /// Absolute path picked by the user
    UserFile(PathBuf),
}

impl SoundChoice {
    pub fn is_builtin(&self) -> bool {
        matches!(self, SoundChoice::Builtin)
    }
}

impl fmt::Display for SoundChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundChoice::Builtin => write!(f, "builtin"),
            SoundChoice::System(name) => write!(f, "system:{name}"),
            SoundChoice::UserFile(path) => write!(f, "file:{}", path.display()),
        }
    }
}

impl FromStr for SoundChoice {
    type Err = anyhow::Error;

    /// Parses `builtin`, `system:<name>` or `file:<absolute path>`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("builtin") {
            return Ok(SoundChoice::Builtin);
        }

        if let Some(name) = s.strip_prefix("system:") {
            let name = name.trim();
            if name.is_empty() {
                bail!("System sound name must not be empty");
            }
            return Ok(SoundChoice::System(name.to_string()));
        }

        if let Some(path) = s.strip_prefix("file:") {
            let path = Path::new(path.trim());
            if !path.is_absolute() {
                bail!("Sound file path must be absolute: {}", path.display());
            }
            return Ok(SoundChoice::UserFile(path.to_path_buf()));
        }

        bail!("Unrecognised sound choice '{s}' (expected builtin, system:<name> or file:<path>)")
    }
}

/// Persisted per-user sound preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoundSettings {
    /// Master switch
    pub enabled: bool,
    pub connect_enabled: bool,
    pub disconnect_enabled: bool,
    pub connect_sound: SoundChoice,
    pub disconnect_sound: SoundChoice,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            connect_enabled: true,
            disconnect_enabled: true,
            connect_sound: SoundChoice::Builtin,
            disconnect_sound: SoundChoice::Builtin,
        }
    }
}

impl SoundSettings {
    /// True when both the master switch and the per-event switch are on
    pub fn is_event_enabled(&self, kind: EventKind) -> bool {
        self.enabled
            && match kind {
                EventKind::Connect => self.connect_enabled,
                EventKind::Disconnect => self.disconnect_enabled,
            }
    }

    pub fn set_event_enabled(&mut self, kind: EventKind, enabled: bool) {
        match kind {
            EventKind::Connect => self.connect_enabled = enabled,
            EventKind::Disconnect => self.disconnect_enabled = enabled,
        }
    }

    pub fn sound_for(&self, kind: EventKind) -> &SoundChoice {
        match kind {
            EventKind::Connect => &self.connect_sound,
            EventKind::Disconnect => &self.disconnect_sound,
        }
    }

    pub fn set_sound(&mut self, kind: EventKind, choice: SoundChoice) {
        match kind {
            EventKind::Connect => self.connect_sound = choice,
            EventKind::Disconnect => self.disconnect_sound = choice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SoundSettings::default();

        assert!(settings.enabled);
        assert!(settings.connect_enabled);
        assert!(settings.disconnect_enabled);
        assert_eq!(settings.connect_sound, SoundChoice::Builtin);
        assert_eq!(settings.disconnect_sound, SoundChoice::Builtin);
    }

    #[test]
    fn test_master_switch_overrides_event_switch() {
        let mut settings = SoundSettings::default();
        assert!(settings.is_event_enabled(EventKind::Connect));

        settings.enabled = false;
        assert!(!settings.is_event_enabled(EventKind::Connect));
        assert!(!settings.is_event_enabled(EventKind::Disconnect));

        settings.enabled = true;
        settings.set_event_enabled(EventKind::Disconnect, false);
        assert!(settings.is_event_enabled(EventKind::Connect));
        assert!(!settings.is_event_enabled(EventKind::Disconnect));
    }

    #[test]
    fn test_set_sound_only_touches_one_event() {
        let mut settings = SoundSettings::default();
        settings.set_sound(EventKind::Disconnect, SoundChoice::System("Basso".to_string()));

        assert_eq!(settings.sound_for(EventKind::Connect), &SoundChoice::Builtin);
        assert_eq!(
            settings.sound_for(EventKind::Disconnect),
            &SoundChoice::System("Basso".to_string())
        );
    }

    #[test]
    fn test_parse_sound_choices() {
        assert_eq!("builtin".parse::<SoundChoice>().unwrap(), SoundChoice::Builtin);
        assert_eq!(
            "system:Glass".parse::<SoundChoice>().unwrap(),
            SoundChoice::System("Glass".to_string())
        );
        assert_eq!(
            "file:/Users/me/beep.wav".parse::<SoundChoice>().unwrap(),
            SoundChoice::UserFile(PathBuf::from("/Users/me/beep.wav"))
        );
    }

    #[test]
    fn test_parse_rejects_bad_choices() {
        assert!("file:relative/beep.wav".parse::<SoundChoice>().is_err());
        assert!("system:".parse::<SoundChoice>().is_err());
        assert!("chime".parse::<SoundChoice>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for choice in [
            SoundChoice::Builtin,
            SoundChoice::System("Submarine".to_string()),
            SoundChoice::UserFile(PathBuf::from("/tmp/plug in.aiff")),
        ] {
            let text = choice.to_string();
            assert_eq!(text.parse::<SoundChoice>().unwrap(), choice);
        }
    }

    #[test]
    fn test_asset_names() {
        assert_eq!(EventKind::Connect.asset_name(), "connect");
        assert_eq!(EventKind::Disconnect.asset_name(), "disconnect");
    }
}
