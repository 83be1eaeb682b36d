use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, info, warn};

use crate::preferences::SoundSettings;
use crate::system::{PresentationInterface, RebuildReason};

/// Trait for sending notifications - allows for testing without system calls
pub trait NotificationSender {
    fn send(&self, title: &str, body: &str) -> Result<()>;
}

/// Production notification sender using macOS osascript
#[derive(Debug, Clone)]
pub struct MacOSNotificationSender {
    program: PathBuf,
}

impl MacOSNotificationSender {
    pub fn new() -> Self {
        Self::with_program("osascript")
    }

    /// Sender that runs `program` in place of osascript
    pub fn with_program<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for MacOSNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSender for MacOSNotificationSender {
    /// Starts osascript and returns; its exit status is collected off the caller's thread
    fn send(&self, title: &str, body: &str) -> Result<()> {
        let child = Command::new(&self.program)
            .args(["-e", &notification_script(title, body)])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program.display()))?;

        thread::spawn(move || match child.wait_with_output() {
            Ok(output) if output.status.success() => debug!("Notification delivered"),
            Ok(output) => warn!(
                "osascript failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Failed to wait for osascript: {}", e),
        });

        Ok(())
    }
}

/// Test notification sender that doesn't actually send notifications
#[cfg(any(test, feature = "test-mocks"))]
#[derive(Clone, Default)]
pub struct TestNotificationSender {
    pub sent_notifications: std::sync::Arc<std::sync::Mutex<Vec<(String, String)>>>,
}

#[cfg(any(test, feature = "test-mocks"))]
impl TestNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_sent_notifications(&self) -> Vec<(String, String)> {
        self.sent_notifications.lock().unwrap().clone()
    }
}

#[cfg(any(test, feature = "test-mocks"))]
impl NotificationSender for TestNotificationSender {
    fn send(&self, title: &str, body: &str) -> Result<()> {
        debug!("Test notification: {} - {}", title, body);
        self.sent_notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Presentation collaborator for a headless process: tells the user through a
/// system notification when a custom sound had to be reset
pub struct NotificationPresenter<T: NotificationSender = MacOSNotificationSender> {
    sender: T,
}

impl<T: NotificationSender> NotificationPresenter<T> {
    pub fn new(sender: T) -> Self {
        Self { sender }
    }
}

impl Default for NotificationPresenter {
    fn default() -> Self {
        Self::new(MacOSNotificationSender::new())
    }
}

impl<T: NotificationSender> PresentationInterface for NotificationPresenter<T> {
    fn rebuild(&self, settings: &SoundSettings, reason: &RebuildReason) {
        match reason {
            RebuildReason::SoundReverted { kind, missing } => {
                let title = "USB Chime";
                let body = format!(
                    "{} sound reset to default: {} no longer exists",
                    kind,
                    missing.display()
                );

                if let Err(e) = self.sender.send(title, &body) {
                    warn!("Failed to send sound reset notification: {}", e);
                } else {
                    info!("Sent sound reset notification for {} event", kind);
                }
            }
            RebuildReason::SettingsReloaded => {
                debug!(
                    "Settings reloaded: enabled={} connect={} disconnect={}",
                    settings.enabled, settings.connect_sound, settings.disconnect_sound
                );
            }
        }
    }
}

/// AppleScript posting a native notification (more reliable for unsigned apps)
fn notification_script(title: &str, body: &str) -> String {
    format!(
        r#"display notification "{}" with title "{}""#,
        escape_applescript(body),
        escape_applescript(title)
    )
}

fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::EventKind;

    #[test]
    fn test_reverted_sound_sends_notification() {
        let sender = TestNotificationSender::new();
        let presenter = NotificationPresenter::new(sender.clone());

        presenter.rebuild(
            &SoundSettings::default(),
            &RebuildReason::SoundReverted {
                kind: EventKind::Disconnect,
                missing: PathBuf::from("/Users/me/unplug.wav"),
            },
        );

        let sent = sender.get_sent_notifications();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("Disconnect sound reset"));
        assert!(sent[0].1.contains("/Users/me/unplug.wav"));
    }

    #[test]
    fn test_reload_is_silent() {
        let sender = TestNotificationSender::new();
        let presenter = NotificationPresenter::new(sender.clone());

        presenter.rebuild(&SoundSettings::default(), &RebuildReason::SettingsReloaded);

        assert!(sender.get_sent_notifications().is_empty());
    }

    #[test]
    fn test_script_escapes_quotes_and_backslashes() {
        assert_eq!(
            notification_script(r#"USB "Chime""#, r"C:\sounds"),
            r#"display notification "C:\\sounds" with title "USB \"Chime\"""#
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_send_returns_before_osascript_exits() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::{Duration, Instant};

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("slow-osascript");
        std::fs::write(&program, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let sender = MacOSNotificationSender::with_program(&program);
        let started = Instant::now();
        sender.send("USB Chime", "Connect sound reset").unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let sender = MacOSNotificationSender::with_program("/nonexistent/osascript");
        assert!(sender.send("USB Chime", "body").is_err());
    }
}
