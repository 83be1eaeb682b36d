use anyhow::Result;
use signal_hook::consts::signal::*;
use signal_hook_tokio::Signals;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use super::dispatch::{UiDispatcher, UiEvent};

/// UI event a process signal translates to
pub fn event_for_signal(signal: i32) -> Option<UiEvent> {
    match signal {
        SIGTERM | SIGINT => Some(UiEvent::Shutdown),
        SIGHUP => Some(UiEvent::ReloadSettings),
        _ => None,
    }
}

/// Forwards SIGTERM/SIGINT (shutdown) and SIGHUP (settings reload) to the UI context
pub struct SignalHandler {
    dispatcher: UiDispatcher,
}

impl SignalHandler {
    pub fn new(dispatcher: UiDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Listen until a shutdown signal arrives or the UI context goes away
    pub async fn listen_for_signals(self) -> Result<()> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGHUP])?;
        let handle = signals.handle();

        info!("Signal handler initialized, listening for SIGTERM, SIGINT, SIGHUP");

        while let Some(signal) = signals.next().await {
            let Some(event) = event_for_signal(signal) else {
                warn!("Received unexpected signal: {}", signal);
                continue;
            };

            info!("Received signal {}, posting {:?}", signal, event);
            if !self.dispatcher.post(event) {
                warn!("UI context has shut down, no longer forwarding signals");
                break;
            }
            if event == UiEvent::Shutdown {
                break;
            }
        }

        handle.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_mapping() {
        assert_eq!(event_for_signal(SIGTERM), Some(UiEvent::Shutdown));
        assert_eq!(event_for_signal(SIGINT), Some(UiEvent::Shutdown));
        assert_eq!(event_for_signal(SIGHUP), Some(UiEvent::ReloadSettings));
        assert_eq!(event_for_signal(SIGUSR1), None);
    }
}
