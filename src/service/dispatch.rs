use tokio::sync::mpsc;
use tracing::warn;

use crate::preferences::EventKind;
use crate::usb::DeviceEventSink;

/// Work items for the UI context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// One device changed state
    Device(EventKind),
    /// Re-read settings from storage
    ReloadSettings,
    Shutdown,
}

/// Posts work onto the single UI context from any thread
#[derive(Debug, Clone)]
pub struct UiDispatcher {
    sender: mpsc::UnboundedSender<UiEvent>,
}

impl UiDispatcher {
    /// Create the UI queue; the receiver is owned by whoever runs the UI context
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue an event; returns false once the UI context has gone away
    pub fn post(&self, event: UiEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

impl DeviceEventSink for UiDispatcher {
    fn device_event(&self, kind: EventKind) {
        if !self.post(UiEvent::Device(kind)) {
            warn!("UI context has shut down, dropping {} event", kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_post_order() {
        let (dispatcher, mut receiver) = UiDispatcher::channel();

        dispatcher.device_event(EventKind::Connect);
        dispatcher.device_event(EventKind::Disconnect);
        assert!(dispatcher.post(UiEvent::Shutdown));

        assert_eq!(receiver.try_recv().unwrap(), UiEvent::Device(EventKind::Connect));
        assert_eq!(receiver.try_recv().unwrap(), UiEvent::Device(EventKind::Disconnect));
        assert_eq!(receiver.try_recv().unwrap(), UiEvent::Shutdown);
    }

    #[test]
    fn test_post_after_receiver_dropped() {
        let (dispatcher, receiver) = UiDispatcher::channel();
        drop(receiver);

        assert!(!dispatcher.post(UiEvent::ReloadSettings));
        // Must not panic on the notification thread
        dispatcher.device_event(EventKind::Connect);
    }

    #[test]
    fn test_posting_from_another_thread() {
        let (dispatcher, mut receiver) = UiDispatcher::channel();

        let remote = dispatcher.clone();
        std::thread::spawn(move || remote.device_event(EventKind::Disconnect))
            .join()
            .unwrap();

        assert_eq!(
            receiver.try_recv().unwrap(),
            UiEvent::Device(EventKind::Disconnect)
        );
    }
}
