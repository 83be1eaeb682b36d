pub mod dispatch;
pub mod notifier;
pub mod router;
pub mod signals;
pub mod state;

pub use dispatch::{UiDispatcher, UiEvent};
pub use notifier::SoundNotifierService;
pub use router::EventRouter;
pub use signals::SignalHandler;
pub use state::AppState;
