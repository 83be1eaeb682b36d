pub mod store;
pub mod types;

pub use store::{PREFERENCE_KEY, PreferenceStore};
pub use types::{EventKind, SoundChoice, SoundSettings};
