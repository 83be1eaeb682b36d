pub mod library;
pub mod resolver;

pub use library::{AUDIO_EXTENSIONS, SoundLibrary, is_audio_file};
pub use resolver::{ResolutionOutcome, SoundResolver};
