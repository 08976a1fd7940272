// Managers Module
//
// Focused managers the SoundEngine composes, one concern each:
// - PreferenceManager: persisted {enabled, volume}
// - AmbientManager: ambient session and crossfade protocol
// - CueManager: one-shot UI cues

pub mod ambient_manager;
pub mod cue_manager;
pub mod preference_manager;

pub use ambient_manager::{AmbientManager, AmbientSession, AmbientTransition};
pub use cue_manager::CueManager;
pub use preference_manager::{clamp_volume, PreferenceManager, SoundPreference};
