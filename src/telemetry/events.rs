//! Engine event types published to collaborators that want to observe
//! playback without polling `get_state()`.

use serde::{Deserialize, Serialize};

use crate::assets::{AmbientCategory, CueKind};

/// Events emitted by the sound engine.
///
/// `at_ms` is milliseconds since the engine was created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SoundEvent {
    Initialized {
        sample_rate: u32,
        at_ms: u64,
    },
    InitializationFailed {
        reason: String,
        at_ms: u64,
    },
    AmbientStarted {
        category: AmbientCategory,
        crossfade_ms: u64,
        at_ms: u64,
    },
    AmbientStopped {
        category: AmbientCategory,
        fade_ms: u64,
        at_ms: u64,
    },
    CuePlayed {
        cue: CueKind,
        at_ms: u64,
    },
    PreferencesChanged {
        enabled: bool,
        volume: f32,
        at_ms: u64,
    },
    Disposed {
        at_ms: u64,
    },
}

impl SoundEvent {
    pub fn at_ms(&self) -> u64 {
        match self {
            SoundEvent::Initialized { at_ms, .. }
            | SoundEvent::InitializationFailed { at_ms, .. }
            | SoundEvent::AmbientStarted { at_ms, .. }
            | SoundEvent::AmbientStopped { at_ms, .. }
            | SoundEvent::CuePlayed { at_ms, .. }
            | SoundEvent::PreferencesChanged { at_ms, .. }
            | SoundEvent::Disposed { at_ms } => *at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = SoundEvent::AmbientStarted {
            category: AmbientCategory::City,
            crossfade_ms: 2000,
            at_ms: 12,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ambient_started");
        assert_eq!(json["payload"]["category"], "city");
        assert_eq!(event.at_ms(), 12);
    }
}
