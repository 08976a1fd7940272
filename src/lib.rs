// Ambient Audio - procedural-fallback ambient and UI sound engine
// Gain graph with sample-accurate crossfades, asset cache and preferences

// Module declarations
pub mod assets;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod managers;
pub mod storage;
pub mod telemetry;
pub mod testing;

// Re-exports for convenience
pub use assets::{AmbientCategory, AssetFetcher, CueKind, DefaultFetcher, FileFetcher, SoundKind};
pub use config::SoundConfig;
pub use engine::{OfflineBackend, OutputBackend, SoundEngine, SoundState};
pub use managers::SoundPreference;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use telemetry::SoundEvent;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let config = SoundConfig::default();
        assert_eq!(
            config.assets.url_for(SoundKind::Ambient(AmbientCategory::Default)),
            "/sounds/ambient/default.wav"
        );
    }
}
