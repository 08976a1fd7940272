// PreferenceManager: Focused manager for sound preference persistence
//
// Single Responsibility: load/save {enabled, volume} through a KeyValueStore
// Persistence is best-effort; failures are logged and swallowed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::PreferenceConfig;
use crate::error::{log_storage_error, StorageError};
use crate::storage::KeyValueStore;

/// User loudness preference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundPreference {
    pub enabled: bool,
    /// Always within [0, 1] once it has passed through the manager
    pub volume: f32,
}

impl SoundPreference {
    pub fn new(enabled: bool, volume: f32) -> Self {
        Self { enabled, volume }
    }

    /// Copy with the volume clamped to [0, 1].
    pub fn clamped(self) -> Self {
        Self {
            enabled: self.enabled,
            volume: clamp_volume(self.volume),
        }
    }

    /// Gain the master stage should sit at for this preference
    pub fn master_gain(&self) -> f32 {
        if self.enabled {
            self.volume
        } else {
            0.0
        }
    }
}

/// Clamp a volume to [0, 1]. Callers must reject non-finite values first.
#[inline]
pub fn clamp_volume(volume: f32) -> f32 {
    volume.clamp(0.0, 1.0)
}

/// Stored shape; fields may be missing in older or hand-edited blobs
#[derive(Deserialize)]
struct StoredPreference {
    enabled: Option<bool>,
    volume: Option<f64>,
}

/// Manages the persisted sound preference
///
/// Single Responsibility: Preference persistence
///
/// This manager handles:
/// - Reading the preference blob at start-up, falling back to defaults
/// - Writing the blob after every mutation
/// - Clamping volume on the way in and out
///
/// # Example
/// ```ignore
/// let manager = PreferenceManager::new(store, &config.preferences);
/// let mut pref = manager.load();
/// pref.volume = 0.42;
/// manager.save(&pref);
/// ```
pub struct PreferenceManager {
    store: Arc<dyn KeyValueStore>,
    key: String,
    defaults: SoundPreference,
}

impl PreferenceManager {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &PreferenceConfig) -> Self {
        let default_volume = if config.default_volume.is_finite() {
            clamp_volume(config.default_volume)
        } else {
            0.7
        };
        Self {
            store,
            key: config.storage_key.clone(),
            defaults: SoundPreference::new(config.default_enabled, default_volume),
        }
    }

    pub fn defaults(&self) -> SoundPreference {
        self.defaults
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted preference.
    ///
    /// Missing or corrupt data yields the defaults; never fails.
    pub fn load(&self) -> SoundPreference {
        match self.try_load() {
            Ok(Some(pref)) => pref,
            Ok(None) => self.defaults,
            Err(err) => {
                log_storage_error(&err, "load_preferences");
                self.defaults
            }
        }
    }

    fn try_load(&self) -> Result<Option<SoundPreference>, StorageError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        let stored: StoredPreference = serde_json::from_str(&raw)?;

        let volume = match stored.volume {
            Some(v) if v.is_finite() => clamp_volume(v as f32),
            Some(v) => {
                log::warn!("[PreferenceManager] Ignoring stored volume {}", v);
                self.defaults.volume
            }
            None => self.defaults.volume,
        };

        Ok(Some(SoundPreference {
            enabled: stored.enabled.unwrap_or(self.defaults.enabled),
            volume,
        }))
    }

    /// Persist `pref` (clamped). Failures are logged and swallowed.
    pub fn save(&self, pref: &SoundPreference) {
        if let Err(err) = self.try_save(pref) {
            log_storage_error(&err, "save_preferences");
        }
    }

    fn try_save(&self, pref: &SoundPreference) -> Result<(), StorageError> {
        let blob = serde_json::to_string(&pref.clamped())?;
        self.store.set(&self.key, &blob)
    }

    /// Forget the persisted preference.
    pub fn clear(&self) {
        if let Err(err) = self.store.remove(&self.key) {
            log_storage_error(&err, "clear_preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::FailingStore;

    fn manager_with(store: Arc<dyn KeyValueStore>) -> PreferenceManager {
        PreferenceManager::new(store, &PreferenceConfig::default())
    }

    #[test]
    fn test_defaults_when_nothing_stored() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let pref = manager.load();
        assert!(!pref.enabled);
        assert!((pref.volume - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());
        manager.save(&SoundPreference::new(true, 0.42));

        let reloaded = manager_with(store.clone()).load();
        assert!(reloaded.enabled);
        assert_eq!(reloaded.volume, 0.42);

        let raw = store.get("sound-preferences").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["enabled"], true);
        assert!(json.get("volume").is_some());
    }

    #[test]
    fn test_clear_forgets_stored_preference() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());
        manager.save(&SoundPreference::new(true, 0.2));
        manager.clear();

        assert_eq!(store.get("sound-preferences").unwrap(), None);
        assert_eq!(manager.load(), manager.defaults());
    }

    #[test]
    fn test_clear_with_failing_store_is_swallowed() {
        let manager = manager_with(Arc::new(FailingStore));
        manager.clear();
    }

    #[test]
    fn test_save_clamps() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store);
        manager.save(&SoundPreference::new(true, 5.0));
        assert_eq!(manager.load().volume, 1.0);
        manager.save(&SoundPreference::new(true, -1.0));
        assert_eq!(manager.load().volume, 0.0);
    }

    #[test]
    fn test_load_clamps_out_of_range_stored_volume() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("sound-preferences", r#"{"enabled":true,"volume":3.5}"#)
            .unwrap();
        assert_eq!(manager_with(store).load().volume, 1.0);
    }

    #[test]
    fn test_corrupt_blob_yields_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set("sound-preferences", "{{{").unwrap();
        let pref = manager_with(store).load();
        assert_eq!(pref, SoundPreference::new(false, 0.7));
    }

    #[test]
    fn test_partial_blob_fills_from_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.set("sound-preferences", r#"{"enabled":true}"#).unwrap();
        let pref = manager_with(store).load();
        assert!(pref.enabled);
        assert!((pref.volume - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_failing_store_is_swallowed() {
        let manager = manager_with(Arc::new(FailingStore));
        manager.save(&SoundPreference::new(true, 0.5));
        assert_eq!(manager.load(), SoundPreference::new(false, 0.7));
        manager.clear();
    }

    #[test]
    fn test_master_gain_follows_enabled() {
        assert_eq!(SoundPreference::new(false, 0.8).master_gain(), 0.0);
        assert_eq!(SoundPreference::new(true, 0.8).master_gain(), 0.8);
    }
}
