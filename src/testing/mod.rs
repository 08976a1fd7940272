//! Testability harness utilities.
//!
//! Deterministic stand-ins for the engine's collaborators: a fetcher whose
//! responses and timing are scripted per URL, a store that always fails, and
//! a rig wiring a [`SoundEngine`] to the offline backend. Used by unit tests,
//! the `tests/` suites and the CLI's offline renderer.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Semaphore;

use crate::assets::AssetFetcher;
use crate::config::SoundConfig;
use crate::engine::{OfflineBackend, SoundEngine};
use crate::error::{AssetError, StorageError};
use crate::storage::{KeyValueStore, MemoryStore};

/// Encode mono f32 samples as a 32-bit float WAV file in memory.
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = match hound::WavWriter::new(&mut cursor, spec) {
            Ok(writer) => writer,
            Err(err) => {
                log::error!("[Testing] WAV header write failed: {}", err);
                return Vec::new();
            }
        };
        for &sample in samples {
            if writer.write_sample(sample).is_err() {
                break;
            }
        }
        if let Err(err) = writer.finalize() {
            log::error!("[Testing] WAV finalize failed: {}", err);
        }
    }
    cursor.into_inner()
}

#[derive(Default)]
struct Script {
    responses: HashMap<String, Vec<u8>>,
    calls: HashMap<String, usize>,
    gates: HashMap<String, Arc<Semaphore>>,
}

/// Fetcher with per-URL scripted responses
///
/// Unscripted URLs fail with `FetchFailed`, which drives the cache into its
/// procedural fallback. A URL can be held so its fetch stays in flight until
/// released.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<Script>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serve `bytes` for `url`.
    pub fn respond(&self, url: &str, bytes: Vec<u8>) {
        self.script().responses.insert(url.to_string(), bytes);
    }

    /// Keep fetches of `url` pending until [`release`](Self::release).
    pub fn hold(&self, url: &str) {
        self.script()
            .gates
            .insert(url.to_string(), Arc::new(Semaphore::new(0)));
    }

    /// Let held fetches of `url` complete.
    pub fn release(&self, url: &str) {
        if let Some(gate) = self.script().gates.remove(url) {
            gate.close();
        }
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.script().calls.get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.script().calls.values().sum()
    }

    /// Yield until `url` has been fetched at least once.
    pub async fn wait_for_call(&self, url: &str) {
        while self.call_count(url) == 0 {
            tokio::task::yield_now().await;
        }
    }
}

impl AssetFetcher for ScriptedFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, AssetError>> {
        let (gate, response) = {
            let mut script = self.script();
            *script.calls.entry(url.to_string()).or_insert(0) += 1;
            (script.gates.get(url).cloned(), script.responses.get(url).cloned())
        };

        async move {
            if let Some(gate) = gate {
                // Closed on release; the error just means "go"
                let _ = gate.acquire().await;
            }
            response.ok_or_else(|| AssetError::FetchFailed {
                url: url.to_string(),
                reason: "not scripted".to_string(),
            })
        }
        .boxed()
    }
}

/// Store whose every operation fails, like disabled browser storage
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::ReadFailed {
            reason: "storage disabled".to_string(),
        })
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::WriteFailed {
            reason: "quota exceeded".to_string(),
        })
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::WriteFailed {
            reason: "storage disabled".to_string(),
        })
    }
}

/// A [`SoundEngine`] on the offline backend with scripted collaborators
pub struct EngineRig {
    pub engine: SoundEngine,
    pub backend: Arc<OfflineBackend>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub store: Arc<MemoryStore>,
}

impl EngineRig {
    /// Rig at 48 kHz stereo with default configuration and empty storage.
    pub fn new() -> Self {
        Self::with_backend(SoundConfig::default(), OfflineBackend::new(48_000, 2))
    }

    pub fn with_backend(config: SoundConfig, backend: OfflineBackend) -> Self {
        Self::with_store(config, backend, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(config: SoundConfig, backend: OfflineBackend, store: Arc<MemoryStore>) -> Self {
        let backend = Arc::new(backend);
        let fetcher = Arc::new(ScriptedFetcher::new());
        let engine = SoundEngine::new(config, backend.clone(), fetcher.clone(), store.clone());
        Self {
            engine,
            backend,
            fetcher,
            store,
        }
    }

    /// Advance the output clock by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.backend.advance(Duration::from_millis(ms));
    }
}

impl Default for EngineRig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_bytes_decode() {
        let bytes = wav_bytes(&[0.25, -0.5], 16_000);
        let buffer = crate::audio::SoundBuffer::decode_wav(&bytes).unwrap();
        assert_eq!(buffer.samples(), &[0.25, -0.5]);
        assert_eq!(buffer.sample_rate(), 16_000);
    }

    #[tokio::test]
    async fn test_unscripted_url_fails() {
        let fetcher = ScriptedFetcher::new();
        assert!(fetcher.fetch("/nope.wav").await.is_err());
        assert_eq!(fetcher.call_count("/nope.wav"), 1);
        assert_eq!(fetcher.total_calls(), 1);
    }

    #[test]
    fn test_failing_store() {
        let store = FailingStore;
        assert!(store.get("k").is_err());
        assert!(store.set("k", "v").is_err());
        assert!(store.remove("k").is_err());
    }
}
