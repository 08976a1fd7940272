// AssetCache - URL-keyed memo of decoded buffers with procedural fallback
//
// Every entry is either Ready (a decoded or synthesized buffer) or Pending
// (a shared in-flight load). Concurrent requests for the same URL await the
// same Pending future, so a play request issued while a fetch is in flight
// observes its eventual resolution instead of being dropped or triggering a
// second fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::audio::{synthesize, SoundBuffer};
use crate::error::{log_asset_error, AssetError};

use super::fetch::AssetFetcher;
use super::kind::SoundKind;

type PendingLoad = Shared<BoxFuture<'static, Arc<SoundBuffer>>>;

enum CacheEntry {
    Ready(Arc<SoundBuffer>),
    Pending(PendingLoad),
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Bumped by `clear()`; loads started before a clear do not repopulate
    generation: u64,
}

struct CacheInner {
    fetcher: Arc<dyn AssetFetcher>,
    sample_rate: u32,
    state: Mutex<CacheState>,
}

/// Memoizing asset loader
///
/// Cloning is cheap and yields a handle to the same cache.
#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<CacheInner>,
}

impl AssetCache {
    /// Create an empty cache.
    ///
    /// # Arguments
    /// * `fetcher` - Byte source for asset URLs
    /// * `sample_rate` - Output rate; fallback buffers are synthesized at it
    pub fn new(fetcher: Arc<dyn AssetFetcher>, sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                sample_rate,
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    generation: 0,
                }),
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    /// Resolve `url` to a playable buffer.
    ///
    /// Returns the cached buffer if `url` already resolved. Otherwise fetches
    /// and decodes it; on any failure a deterministic stand-in for `kind` is
    /// synthesized and cached under the same `url`. Never fails.
    pub async fn load_or_synthesize(&self, url: &str, kind: SoundKind) -> Arc<SoundBuffer> {
        let pending = {
            let mut state = lock_state(&self.inner.state);
            match state.entries.get(url) {
                Some(CacheEntry::Ready(buffer)) => return Arc::clone(buffer),
                Some(CacheEntry::Pending(load)) => load.clone(),
                None => {
                    let load = self.start_load(url.to_string(), kind, state.generation);
                    state
                        .entries
                        .insert(url.to_string(), CacheEntry::Pending(load.clone()));
                    load
                }
            }
        };

        pending.await
    }

    fn start_load(&self, url: String, kind: SoundKind, generation: u64) -> PendingLoad {
        let inner = Arc::clone(&self.inner);
        async move {
            let buffer = match fetch_and_decode(inner.fetcher.as_ref(), &url).await {
                Ok(buffer) => {
                    log::debug!(
                        "[AssetCache] Loaded {} ({} frames @ {} Hz)",
                        url,
                        buffer.len(),
                        buffer.sample_rate()
                    );
                    buffer
                }
                Err(err) => {
                    log_asset_error(&err, &url);
                    log::warn!("[AssetCache] Using synthesized '{}' for {}", kind, url);
                    synthesize(kind, inner.sample_rate)
                }
            };
            let buffer = Arc::new(buffer);

            let mut state = lock_state(&inner.state);
            if state.generation == generation {
                state
                    .entries
                    .insert(url, CacheEntry::Ready(Arc::clone(&buffer)));
            }
            buffer
        }
        .boxed()
        .shared()
    }

    /// Whether `url` has fully resolved
    pub fn contains(&self, url: &str) -> bool {
        matches!(
            lock_state(&self.inner.state).entries.get(url),
            Some(CacheEntry::Ready(_))
        )
    }

    /// Number of resolved entries
    pub fn len(&self) -> usize {
        lock_state(&self.inner.state)
            .entries
            .values()
            .filter(|entry| matches!(entry, CacheEntry::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Loads still in flight complete for their awaiters
    /// but are not stored.
    pub fn clear(&self) {
        let mut state = lock_state(&self.inner.state);
        state.entries.clear();
        state.generation += 1;
    }
}

async fn fetch_and_decode(fetcher: &dyn AssetFetcher, url: &str) -> Result<SoundBuffer, AssetError> {
    let bytes = fetcher.fetch(url).await?;
    SoundBuffer::decode_wav(&bytes)
}

/// The cache holds plain data; a panic while holding the lock cannot leave
/// it half-updated, so a poisoned lock is recovered rather than propagated.
fn lock_state(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AmbientCategory, CueKind};
    use crate::audio::{synth, BufferOrigin};
    use crate::testing::{wav_bytes, ScriptedFetcher};

    const SR: u32 = 48_000;

    #[tokio::test]
    async fn test_success_is_cached() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond("/sounds/ui/click.wav", wav_bytes(&[0.5; 64], 22_050));
        let cache = AssetCache::new(fetcher.clone(), SR);

        let first = cache
            .load_or_synthesize("/sounds/ui/click.wav", SoundKind::Cue(CueKind::Click))
            .await;
        let second = cache
            .load_or_synthesize("/sounds/ui/click.wav", SoundKind::Cue(CueKind::Click))
            .await;

        assert_eq!(first.origin(), BufferOrigin::Decoded);
        assert_eq!(first.sample_rate(), 22_050, "Decoded buffers keep their own rate");
        assert!(Arc::ptr_eq(&first, &second), "Second load must hit the cache");
        assert_eq!(fetcher.call_count("/sounds/ui/click.wav"), 1);
        assert!(cache.contains("/sounds/ui/click.wav"));
    }

    #[tokio::test]
    async fn test_failure_falls_back_and_caches_under_same_url() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let cache = AssetCache::new(fetcher.clone(), SR);

        let hover = cache
            .load_or_synthesize("/sounds/ui/hover.wav", SoundKind::Cue(CueKind::Hover))
            .await;
        assert_eq!(hover.origin(), BufferOrigin::Synthesized);
        assert_eq!(hover.len(), synth::frames_for(0.05, SR));

        let again = cache
            .load_or_synthesize("/sounds/ui/hover.wav", SoundKind::Cue(CueKind::Hover))
            .await;
        assert!(Arc::ptr_eq(&hover, &again));
        assert_eq!(fetcher.call_count("/sounds/ui/hover.wav"), 1, "Fallback must be cached");
    }

    #[tokio::test]
    async fn test_decode_failure_falls_back() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond("/sounds/ambient/city.wav", b"not a wav file".to_vec());
        let cache = AssetCache::new(fetcher, SR);

        let bed = cache
            .load_or_synthesize(
                "/sounds/ambient/city.wav",
                SoundKind::Ambient(AmbientCategory::City),
            )
            .await;
        assert_eq!(bed.origin(), BufferOrigin::Synthesized);
        assert_eq!(bed.len(), synth::frames_for(2.0, SR));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond("/sounds/ambient/nature.wav", wav_bytes(&[0.1; 32], SR));
        fetcher.hold("/sounds/ambient/nature.wav");
        let cache = AssetCache::new(fetcher.clone(), SR);

        let kind = SoundKind::Ambient(AmbientCategory::Nature);
        let a = tokio::spawn({
            let cache = cache.clone();
            async move { cache.load_or_synthesize("/sounds/ambient/nature.wav", kind).await }
        });
        let b = tokio::spawn({
            let cache = cache.clone();
            async move { cache.load_or_synthesize("/sounds/ambient/nature.wav", kind).await }
        });

        fetcher.wait_for_call("/sounds/ambient/nature.wav").await;
        assert!(!cache.contains("/sounds/ambient/nature.wav"));
        fetcher.release("/sounds/ambient/nature.wav");

        let a = a.await.unwrap();
        let b = b.await.unwrap();
        assert!(Arc::ptr_eq(&a, &b), "Both requests must observe the same load");
        assert_eq!(fetcher.call_count("/sounds/ambient/nature.wav"), 1);
    }

    #[tokio::test]
    async fn test_clear_drops_entries() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let cache = AssetCache::new(fetcher.clone(), SR);

        cache
            .load_or_synthesize("/sounds/ui/success.wav", SoundKind::Cue(CueKind::Success))
            .await;
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());

        cache
            .load_or_synthesize("/sounds/ui/success.wav", SoundKind::Cue(CueKind::Success))
            .await;
        assert_eq!(fetcher.call_count("/sounds/ui/success.wav"), 2, "Cleared entries refetch");
    }
}
