//! SoundEngine: the ambient/UI sound orchestration layer.
//!
//! One explicitly constructed engine owns the output context, the three gain
//! stages, the asset cache and the ambient session. Collaborators hold it by
//! reference (typically in an `Arc`) and call it fire-and-forget: nothing
//! here returns an error. Failures are logged and degrade to silence or to a
//! synthesized stand-in.
//!
//! Lock order is engine state, then graph. The device callback only ever
//! takes the graph lock.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::assets::{AmbientCategory, AssetCache, AssetFetcher, CueKind, SoundKind};
use crate::audio::{AudioGraph, SharedGraph};
use crate::config::SoundConfig;
use crate::engine::backend::{
    ContextState, GraphGains, OpenedOutput, OutputBackend, OutputStream, SystemTimeSource,
    TimeSource,
};
use crate::error::{log_asset_error, log_audio_error, AssetError, AudioError, ErrorCode};
use crate::managers::{
    clamp_volume, AmbientManager, CueManager, PreferenceManager, SoundPreference,
};
use crate::storage::KeyValueStore;
use crate::telemetry::{SoundEvent, TelemetryCollector, TelemetrySnapshot};

/// Value snapshot returned by [`SoundEngine::get_state`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundState {
    pub enabled: bool,
    pub volume: f32,
    pub current_category: Option<AmbientCategory>,
}

/// Live output context, present only while initialized
struct LiveOutput {
    graph: SharedGraph,
    stream: Box<dyn OutputStream>,
    cache: AssetCache,
}

struct EngineState {
    preference: SoundPreference,
    output: Option<LiveOutput>,
    /// Set when output construction failed; cleared by `dispose()`
    init_failed: bool,
    ambient: AmbientManager,
    cues: CueManager,
    /// Bumped by every ambient request, stop, disable and dispose. An ambient
    /// load that resolves under a stale ticket is discarded.
    ambient_ticket: u64,
}

/// The sound engine
pub struct SoundEngine {
    config: SoundConfig,
    backend: Arc<dyn OutputBackend>,
    fetcher: Arc<dyn AssetFetcher>,
    preferences: PreferenceManager,
    telemetry: TelemetryCollector,
    time_source: Arc<dyn TimeSource>,
    start_instant: Instant,
    state: Mutex<EngineState>,
}

impl SoundEngine {
    /// Create an engine and load the persisted preference.
    ///
    /// No output is opened until [`initialize`](Self::initialize).
    pub fn new(
        config: SoundConfig,
        backend: Arc<dyn OutputBackend>,
        fetcher: Arc<dyn AssetFetcher>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let preferences = PreferenceManager::new(store, &config.preferences);
        let preference = preferences.load();
        let time_source: Arc<dyn TimeSource> = Arc::new(SystemTimeSource::default());
        let start_instant = time_source.now();

        log::info!(
            "[SoundEngine] Created with {} backend (enabled={}, volume={:.2})",
            backend.name(),
            preference.enabled,
            preference.volume
        );

        Self {
            state: Mutex::new(EngineState {
                preference,
                output: None,
                init_failed: false,
                ambient: AmbientManager::new(config.gains.ambient_bus),
                cues: CueManager::new(),
                ambient_ticket: 0,
            }),
            config,
            backend,
            fetcher,
            preferences,
            telemetry: TelemetryCollector::default(),
            time_source,
            start_instant,
        }
    }

    /// Replace the clock used for event timestamps.
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.start_instant = time_source.now();
        self.time_source = time_source;
        self
    }

    pub fn config(&self) -> &SoundConfig {
        &self.config
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Open the output context and build the gain graph.
    ///
    /// Idempotent. Must follow a user gesture on platforms that gate audio.
    /// A suspended context is resumed. If construction fails the failure is
    /// logged and the engine stays uninitialized (every play call becomes a
    /// no-op) until [`dispose`](Self::dispose).
    pub fn initialize(&self) {
        let Some(mut state) = self.lock_state("initialize") else {
            return;
        };
        if state.output.is_some() {
            log::debug!("[SoundEngine] Already initialized");
            return;
        }
        if state.init_failed {
            log::debug!("[SoundEngine] Initialization failed earlier; staying silent");
            return;
        }

        let gains = GraphGains {
            master: state.preference.master_gain(),
            ambient: self.config.gains.ambient_bus,
            cue: self.config.gains.cue_bus,
        };

        match self.backend.open(gains) {
            Ok(OpenedOutput { graph, mut stream }) => {
                if stream.state() == ContextState::Suspended {
                    if let Err(err) = stream.resume() {
                        log_audio_error(&err, "initialize.resume");
                    }
                }
                let sample_rate = stream.sample_rate();
                let cache = AssetCache::new(Arc::clone(&self.fetcher), sample_rate);
                state.output = Some(LiveOutput {
                    graph,
                    stream,
                    cache,
                });
                drop(state);

                log::info!(
                    "[SoundEngine] Initialized {} output at {} Hz",
                    self.backend.name(),
                    sample_rate
                );
                self.emit(|at_ms| SoundEvent::Initialized { sample_rate, at_ms });
            }
            Err(err) => {
                state.init_failed = true;
                drop(state);

                log_audio_error(&err, "initialize");
                let reason = err.message();
                self.emit(|at_ms| SoundEvent::InitializationFailed { reason, at_ms });
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_state("is_initialized")
            .map(|state| state.output.is_some())
            .unwrap_or(false)
    }

    /// Tear everything down so a later `initialize()` starts clean.
    ///
    /// Stops the ambient source (already-stopped sources are tolerated),
    /// cancels every pending scheduled stop and in-flight ambient request,
    /// closes the output context and clears the asset cache. The in-memory
    /// preference is kept.
    pub fn dispose(&self) {
        let Some(mut state) = self.lock_state("dispose") else {
            return;
        };
        state.ambient_ticket += 1;
        state.init_failed = false;

        let mut cancelled = 0;
        let EngineState { output, ambient, .. } = &mut *state;
        match output.take() {
            Some(mut live) => {
                match lock_graph(&live.graph) {
                    Ok(mut graph) => {
                        ambient.stop_immediately(&mut graph);
                        cancelled = graph.clear();
                    }
                    Err(err) => log_audio_error(&err, "dispose"),
                }
                if let Err(err) = live.stream.close() {
                    log_audio_error(&err, "dispose.close");
                }
                live.cache.clear();
            }
            None => log::debug!("[SoundEngine] Dispose without live output"),
        }
        ambient.reset();
        drop(state);

        log::info!("[SoundEngine] Disposed ({} pending stops cancelled)", cancelled);
        self.emit(|at_ms| SoundEvent::Disposed { at_ms });
    }

    // ========================================================================
    // AMBIENT
    // ========================================================================

    /// Crossfade to the ambient bed `name` over the configured default.
    ///
    /// Unknown names are logged and ignored.
    pub async fn play_ambient(&self, name: &str) {
        self.play_ambient_with_crossfade(name, self.config.timing.crossfade())
            .await
    }

    pub async fn play_ambient_with_crossfade(&self, name: &str, crossfade: Duration) {
        match AmbientCategory::from_name(name) {
            Some(category) => self.play_ambient_category(category, crossfade).await,
            None => log_unknown_name(name),
        }
    }

    /// Crossfade to `category`.
    ///
    /// No-op while disabled or uninitialized, or if `category` is already
    /// the live bed. Returns once the asset is resolved and the fade is
    /// scheduled; the fade itself completes on the output clock.
    pub async fn play_ambient_category(&self, category: AmbientCategory, crossfade: Duration) {
        let (cache, ticket) = {
            let Some(mut state) = self.lock_state("play_ambient") else {
                return;
            };
            if !state.preference.enabled {
                log::debug!("[SoundEngine] Sound disabled, skipping ambient {}", category);
                return;
            }
            let Some(output) = state.output.as_ref() else {
                log::debug!(
                    "[SoundEngine] Skipping ambient {}: {}",
                    category,
                    AudioError::NotInitialized
                );
                return;
            };
            let already_playing = match lock_graph(&output.graph) {
                Ok(graph) => state.ambient.is_playing(category, &graph),
                Err(err) => {
                    log_audio_error(&err, "play_ambient");
                    return;
                }
            };
            let cache = output.cache.clone();

            // Any newer request, including a same-category one, supersedes
            // loads still in flight.
            state.ambient_ticket += 1;
            if already_playing {
                log::debug!("[SoundEngine] Ambient {} already playing", category);
                return;
            }
            (cache, state.ambient_ticket)
        };

        let kind = SoundKind::Ambient(category);
        let url = self.config.assets.url_for(kind);
        let buffer = cache.load_or_synthesize(&url, kind).await;

        let transition = {
            let Some(mut state) = self.lock_state("play_ambient") else {
                return;
            };
            if state.ambient_ticket != ticket {
                log::debug!("[SoundEngine] Ambient {} superseded while loading", category);
                return;
            }
            if !state.preference.enabled {
                return;
            }
            let EngineState { output, ambient, .. } = &mut *state;
            let Some(output) = output.as_ref() else {
                return;
            };
            let transition = match lock_graph(&output.graph) {
                Ok(mut graph) => ambient.crossfade_to(&mut graph, category, buffer, crossfade),
                Err(err) => {
                    log_audio_error(&err, "play_ambient");
                    return;
                }
            };
            transition
        };

        let crossfade_ms = crossfade.as_millis() as u64;
        log::info!(
            "[SoundEngine] Ambient {} -> {} over {}ms (bus {:.3} -> 0 -> {:.3}, {} outgoing)",
            transition
                .previous
                .map(|c| c.as_str())
                .unwrap_or("silence"),
            category,
            crossfade_ms,
            transition.from_gain,
            self.config.gains.ambient_bus,
            transition.outgoing
        );
        tracing::debug!("[SoundEngine] Ambient source {:?} started", transition.source);
        self.emit(|at_ms| SoundEvent::AmbientStarted {
            category,
            crossfade_ms,
            at_ms,
        });
    }

    /// Fade the ambient bed out over the configured default.
    pub fn stop_ambient(&self) {
        self.stop_ambient_with_fade(self.config.timing.stop_fade())
    }

    /// Fade the ambient bed out over `fade`, then release it.
    ///
    /// No-op without an active session. Also cancels an ambient request
    /// still loading.
    pub fn stop_ambient_with_fade(&self, fade: Duration) {
        let stopped = {
            let Some(mut state) = self.lock_state("stop_ambient") else {
                return;
            };
            state.ambient_ticket += 1;
            let EngineState { output, ambient, .. } = &mut *state;
            let Some(output) = output.as_ref() else {
                return;
            };
            let stopped = match lock_graph(&output.graph) {
                Ok(mut graph) => ambient.stop(&mut graph, fade),
                Err(err) => {
                    log_audio_error(&err, "stop_ambient");
                    None
                }
            };
            stopped
        };

        if let Some(category) = stopped {
            self.emit_ambient_stopped(category, fade);
        }
    }

    // ========================================================================
    // CUES
    // ========================================================================

    /// Play the UI cue `name` once. Unknown names are logged and ignored.
    pub async fn play_cue(&self, name: &str) {
        match CueKind::from_name(name) {
            Some(cue) => self.play_cue_kind(cue).await,
            None => log_unknown_name(name),
        }
    }

    /// Play `cue` once on the cue bus. No-op while disabled or uninitialized.
    pub async fn play_cue_kind(&self, cue: CueKind) {
        let cache = {
            let Some(state) = self.lock_state("play_cue") else {
                return;
            };
            if !state.preference.enabled {
                return;
            }
            let Some(output) = state.output.as_ref() else {
                log::debug!(
                    "[SoundEngine] Skipping cue {}: {}",
                    cue,
                    AudioError::NotInitialized
                );
                return;
            };
            output.cache.clone()
        };

        let kind = SoundKind::Cue(cue);
        let url = self.config.assets.url_for(kind);
        let buffer = cache.load_or_synthesize(&url, kind).await;

        let (source, played) = {
            let Some(mut state) = self.lock_state("play_cue") else {
                return;
            };
            if !state.preference.enabled {
                return;
            }
            let EngineState { output, cues, .. } = &mut *state;
            let Some(output) = output.as_ref() else {
                return;
            };
            let source = match lock_graph(&output.graph) {
                Ok(mut graph) => cues.play(&mut graph, buffer),
                Err(err) => {
                    log_audio_error(&err, "play_cue");
                    return;
                }
            };
            (source, cues.played())
        };

        tracing::debug!(
            "[SoundEngine] Cue {} started as {:?} ({} this session)",
            cue,
            source,
            played
        );
        self.emit(|at_ms| SoundEvent::CuePlayed { cue, at_ms });
    }

    // ========================================================================
    // ENABLE / VOLUME
    // ========================================================================

    /// Enable or disable all sound.
    ///
    /// Persists the preference and ramps the master gain to
    /// `enabled ? volume : 0`. Disabling also fades out the ambient bed.
    pub fn set_enabled(&self, enabled: bool) {
        let Some(mut state) = self.lock_state("set_enabled") else {
            return;
        };
        self.apply_enabled(&mut state, enabled);
    }

    /// Flip the enabled flag; returns the new value.
    pub fn toggle(&self) -> bool {
        let Some(mut state) = self.lock_state("toggle") else {
            return false;
        };
        let enabled = !state.preference.enabled;
        self.apply_enabled(&mut state, enabled);
        enabled
    }

    fn apply_enabled(&self, state: &mut EngineState, enabled: bool) {
        state.preference.enabled = enabled;
        self.preferences.save(&state.preference);
        let preference = state.preference;

        let mut stopped = None;
        if !enabled {
            state.ambient_ticket += 1;
        }
        if let Some(output) = state.output.as_ref() {
            match lock_graph(&output.graph) {
                Ok(mut graph) => {
                    let now = graph.current_time();
                    graph.master_mut().ramp_from_now(
                        preference.master_gain(),
                        now,
                        self.config.timing.mute_ramp().as_secs_f64(),
                    );
                    if !enabled {
                        stopped = state
                            .ambient
                            .stop(&mut graph, self.config.timing.disable_fade());
                    }
                }
                Err(err) => log_audio_error(&err, "set_enabled"),
            }
        }

        log::info!("[SoundEngine] Sound {}", if enabled { "enabled" } else { "disabled" });
        self.emit_preferences(preference);
        if let Some(category) = stopped {
            self.emit_ambient_stopped(category, self.config.timing.disable_fade());
        }
    }

    /// Set the volume, clamped to [0, 1], and persist it.
    ///
    /// The master gain follows over a short ramp only while enabled.
    /// Non-finite values are ignored.
    pub fn set_volume(&self, volume: f32) {
        if !volume.is_finite() {
            log::warn!("[SoundEngine] Ignoring non-finite volume {}", volume);
            return;
        }
        let volume = clamp_volume(volume);

        let preference = {
            let Some(mut state) = self.lock_state("set_volume") else {
                return;
            };
            state.preference.volume = volume;
            self.preferences.save(&state.preference);

            if state.preference.enabled {
                if let Some(output) = state.output.as_ref() {
                    match lock_graph(&output.graph) {
                        Ok(mut graph) => {
                            let now = graph.current_time();
                            graph.master_mut().ramp_from_now(
                                volume,
                                now,
                                self.config.timing.volume_ramp().as_secs_f64(),
                            );
                        }
                        Err(err) => log_audio_error(&err, "set_volume"),
                    }
                }
            }
            state.preference
        };

        self.emit_preferences(preference);
    }

    /// Snapshot of the current state
    pub fn get_state(&self) -> SoundState {
        match self.lock_state("get_state") {
            Some(state) => SoundState {
                enabled: state.preference.enabled,
                volume: state.preference.volume,
                current_category: state.ambient.current_category(),
            },
            None => {
                let defaults = self.preferences.defaults();
                SoundState {
                    enabled: defaults.enabled,
                    volume: defaults.volume,
                    current_category: None,
                }
            }
        }
    }

    // ========================================================================
    // OBSERVATION
    // ========================================================================

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<SoundEvent> {
        self.telemetry.subscribe()
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    /// Graph of the live output, for inspection and offline rendering
    pub fn graph(&self) -> Option<SharedGraph> {
        self.lock_state("graph")?
            .output
            .as_ref()
            .map(|output| Arc::clone(&output.graph))
    }

    /// Number of resolved assets in the cache
    pub fn cached_assets(&self) -> usize {
        self.lock_state("cached_assets")
            .and_then(|state| state.output.as_ref().map(|output| output.cache.len()))
            .unwrap_or(0)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Lock engine state; a poisoned lock is logged and treated as "do nothing".
    fn lock_state(&self, context: &str) -> Option<MutexGuard<'_, EngineState>> {
        match self.state.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                let err = AudioError::LockPoisoned {
                    component: "engine_state".to_string(),
                };
                log_audio_error(&err, context);
                None
            }
        }
    }

    fn now_ms(&self) -> u64 {
        self.time_source
            .now()
            .saturating_duration_since(self.start_instant)
            .as_millis() as u64
    }

    fn emit<F: FnOnce(u64) -> SoundEvent>(&self, make: F) {
        self.telemetry.publish(make(self.now_ms()));
    }

    fn emit_preferences(&self, preference: SoundPreference) {
        self.emit(|at_ms| SoundEvent::PreferencesChanged {
            enabled: preference.enabled,
            volume: preference.volume,
            at_ms,
        });
    }

    fn emit_ambient_stopped(&self, category: AmbientCategory, fade: Duration) {
        let fade_ms = fade.as_millis() as u64;
        log::info!("[SoundEngine] Stopping ambient {} over {}ms", category, fade_ms);
        self.emit(|at_ms| SoundEvent::AmbientStopped {
            category,
            fade_ms,
            at_ms,
        });
    }
}

/// Names outside the category/cue enumeration are a no-op, never a fallback.
fn log_unknown_name(name: &str) {
    let err = AssetError::UnknownKind {
        name: name.to_string(),
    };
    log_asset_error(&err, name);
}

fn lock_graph(graph: &SharedGraph) -> Result<MutexGuard<'_, AudioGraph>, AudioError> {
    graph.lock().map_err(|_| AudioError::LockPoisoned {
        component: "audio_graph".to_string(),
    })
}

impl Drop for SoundEngine {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(mut live) = state.output.take() {
            if let Err(err) = live.stream.close() {
                log_audio_error(&err, "drop");
            }
        }
    }
}

// ========================================================================
// TESTS
// ========================================================================
