use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::audio::{AudioGraph, SharedGraph};
use crate::error::AudioError;

use super::{ContextState, GraphGains, OpenedOutput, OutputBackend, OutputStream};

/// Frames rendered per simulated device callback
const CALLBACK_FRAMES: usize = 512;

/// Offline backend used for deterministic testing and CLI rendering.
///
/// No device is involved: the graph clock only advances when [`advance`]
/// or [`render`] is called, which lets fades be checked sample-accurately.
///
/// [`advance`]: OfflineBackend::advance
/// [`render`]: OfflineBackend::render
pub struct OfflineBackend {
    sample_rate: u32,
    channels: u16,
    start_suspended: bool,
    failure: Option<String>,
    open_count: AtomicUsize,
    attached: Mutex<Option<Attached>>,
}

struct Attached {
    graph: SharedGraph,
    state: Arc<Mutex<ContextState>>,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
            start_suspended: false,
            failure: None,
            open_count: AtomicUsize::new(0),
            attached: Mutex::new(None),
        }
    }

    /// Open contexts in the suspended state, as browsers do before a gesture.
    pub fn start_suspended(mut self) -> Self {
        self.start_suspended = true;
        self
    }

    /// Make every `open()` fail with `reason`.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Number of successful `open()` calls
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    /// Graph of the most recently opened context
    pub fn graph(&self) -> Option<SharedGraph> {
        self.lock_attached().as_ref().map(|a| Arc::clone(&a.graph))
    }

    /// State of the most recently opened context
    pub fn context_state(&self) -> Option<ContextState> {
        self.lock_attached().as_ref().map(|a| *lock_state(&a.state))
    }

    /// Advance the clock by `duration` without keeping the output.
    ///
    /// Returns frames rendered; zero unless the context is running.
    pub fn advance(&self, duration: Duration) -> usize {
        self.pull(duration, |_| {})
    }

    /// Render `duration` of interleaved output.
    ///
    /// Empty unless the context is running.
    pub fn render(&self, duration: Duration) -> Vec<f32> {
        let mut out = Vec::new();
        self.pull(duration, |chunk| out.extend_from_slice(chunk));
        out
    }

    fn pull<F: FnMut(&[f32])>(&self, duration: Duration, mut sink: F) -> usize {
        let Some((graph, state)) = self
            .lock_attached()
            .as_ref()
            .map(|a| (Arc::clone(&a.graph), Arc::clone(&a.state)))
        else {
            return 0;
        };
        if *lock_state(&state) != ContextState::Running {
            log::debug!("[OfflineBackend] Context not running, nothing rendered");
            return 0;
        }

        let channels = self.channels as usize;
        let total = (duration.as_secs_f64() * self.sample_rate as f64).round() as usize;
        let mut scratch = vec![0.0_f32; CALLBACK_FRAMES * channels];
        let mut remaining = total;
        while remaining > 0 {
            let frames = remaining.min(CALLBACK_FRAMES);
            let chunk = &mut scratch[..frames * channels];
            graph
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .render(chunk, channels);
            sink(chunk);
            remaining -= frames;
        }
        total
    }

    fn lock_attached(&self) -> MutexGuard<'_, Option<Attached>> {
        self.attached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OutputBackend for OfflineBackend {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn open(&self, gains: GraphGains) -> Result<OpenedOutput, AudioError> {
        if let Some(reason) = &self.failure {
            return Err(AudioError::InitializationFailed {
                reason: reason.clone(),
            });
        }

        let graph = AudioGraph::new(self.sample_rate, gains.master, gains.ambient, gains.cue)
            .into_shared();
        let initial = if self.start_suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        let state = Arc::new(Mutex::new(initial));

        *self.lock_attached() = Some(Attached {
            graph: Arc::clone(&graph),
            state: Arc::clone(&state),
        });
        self.open_count.fetch_add(1, Ordering::SeqCst);

        Ok(OpenedOutput {
            graph,
            stream: Box::new(OfflineStream {
                sample_rate: self.sample_rate,
                channels: self.channels,
                state,
            }),
        })
    }
}

/// Stream half of an offline context
pub struct OfflineStream {
    sample_rate: u32,
    channels: u16,
    state: Arc<Mutex<ContextState>>,
}

impl OutputStream for OfflineStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn state(&self) -> ContextState {
        *lock_state(&self.state)
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        let mut state = lock_state(&self.state);
        match *state {
            ContextState::Closed => Err(AudioError::ContextClosed),
            _ => {
                *state = ContextState::Running;
                Ok(())
            }
        }
    }

    fn close(&mut self) -> Result<(), AudioError> {
        *lock_state(&self.state) = ContextState::Closed;
        Ok(())
    }
}

fn lock_state(state: &Mutex<ContextState>) -> MutexGuard<'_, ContextState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAINS: GraphGains = GraphGains {
        master: 0.7,
        ambient: 0.5,
        cue: 0.3,
    };

    #[test]
    fn test_open_builds_graph_at_backend_rate() {
        let backend = OfflineBackend::new(44_100, 2);
        let opened = backend.open(GAINS).unwrap();
        assert_eq!(opened.stream.sample_rate(), 44_100);
        assert_eq!(opened.stream.state(), ContextState::Running);
        assert_eq!(opened.graph.lock().unwrap().sample_rate(), 44_100);
        assert_eq!(backend.open_count(), 1);
    }

    #[test]
    fn test_clock_only_moves_while_running() {
        let backend = OfflineBackend::new(1_000, 1).start_suspended();
        let mut opened = backend.open(GAINS).unwrap();

        assert_eq!(backend.advance(Duration::from_millis(100)), 0);
        assert_eq!(opened.graph.lock().unwrap().current_frame(), 0);

        opened.stream.resume().unwrap();
        assert_eq!(backend.advance(Duration::from_millis(1_300)), 1_300);
        assert_eq!(opened.graph.lock().unwrap().current_frame(), 1_300);

        let out = backend.render(Duration::from_millis(10));
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn test_closed_context_cannot_resume() {
        let backend = OfflineBackend::new(1_000, 2);
        let mut opened = backend.open(GAINS).unwrap();
        opened.stream.close().unwrap();
        opened.stream.close().unwrap();
        assert_eq!(backend.context_state(), Some(ContextState::Closed));
        assert_eq!(opened.stream.resume(), Err(AudioError::ContextClosed));
        assert!(backend.render(Duration::from_millis(10)).is_empty());
    }

    #[test]
    fn test_failing_backend() {
        let backend = OfflineBackend::new(1_000, 2).failing("no device");
        assert!(matches!(
            backend.open(GAINS),
            Err(AudioError::InitializationFailed { .. })
        ));
        assert_eq!(backend.open_count(), 0);
        assert!(backend.graph().is_none());
    }
}
