//! Output backend abstractions for the sound engine.
//!
//! A backend turns a request for three starting gains into a live
//! [`AudioGraph`](crate::audio::AudioGraph) wired to some sink: a real device
//! (`cpal`, feature `device-output`) or the [`OfflineBackend`] whose clock
//! only moves when told to.

use std::time::Instant;

use crate::audio::SharedGraph;
use crate::error::AudioError;

/// Output context lifecycle, mirroring platform audio-context states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Constructed but not pulling samples (typical before a user gesture)
    Suspended,
    Running,
    Closed,
}

/// Starting gains for a freshly built graph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphGains {
    pub master: f32,
    pub ambient: f32,
    pub cue: f32,
}

/// Handle to an open output context
pub trait OutputStream: Send {
    fn sample_rate(&self) -> u32;
    fn channels(&self) -> u16;
    fn state(&self) -> ContextState;
    fn resume(&mut self) -> Result<(), AudioError>;
    /// Stop pulling samples and release the device. Closing twice is allowed.
    fn close(&mut self) -> Result<(), AudioError>;
}

/// A freshly opened output: the graph plus the stream rendering it
pub struct OpenedOutput {
    pub graph: SharedGraph,
    pub stream: Box<dyn OutputStream>,
}

/// Trait implemented by output backends.
pub trait OutputBackend: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// Build a graph at the sink's sample rate and start rendering it.
    fn open(&self, gains: GraphGains) -> Result<OpenedOutput, AudioError>;
}

/// Trait representing a monotonic time source used for event timestamps.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default time source backed by `Instant::now`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(feature = "device-output")]
mod cpal;
#[cfg(feature = "device-output")]
pub use self::cpal::CpalBackend;

mod offline;
pub use offline::{OfflineBackend, OfflineStream};
