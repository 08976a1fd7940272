// Audio module - render graph, gain automation, buffers and fallback synthesis

pub mod automation;
pub mod buffer;
pub mod graph;
pub mod synth;

// Re-export commonly used types for convenience
pub use automation::{AutomationEvent, GainParam};
pub use buffer::{BufferOrigin, SoundBuffer};
pub use graph::{AudioGraph, Bus, SharedGraph, SourceId};
pub use synth::{synthesize, synthesize_named};
