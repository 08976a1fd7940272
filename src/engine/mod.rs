//! Engine module housing the sound engine core.
//!
//! This module exposes trait-based output backends (`backend`) and the
//! `SoundEngine` orchestration layer (`core`).

pub mod backend;
pub mod core;

#[cfg(feature = "device-output")]
pub use backend::CpalBackend;
pub use backend::{
    ContextState, GraphGains, OfflineBackend, OpenedOutput, OutputBackend, OutputStream,
    SystemTimeSource, TimeSource,
};
pub use core::{SoundEngine, SoundState};
