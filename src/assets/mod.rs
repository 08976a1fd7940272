// Assets module - sound names, fetching, and the decoded-buffer cache

pub mod cache;
pub mod fetch;
pub mod kind;

pub use cache::AssetCache;
#[cfg(feature = "http-assets")]
pub use fetch::HttpFetcher;
pub use fetch::{AssetFetcher, DefaultFetcher, FileFetcher};
pub use kind::{AmbientCategory, CueKind, SoundKind};
