//! Trip data providers.

pub mod chunk_manager;
pub mod fallback;
pub mod master_index;
pub mod materialize;
pub mod visibility;

pub use chunk_manager::ChunkManager;
pub use fallback::{FallbackDataset, FallbackDocument, FallbackMetadata};
pub use master_index::MasterIndex;
pub use materialize::{length_mismatch, to_renderable};
pub use visibility::{hour_of, TimeWindow, SECONDS_PER_HOUR};
