//! Trip stream data models, types, and traits.

pub mod traits;
pub mod trip;
pub mod types;

// Re-exports for convenience
pub use traits::{SourceKind, TripSource};
pub use trip::{BinaryTrip, LoadedChunk, RenderableTrip};
pub use types::{ChunkInfo, FormatError, Headsign, Result, Route, RouteType, Shape, StreamError};
