//! Network and IO abstractions.

pub mod file;
pub mod http;
pub mod memory;
pub mod traits;

pub use file::FileRangeFetcher;
pub use http::HttpRangeFetcher;
pub use memory::{MemoryFetcher, RequestRecord};
pub use traits::{ByteRange, RangeFetcher};
