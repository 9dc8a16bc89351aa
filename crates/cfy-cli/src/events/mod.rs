//! Execution events: incremental fetching and rendering.

pub mod color;
pub mod fetcher;
pub mod formatter;

pub use fetcher::{Cursor, EventFetcher};
pub use formatter::{EventFormatter, FormatterConfig};
