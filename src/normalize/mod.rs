//! Shared normalization helpers.
//!
//! Collectors that scrape free-text logs run their raw lines through these:
//! timestamp parsing with a "now" fallback, marker-based field extraction and
//! deduplication by a stable composite key.

/// Timestamp parsing and formatting
pub mod time;

/// Marker-based text extraction
pub mod text;

/// Deduplication and multi-source merging
pub mod dedup;

pub use dedup::{dedup_by_key, merge_by_time};
pub use text::{extract_after, extract_last_after, extract_token_after};
pub use time::{format_timestamp, normalize_timestamp, parse_timestamp};
