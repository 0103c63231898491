//! Watches a classifieds search page and alerts once for every new listing
//! matching a keyword below a price ceiling.

pub mod config;
pub mod error;
pub mod filter;
pub mod listing;
pub mod notify;
pub mod parsers;
pub mod pipeline;
pub mod price;
pub mod seen;
pub mod sources;

// Re-export commonly used types for convenience
pub use config::WatchConfig;
pub use error::WatchError;
pub use filter::{QualificationRule, qualifies};
pub use listing::{ListingRecord, RawListing};
pub use pipeline::{Pipeline, RunSummary};
pub use price::extract_price;
pub use seen::{JsonFileStore, SeenSet, SeenStore};
