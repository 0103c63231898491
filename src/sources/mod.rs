pub mod http;
pub mod web;

use crate::config::{FetchMode, WatchConfig};
use crate::error::SourceError;
use crate::listing::RawListing;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub use http::HttpSource;
pub use web::WebDriverSource;

/// Fetches the search results page and hands back its listing fragments.
///
/// Implementations own everything about the page structure, so a layout
/// change on the site only touches the source and its selector.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch the page. An error means the page could not be retrieved at all;
    /// the receiver then yields the fragments as they are parsed.
    async fn fetch(&self) -> Result<mpsc::Receiver<RawListing>, SourceError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Build the source selected by `config.fetch_mode`
pub fn from_config(config: &WatchConfig) -> Result<Box<dyn ListingSource>, SourceError> {
    match config.fetch_mode {
        FetchMode::Http => Ok(Box::new(HttpSource::from_config(config)?)),
        FetchMode::WebDriver => Ok(Box::new(WebDriverSource::from_config(config))),
    }
}
