pub mod html;


use crate::error::SourceError;
use crate::listing::RawListing;
use tokio::sync::mpsc;

/// Number of parsed listings buffered ahead of the consumer
const LISTING_BUFFER: usize = 64;

/// Parses `page` on a blocking thread and yields listings as they are extracted.
///
/// The selector is checked before anything is spawned so a bad selector fails
/// the fetch instead of producing an empty page.
pub fn stream_listings(
    page: String,
    selector: &str,
) -> Result<mpsc::Receiver<RawListing>, SourceError> {
    let selector = html::listing_selector(selector)?;
    let (tx, rx) = mpsc::channel(LISTING_BUFFER);

    tokio::task::spawn_blocking(move || {
        let doc = scraper::Html::parse_document(&page);
        let mut found = 0;
        for element in doc.select(&selector) {
            if tx.blocking_send(html::parse_listing(element)).is_err() {
                ::log::debug!("Listing receiver dropped, stopping parser");
                break;
            }
            found += 1;
        }
        ::log::debug!("HTML parser found {} listings", found);
    });

    Ok(rx)
}

/// Yields already extracted listings through the same channel type as [`stream_listings`]
pub fn listing_channel(listings: Vec<RawListing>) -> mpsc::Receiver<RawListing> {
    let (tx, rx) = mpsc::channel(listings.len().max(1));
    for listing in listings {
        // Capacity covers every listing, so this never waits
        if tx.try_send(listing).is_err() {
            break;
        }
    }
    rx
}
