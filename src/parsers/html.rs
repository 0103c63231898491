use crate::error::SourceError;
use crate::listing::RawListing;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Link selector should be valid"));

/// Compiles a listing selector
pub fn listing_selector(selector: &str) -> Result<Selector, SourceError> {
    Selector::parse(selector).map_err(|e| SourceError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Parses a single listing element: its first link and its normalized text
pub fn parse_listing(element: ElementRef<'_>) -> RawListing {
    let link = element
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .next()
        .map(|href| href.to_string());

    RawListing {
        link,
        text: element_text(element),
    }
}

/// All text below `element`, with whitespace collapsed to single spaces
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
