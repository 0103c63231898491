use crate::price::PriceExtractor;
use serde::{Deserialize, Serialize};
use url::Url;

/// One listing fragment as handed over by a listing source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    /// First link found inside the fragment, if any
    pub link: Option<String>,

    /// All text of the fragment
    pub text: String,
}

impl RawListing {
    /// Create a new raw listing
    pub fn new(link: Option<String>, text: impl Into<String>) -> Self {
        Self {
            link,
            text: text.into(),
        }
    }
}

/// Normalized view of one scraped listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    identifier: String,
    title: String,
    raw_price_text: String,
    parsed_price: f64,
}

impl ListingRecord {
    /// Create a record directly from its parts
    pub fn new(
        identifier: impl Into<String>,
        title: impl Into<String>,
        raw_price_text: impl Into<String>,
        parsed_price: f64,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            raw_price_text: raw_price_text.into(),
            parsed_price,
        }
    }

    /// Build a record from a source fragment.
    ///
    /// Returns `None` for fragments without a usable link. Relative links are
    /// resolved against `base`, see [`resolve_link`].
    pub fn from_raw(raw: &RawListing, base: &Url, prices: &PriceExtractor) -> Option<Self> {
        let identifier = resolve_link(base, raw.link.as_deref()?)?;
        let title = raw.text.trim();

        Some(Self {
            identifier,
            title: title.to_string(),
            raw_price_text: prices.find_price_text(title).unwrap_or_default().to_string(),
            parsed_price: prices.extract(title),
        })
    }

    /// Stable key used for deduplication (the listing link)
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Price as written on the page, empty when none was found
    pub fn raw_price_text(&self) -> &str {
        &self.raw_price_text
    }

    /// Parsed price, `f64::INFINITY` when unknown
    pub fn parsed_price(&self) -> f64 {
        self.parsed_price
    }

    pub fn link(&self) -> &str {
        &self.identifier
    }
}

/// Identifier for `href`: absolute links are kept byte for byte so they match
/// identifiers stored by earlier runs, relative ones are joined onto `base`.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    if Url::parse(href).is_ok() {
        return Some(href.to_string());
    }

    match base.join(href) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(e) => {
            ::log::debug!("Could not resolve link {:?}: {}", href, e);
            None
        }
    }
}
