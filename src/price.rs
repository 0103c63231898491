use regex::Regex;
use std::sync::LazyLock;

/// Currency marker used by the classifieds site
pub const DEFAULT_CURRENCY_MARKER: &str = "R$";

static DEFAULT_EXTRACTOR: LazyLock<PriceExtractor> = LazyLock::new(PriceExtractor::default);

/// Extracts the first `R$`-marked amount from `text`.
///
/// Returns `f64::INFINITY` when no amount is present or the amount cannot be
/// parsed, so the listing never passes a price ceiling.
pub fn extract_price(text: &str) -> f64 {
    DEFAULT_EXTRACTOR.extract(text)
}

/// Finds currency amounts written as `<marker> 1.234,56` in free text
#[derive(Debug, Clone)]
pub struct PriceExtractor {
    marker: String,
    pattern: Regex,
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY_MARKER).expect("Default currency pattern should be valid")
    }
}

impl PriceExtractor {
    /// Create an extractor for the given currency marker (matched literally)
    pub fn new(marker: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"{}\s*([\d.,]+)", regex::escape(marker)))?;
        Ok(Self {
            marker: marker.to_string(),
            pattern,
        })
    }

    /// The currency marker this extractor looks for
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Returns the first marked amount exactly as written, marker included
    pub fn find_price_text<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.pattern.find(text).map(|m| m.as_str())
    }

    /// Parses the first marked amount, `.` being thousands grouping and `,` the decimal separator
    pub fn extract(&self, text: &str) -> f64 {
        let Some(amount) = self
            .pattern
            .captures(text)
            .and_then(|caps| caps.get(1).map(|m| m.as_str()))
        else {
            return f64::INFINITY;
        };

        normalize_amount(amount)
            .parse::<f64>()
            .unwrap_or(f64::INFINITY)
    }
}

/// Turns `1.234,56` into `1234.56`
fn normalize_amount(amount: &str) -> String {
    amount.replace('.', "").replace(',', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_amount_with_decimals() {
        assert_eq!(extract_price("R$ 1.234,56 usado"), 1234.56);
    }

    #[test]
    fn test_amount_without_space_or_decimals() {
        assert_eq!(extract_price("R$300"), 300.0);
        assert_eq!(extract_price("Filhote R$ 300 Piracicaba"), 300.0);
    }

    #[test]
    fn test_missing_price_is_infinite() {
        assert_eq!(extract_price("sem preço"), f64::INFINITY);
        assert_eq!(extract_price(""), f64::INFINITY);
        // Bare numbers without the marker are not prices
        assert_eq!(extract_price("3 meses, 2 vacinas"), f64::INFINITY);
    }

    #[test]
    fn test_unparseable_amount_is_infinite() {
        assert_eq!(extract_price("R$ ,"), f64::INFINITY);
        assert_eq!(extract_price("R$ 1,2,3"), f64::INFINITY);
    }

    #[test]
    fn test_binds_to_first_marked_amount() {
        let text = "Gato 2 anos R$ 250,00 (antes R$ 400,00) 12 fotos";
        assert_eq!(extract_price(text), 250.0);
    }

    #[test]
    fn test_find_price_text() {
        let extractor = PriceExtractor::default();
        assert_eq!(
            extractor.find_price_text("Angorá R$ 1.500 hoje"),
            Some("R$ 1.500")
        );
        assert_eq!(extractor.find_price_text("Angorá"), None);
    }

    #[test]
    fn test_custom_marker() {
        let extractor = PriceExtractor::new("€").unwrap();
        assert_eq!(extractor.marker(), "€");
        assert_eq!(extractor.extract("Preis € 1.099,90"), 1099.9);
        assert_eq!(extractor.extract("R$ 100"), f64::INFINITY);
    }
}
