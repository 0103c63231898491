use crate::config::WatchConfig;
use crate::error::SourceError;
use crate::listing::RawListing;
use crate::parsers;
use crate::sources::ListingSource;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// Upper bound for the whole search request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Fetches the results page with a plain HTTP GET
pub struct HttpSource {
    client: reqwest::Client,
    endpoint: Url,
    headers: HeaderMap,
    listing_selector: String,
}

impl HttpSource {
    pub fn new(
        endpoint: Url,
        headers: HeaderMap,
        listing_selector: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| SourceError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            endpoint,
            headers,
            listing_selector: listing_selector.into(),
        })
    }

    pub fn from_config(config: &WatchConfig) -> Result<Self, SourceError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|source| SourceError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                source,
            })?;
        Self::new(
            endpoint,
            header_map(&config.headers)?,
            config.listing_selector.clone(),
        )
    }

    /// Downloads the page body
    async fn fetch_page(&self) -> Result<String, SourceError> {
        let http_error = |source| SourceError::Http {
            endpoint: self.endpoint.to_string(),
            source,
        };

        let response = self
            .client
            .get(self.endpoint.clone())
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(http_error)
    }
}

#[async_trait]
impl ListingSource for HttpSource {
    async fn fetch(&self) -> Result<mpsc::Receiver<RawListing>, SourceError> {
        ::log::info!("Fetching {}", self.endpoint);
        let start = std::time::Instant::now();

        let page = self.fetch_page().await?;
        ::log::debug!(
            "Fetched {} bytes from {} in {:.2} seconds",
            page.len(),
            self.endpoint,
            start.elapsed().as_secs_f64()
        );

        parsers::stream_listings(page, &self.listing_selector)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Converts configured headers into a request header map
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, SourceError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = |reason: String| SourceError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one canned response and returns the raw request it received
    async fn serve_once(status_line: &str, body: &str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        let url = Url::parse(&format!("http://{}/gatos?q=angor%C3%A1", addr)).unwrap();
        (url, handle)
    }

    fn config_for(url: &Url) -> WatchConfig {
        let mut config = WatchConfig::new(url.as_str());
        config.listing_selector = "li.ad".to_string();
        config
    }

    #[test]
    fn test_header_map() {
        let headers = BTreeMap::from([
            ("User-Agent".to_string(), "Mozilla/5.0".to_string()),
            ("Accept-Language".to_string(), "pt-BR".to_string()),
        ]);
        let map = header_map(&headers).unwrap();
        assert_eq!(map.get("user-agent").unwrap(), "Mozilla/5.0");
        assert_eq!(map.get("accept-language").unwrap(), "pt-BR");
    }

    #[test]
    fn test_header_map_rejects_invalid_names() {
        let headers = BTreeMap::from([("Bad Header".to_string(), "x".to_string())]);
        assert!(matches!(
            header_map(&headers),
            Err(SourceError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_from_config_rejects_bad_endpoint() {
        let config = WatchConfig::new("::not a url::");
        assert!(matches!(
            HttpSource::from_config(&config),
            Err(SourceError::InvalidEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_sends_headers_and_yields_listings() {
        let body = r#"<ul><li class="ad"><a href="/1">Gato Angorá R$ 200</a></li></ul>"#;
        let (url, server) = serve_once("200 OK", body).await;

        let source = HttpSource::from_config(&config_for(&url)).unwrap();
        let mut rx = source.fetch().await.unwrap();

        let listing = rx.recv().await.unwrap();
        assert_eq!(listing.link.as_deref(), Some("/1"));
        assert_eq!(listing.text, "Gato Angorá R$ 200");
        assert!(rx.recv().await.is_none());

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /gatos?q=angor%c3%a1"));
        assert!(request.contains("user-agent: mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_fetch_fails_on_error_status() {
        let (url, server) = serve_once("503 Service Unavailable", "down").await;

        let source = HttpSource::from_config(&config_for(&url)).unwrap();
        let result = source.fetch().await;
        assert!(matches!(
            result,
            Err(SourceError::Status { status: 503, .. })
        ));
        server.await.unwrap();
    }
}
