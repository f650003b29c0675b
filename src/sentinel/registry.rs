use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::model::SearchPage;
use crate::traits::{FetchError, RegistryFeed};

pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Number of search results requested per poll.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// `reqwest`-backed reader of the npm search endpoint.
///
/// All ranking weights are zeroed so the page is dominated by recent publishes.
#[derive(Debug, Clone)]
pub struct NpmSearchFeed {
    search_url: String,
    http: reqwest::Client,
}

impl NpmSearchFeed {
    pub fn new(
        registry_url: &str,
        page_size: usize,
        request_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            search_url: search_url(registry_url, page_size),
            http,
        })
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }
}

/// Builds the search URL for `registry_url` (trailing slash tolerated).
pub fn search_url(registry_url: &str, page_size: usize) -> String {
    format!(
        "{}/-/v1/search?text=boost-exact:false&size={}&quality=0&popularity=0&maintenance=0",
        registry_url.trim_end_matches('/'),
        page_size
    )
}

/// Decodes a search response body into package names, in feed order.
pub fn parse_search_page(body: &[u8]) -> Result<Vec<String>, FetchError> {
    let page: SearchPage = serde_json::from_slice(body)?;
    Ok(page.names())
}

#[async_trait]
impl RegistryFeed for NpmSearchFeed {
    fn feed_id(&self) -> &str {
        "npm"
    }

    async fn fetch_names(&self) -> Result<Vec<String>, FetchError> {
        debug!(url = %self.search_url, "Fetching registry page");

        let response = self.http.get(&self.search_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        parse_search_page(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        assert_eq!(
            search_url("https://registry.npmjs.org/", 25),
            "https://registry.npmjs.org/-/v1/search?text=boost-exact:false&size=25&quality=0&popularity=0&maintenance=0"
        );
    }

    #[test]
    fn test_parse_search_page() {
        let body = br#"{"objects":[{"package":{"name":"expresss"}},{"package":{"name":"chalk"}}],"total":2}"#;
        assert_eq!(parse_search_page(body).unwrap(), vec!["expresss", "chalk"]);
    }

    #[test]
    fn test_parse_search_page_rejects_garbage() {
        assert!(matches!(
            parse_search_page(b"<html>rate limited</html>"),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_feed_builds_url() {
        let feed = NpmSearchFeed::new(NPM_REGISTRY_URL, 10, Duration::from_secs(5)).unwrap();
        assert!(feed.search_url().contains("size=10"));
        assert_eq!(feed.feed_id(), "npm");
    }
}
