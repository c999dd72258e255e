pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

/// Retrieves the raw body behind a URL.
///
/// Non-success statuses, timeouts and transport failures are all errors;
/// sources decide how to parse the bytes.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
