use std::time::Duration;

use tracing::debug;

use crate::{error::Result, xmltv::Document};

/// Timeout applied to each schedule fetch, including reading the body.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of remote schedule documents.
///
/// The merge engine only ever asks for a parsed document per URL, so anything
/// able to answer that, an HTTP client or a canned map in tests, can drive it.
pub trait Fetch {
    /// Fetch and parse the schedule document at `url`.
    ///
    /// # Errors
    /// On any transport failure, non-2xx response, or unparseable body.
    fn fetch(&self, url: &str) -> Result<Document>;
}

/// [Fetch] over plain blocking HTTP(S) GETs.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// # Errors
    /// If the underlying HTTP client cannot be constructed.
    pub fn new() -> Result<HttpFetcher> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Document> {
        debug!("GET {url}");
        let resp = self.client.get(url).send()?.error_for_status()?;
        Document::parse(&resp.text()?)
    }
}
