//! HTTP fetching for article extraction.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use scraper::Selector;
use tracing::{debug, info, instrument, warn};
use url::Url;

use postforge_shared::{Document, ExtractorConfig, PostforgeError, Result};

use crate::ContentExtractor;
use crate::guard::is_blocked_target;
use crate::text::extract_text;

/// Browser-like User-Agent; some blog hosts refuse obvious bots.
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; Postforge/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

const MAX_REDIRECTS: usize = 5;

/// Follow at most [`MAX_REDIRECTS`] hops, and never into a blocked target
/// unless private hosts are allowed.
fn redirect_policy(allow_private_hosts: bool) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if !allow_private_hosts && is_blocked_target(attempt.url()) {
            let target = attempt.url().to_string();
            warn!(url = %target, "refusing redirect to private or non-http target");
            attempt.error(format!("redirect to disallowed target {target}"))
        } else {
            attempt.follow()
        }
    })
}

/// Fetches a page over HTTP and reduces it to article text.
pub struct HttpExtractor {
    client: Client,
    selector: Option<Selector>,
    max_body_bytes: u64,
    allow_private_hosts: bool,
}

impl HttpExtractor {
    /// Create an extractor from the `[extractor]` config section.
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect_policy(config.allow_private_hosts))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PostforgeError::Extraction(format!("failed to build HTTP client: {e}")))?;

        let selector = if config.selectors.is_empty() {
            None
        } else {
            let list = config.selectors.join(", ");
            let parsed = Selector::parse(&list).map_err(|e| {
                PostforgeError::config(format!("invalid extractor selectors '{list}': {e:?}"))
            })?;
            Some(parsed)
        };

        Ok(Self {
            client,
            selector,
            max_body_bytes: config.max_body_bytes,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    /// GET `url` and return the body of a 2xx response.
    async fn fetch_page(&self, url: &Url) -> Result<String> {
        debug!(url = %url, "fetching page");
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| PostforgeError::Extraction(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostforgeError::Extraction(format!("{url}: HTTP {status}")));
        }

        self.read_body(url, response).await
    }

    /// Read the response body, refusing anything over the size limit.
    async fn read_body(&self, url: &Url, mut response: reqwest::Response) -> Result<String> {
        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes)
        {
            return Err(PostforgeError::Extraction(format!(
                "{url}: body exceeds {} bytes",
                self.max_body_bytes
            )));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PostforgeError::Extraction(format!("{url}: body read failed: {e}")))?
        {
            if (bytes.len() + chunk.len()) as u64 > self.max_body_bytes {
                return Err(PostforgeError::Extraction(format!(
                    "{url}: body exceeds {} bytes",
                    self.max_body_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl ContentExtractor for HttpExtractor {
    #[instrument(skip_all, fields(url = %url))]
    async fn extract(&self, url: &str) -> Result<Document> {
        let start = Instant::now();
        let parsed = Url::parse(url.trim())
            .map_err(|e| PostforgeError::input(format!("invalid url '{url}': {e}")))?;

        if !self.allow_private_hosts && is_blocked_target(&parsed) {
            warn!(url = %parsed, "refusing to fetch private or non-http target");
            return Err(PostforgeError::Extraction(format!(
                "{parsed}: target host is not allowed"
            )));
        }

        let body = self.fetch_page(&parsed).await?;

        let document = match extract_text(&body, self.selector.as_ref()) {
            Some(text) => Document::new(url, text),
            None => {
                warn!(url = %parsed, "no content nodes found");
                Document::placeholder(url)
            }
        };

        info!(
            chars = document.text.len(),
            placeholder = document.is_placeholder(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "extraction completed"
        );

        Ok(document)
    }
}
