//! Allow-listed HTTP GET with a per-attempt timeout and bounded retries.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::FetchSettings;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::redact::redact_url;
use crate::retry::RetryPolicy;
use crate::FetchError;

/// Seam the orchestrator fetches through.
pub trait Fetcher: Send + Sync {
    /// Fetch `url` as text. Must refuse, without I/O, any URL that does not
    /// start with one of `allowed_prefixes`.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        allowed_prefixes: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>>;
}

/// Whether `url` starts with any non-empty allowed prefix.
pub fn is_allowed(url: &str, allowed_prefixes: &[String]) -> bool {
    allowed_prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && url.starts_with(prefix.as_str()))
}

/// Stateless fetch client; one instance is reused for every source of a run.
#[derive(Clone)]
pub struct FetchClient {
    http: Arc<dyn HttpClient>,
    retry: RetryPolicy,
    timeout_ms: u64,
}

impl FetchClient {
    pub fn new(http: Arc<dyn HttpClient>, retry: RetryPolicy, timeout_ms: u64) -> Self {
        Self {
            http,
            retry,
            timeout_ms,
        }
    }

    /// Reqwest-backed client configured from settings.
    pub fn from_settings(settings: &FetchSettings) -> Result<Self, FetchError> {
        let http = ReqwestHttpClient::new(&settings.user_agent)
            .map_err(|error| FetchError::Client(error.message().to_owned()))?;
        Ok(Self::new(
            Arc::new(http),
            RetryPolicy::new(settings.retries),
            settings.timeout_ms,
        ))
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn get_text(&self, url: &str, allowed_prefixes: &[String]) -> Result<String, FetchError> {
        let redacted = redact_url(url);
        if !is_allowed(url, allowed_prefixes) {
            tracing::warn!(url = %redacted, "refusing fetch outside the allow-list");
            return Err(FetchError::NotAllowed { url: redacted });
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = HttpRequest::get(url).with_timeout_ms(self.timeout_ms);
            let failure = match self.http.execute(request).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!(url = %redacted, attempt, bytes = response.body.len(), "fetched");
                    return Ok(response.body);
                }
                Ok(response) => FetchError::Status {
                    url: redacted.clone(),
                    status: response.status,
                    attempts: attempt,
                },
                Err(error) => FetchError::Transport {
                    url: redacted.clone(),
                    message: error.message().to_owned(),
                    attempts: attempt,
                },
            };

            if !self.retry.should_retry(attempt) {
                return Err(failure);
            }
            tracing::debug!(url = %redacted, attempt, error = %failure, "fetch attempt failed, retrying");
            if !self.retry.delay.is_zero() {
                tokio::time::sleep(self.retry.delay).await;
            }
        }
    }
}

impl Fetcher for FetchClient {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        allowed_prefixes: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>> {
        Box::pin(self.get_text(url, allowed_prefixes))
    }
}
