//! Configuration for the control-plane client.

use std::time::Duration;

use url::Url;

use naas_core::{Error, Result};

/// Default timeout for control-plane requests: 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default control-plane base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.naas.ai";

/// Configuration for [`NaasApiClient`](crate::NaasApiClient).
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Control-plane base URL.
    pub base_url: Url,
    /// Long-lived bearer token for API authentication.
    pub token: Option<String>,
    /// Timeout applied to every request.
    pub timeout: Duration,
    /// User-Agent header to send with requests.
    pub user_agent: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: Self::default_user_agent(),
        }
    }
}

impl ApiClientConfig {
    /// Returns the default user agent string.
    fn default_user_agent() -> String {
        format!("naas-client/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Fails when the base URL is not http(s) or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(Error::bad_request().with_message(format!(
                "base URL must be http(s), got '{}'",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::bad_request().with_message("request timeout must be non-zero"));
        }
        Ok(())
    }
}
