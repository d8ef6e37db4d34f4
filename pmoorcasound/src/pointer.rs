//! Transport for the `latest.txt` pointer resource
//!
//! [`PointerSource`] is the seam between the poller and the network. The
//! HTTP implementation is [`PointerClient`]; tests substitute in-memory
//! sources to control timing and failures.

use crate::error::{Error, Result};
use crate::resolver::PointerValue;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "PMOMusic/0.3.10 (pmoorcasound)";

/// Something that can answer "what is the newest pointer value at this address"
#[async_trait]
pub trait PointerSource: Send + Sync {
    /// Fetch and parse the pointer resource at `url`
    ///
    /// Anything other than a 200 response with a non-blank body is an error.
    async fn fetch_pointer(&self, url: &str) -> Result<PointerValue>;
}

/// HTTP client for pointer resources
///
/// Stateless: every call is one GET, nothing is cached.
#[derive(Debug, Clone)]
pub struct PointerClient {
    client: Client,
    timeout: Option<Duration>,
}

impl PointerClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> PointerClientBuilder {
        PointerClientBuilder::default()
    }

    /// Create a client with a custom reqwest::Client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Get the internal HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl PointerSource for PointerClient {
    async fn fetch_pointer(&self, url: &str) -> Result<PointerValue> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;

        // Only an exact 200 counts; redirects are followed by reqwest already
        if response.status() != StatusCode::OK {
            return Err(Error::UnexpectedStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        PointerValue::from_body(&body).ok_or_else(|| Error::EmptyPointer(url.to_string()))
    }
}

/// Builder for [`PointerClient`]
#[derive(Debug)]
pub struct PointerClientBuilder {
    client: Option<Client>,
    timeout: Option<Duration>,
    user_agent: String,
}

impl Default for PointerClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl PointerClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set a per-request timeout (none by default)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<PointerClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder().user_agent(&self.user_agent).build()?,
        };

        Ok(PointerClient {
            client,
            timeout: self.timeout,
        })
    }
}
