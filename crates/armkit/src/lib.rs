//! # armkit
//!
//! A small blocking client for Azure Resource Manager style REST APIs.
//!
//! Resources are addressed by path (`/subscriptions/.../resourceGroups/rg`)
//! and an `api-version`. The client covers the three calls a declarative
//! reconciler needs:
//!
//! - [`Client::get`]: `None` on 404
//! - [`Client::put`]: returns the resource, re-reading it when the service
//!   answers 201/202 with an empty body
//! - [`Client::delete`]: 404 counts as success
//!
//! Transient failures (network, 429, 5xx) are retried with exponential
//! backoff honouring `Retry-After`.
//!
//! ## Example
//!
//! ```no_run
//! use armkit::{Client, ClientConfig};
//!
//! let client = Client::new(ClientConfig {
//!     token: std::env::var("AZURE_ACCESS_TOKEN").ok(),
//!     ..ClientConfig::default()
//! });
//! let rg = client
//!     .get("/subscriptions/0000/resourceGroups/rg-demo", "2021-04-01")
//!     .unwrap();
//! println!("{rg:?}");
//! ```

pub mod error;
pub mod retry;
pub mod transport;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use retry::{LogCallback, RetryCallback, RetryNotice, with_retry};
pub use transport::{Method, Request, Response, Transport, UreqTransport};
pub use types::{ClientConfig, DEFAULT_ENDPOINT, RetryConfig};

use serde_json::Value;

/// ARM client over a [`Transport`]
pub struct Client<T = UreqTransport> {
    transport: T,
    config: ClientConfig,
    retry: RetryConfig,
}

impl Client<UreqTransport> {
    /// Create a client using the real HTTP transport
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let retry = config.retry();
        Self {
            transport,
            config,
            retry,
        }
    }

    /// Override the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Full URL for a resource path
    pub fn url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/'),
            api_version
        )
    }

    /// Read a resource; `None` when it does not exist
    pub fn get(&self, path: &str, api_version: &str) -> Result<Option<Value>> {
        match self.call(Method::Get, path, api_version, None) {
            Ok(response) => response.json(),
            Err(e) if e.category() == ErrorCategory::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create or replace a resource and return its state
    pub fn put(&self, path: &str, api_version: &str, body: &Value) -> Result<Value> {
        let response = self.call(Method::Put, path, api_version, Some(body))?;
        if let Some(value) = response.json()? {
            return Ok(value);
        }

        log::debug!("PUT {path} returned {} without a body; reading back", response.status);
        self.get(path, api_version)?.ok_or_else(|| {
            Error::InvalidResponse(format!("{path} not found after PUT returned {}", response.status))
        })
    }

    /// Delete a resource; a missing resource is not an error
    pub fn delete(&self, path: &str, api_version: &str) -> Result<()> {
        match self.call(Method::Delete, path, api_version, None) {
            Ok(_) => Ok(()),
            Err(e) if e.category() == ErrorCategory::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn call(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&Value>,
    ) -> Result<Response> {
        let request = Request {
            method,
            url: self.url(path, api_version),
            headers: self.headers(),
            body: body.cloned(),
        };

        with_retry(&self.retry, Some(&LogCallback), || {
            log::debug!("{} {}", method.as_str(), request.url);
            let response = self.transport.send(&request)?;
            log::trace!("{} {} -> {}", method.as_str(), request.url, response.status);
            if response.is_success() {
                Ok(response)
            } else {
                Err(Error::from_response(&response))
            }
        })
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), self.config.user_agent.clone()),
        ];
        if let Some(token) = &self.config.token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }
}
