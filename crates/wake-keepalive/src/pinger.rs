use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{KeepAliveError, KeepAliveResult};

/// Transport used for the health-check request.
#[async_trait]
pub trait Pinger: Send + Sync + 'static {
    /// Issues `GET url` and returns the HTTP status code.
    ///
    /// Any failure to obtain a status (connect, TLS, timeout) is
    /// [`KeepAliveError::Transport`].
    async fn ping(&self, url: &str) -> KeepAliveResult<u16>;
}

/// [`Pinger`] backed by a `reqwest` client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpPinger {
    client: Client,
}

impl HttpPinger {
    pub fn new(timeout: Duration) -> KeepAliveResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(KeepAliveError::Client)?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Pinger for HttpPinger {
    async fn ping(&self, url: &str) -> KeepAliveResult<u16> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| KeepAliveError::transport(url, e))?;
        Ok(response.status().as_u16())
    }
}
