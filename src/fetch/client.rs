//! Minimal HTTP client contract and its reqwest-backed implementation.
//!
//! The fetcher depends only on `fetch(url) -> FetchResponse`; tests and
//! embedders can substitute a scripted client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;

use crate::config::FetchConfig;

/// Boxed future used at the client and resolver seams
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of one HTTP retrieval
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Whether the status code signals success (2xx).
    pub status_ok: bool,
    pub status_code: u16,
    pub body: Vec<u8>,
}

/// Network collaborator contract
pub trait HttpClient: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, anyhow::Result<FetchResponse>>;
}

/// Production client backed by reqwest
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, anyhow::Result<FetchResponse>> {
        Box::pin(async move {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            let body = response.bytes().await?.to_vec();

            Ok(FetchResponse {
                status_ok: status.is_success(),
                status_code: status.as_u16(),
                body,
            })
        })
    }
}
