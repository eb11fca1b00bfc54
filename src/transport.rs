//! Outbound calls with retry.

use reqwest::header::HeaderMap;
use serde::Serialize;

use crate::error::Result;
use crate::http_client::HttpClient;
use crate::retry::RetryPolicy;

/// [`HttpClient`] with every call wrapped in the same [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryingTransport {
    http: HttpClient,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(http: HttpClient, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn get_text(&self, url: &str, headers: &HeaderMap) -> Result<String> {
        self.policy
            .run(url, || self.http.get_text(url, headers))
            .await
    }

    pub async fn post_form<F: Serialize + ?Sized + Sync>(
        &self,
        url: &str,
        headers: &HeaderMap,
        form: &F,
    ) -> Result<String> {
        self.policy
            .run(url, || self.http.post_form(url, headers, form))
            .await
    }

    pub async fn post_json<B: Serialize + ?Sized + Sync>(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &B,
    ) -> Result<String> {
        self.policy
            .run(url, || self.http.post_json(url, headers, body))
            .await
    }

    /// Availability check. Not retried: a dead tier is a normal answer.
    pub async fn probe(&self, url: &str, headers: &HeaderMap) -> bool {
        self.http.probe(url, headers).await
    }
}
