//! HTTP client used by every resolver.
//!
//! Features:
//! - Optional per-call HTTP(S) proxy
//! - Brotli, Gzip, Deflate (auto-negotiated)
//! - Cookie jar scoped to one resolution
//! - Non-success statuses surfaced as [`Error::Status`]

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Proxy, Response};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Thin wrapper over a `reqwest::Client` configured for platform APIs.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build a client, optionally routed through `proxy`.
    pub fn new(proxy: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true);

        if let Some(proxy) = proxy.filter(|p| !p.is_empty()) {
            let proxy = Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// GET `url` and return the body as text.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn get_text(&self, url: &str, headers: &HeaderMap) -> Result<String> {
        let response = self.client.get(url).headers(headers.clone()).send().await?;
        read_text(response).await
    }

    /// POST a form-encoded body and return the response text.
    #[instrument(skip(self, headers, form), fields(url = %url))]
    pub async fn post_form<F: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &HeaderMap,
        form: &F,
    ) -> Result<String> {
        let response = self
            .client
            .post(url)
            .headers(headers.clone())
            .form(form)
            .send()
            .await?;
        read_text(response).await
    }

    /// POST a JSON body and return the response text.
    #[instrument(skip(self, headers, body), fields(url = %url))]
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &B,
    ) -> Result<String> {
        let response = self
            .client
            .post(url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await?;
        read_text(response).await
    }

    /// Whether `url` currently answers with a success status.
    ///
    /// Only the headers are awaited; the (possibly endless) media body is
    /// dropped unread.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn probe(&self, url: &str, headers: &HeaderMap) -> bool {
        match self.client.get(url).headers(headers.clone()).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "probe");
                response.status().is_success()
            }
            Err(e) => {
                debug!(error = %e, "probe failed");
                false
            }
        }
    }
}

async fn read_text(response: Response) -> Result<String> {
    let status = response.status();
    debug!(%status, version = ?response.version(), "Response received");

    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }

    Ok(response.text().await?)
}
