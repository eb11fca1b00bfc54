//! Per-call resolution state.
//!
//! A [`Session`] owns everything one resolution needs to talk to a platform:
//! the HTTP client (and its cookie jar), retry policy, caller cookies and the
//! script evaluator. It is built at the start of a call and dropped at the
//! end; resolvers only ever borrow it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::config::Settings;
use crate::error::Result;
use crate::fingerprint::ClientProfile;
use crate::http_client::HttpClient;
use crate::js_engine::{QuickJsEvaluator, ScriptEvaluator};
use crate::platform::Platform;
use crate::retry::RetryPolicy;
use crate::transport::RetryingTransport;

pub struct Session {
    transport: RetryingTransport,
    evaluator: Arc<dyn ScriptEvaluator>,
    cookies: Option<String>,
    max_backups: Option<usize>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport)
            .field("cookies", &self.cookies.as_ref().map(|_| "<redacted>"))
            .field("max_backups", &self.max_backups)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn transport(&self) -> &RetryingTransport {
        &self.transport
    }

    /// Shared handle, so signing can move to the blocking pool.
    pub fn evaluator(&self) -> Arc<dyn ScriptEvaluator> {
        Arc::clone(&self.evaluator)
    }

    pub fn cookies(&self) -> Option<&str> {
        self.cookies.as_deref()
    }

    /// Base headers for `profile`, carrying the caller's cookies if any.
    pub fn headers(&self, profile: ClientProfile) -> HeaderMap {
        profile.headers(self.cookies())
    }

    /// Backup cap for this call: the configured override, else the
    /// platform's own limit.
    pub fn backup_cap(&self, platform_default: usize) -> usize {
        self.max_backups.unwrap_or(platform_default)
    }
}

/// Builder for [`Session`].
#[derive(Clone)]
pub struct SessionBuilder {
    proxy: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
    cookies: Option<String>,
    evaluator: Option<Arc<dyn ScriptEvaluator>>,
    max_backups: Option<usize>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            cookies: None,
            evaluator: None,
            max_backups: None,
        }
    }
}

impl SessionBuilder {
    /// Start from `settings` for `platform`. `proxy` overrides the
    /// configured proxy.
    pub fn from_settings(settings: &Settings, platform: Platform, proxy: Option<&str>) -> Self {
        Self {
            proxy: settings.effective_proxy(proxy).map(str::to_string),
            timeout: settings.timeout(),
            retry: settings.retry_policy(),
            cookies: settings.cookies_for(platform).map(str::to_string),
            evaluator: None,
            max_backups: settings.max_backups,
        }
    }

    #[must_use]
    pub fn proxy(mut self, proxy: Option<&str>) -> Self {
        self.proxy = proxy.map(str::to_string);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn cookies(mut self, cookies: Option<&str>) -> Self {
        self.cookies = cookies.filter(|c| !c.is_empty()).map(str::to_string);
        self
    }

    #[must_use]
    pub fn evaluator(mut self, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    #[must_use]
    pub fn max_backups(mut self, max: Option<usize>) -> Self {
        self.max_backups = max;
        self
    }

    pub fn build(self) -> Result<Session> {
        let http = HttpClient::new(self.proxy.as_deref(), self.timeout)?;
        Ok(Session {
            transport: RetryingTransport::new(http, self.retry),
            evaluator: self
                .evaluator
                .unwrap_or_else(|| Arc::new(QuickJsEvaluator::new())),
            cookies: self.cookies,
            max_backups: self.max_backups,
        })
    }
}
