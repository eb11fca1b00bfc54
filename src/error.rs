//! Error taxonomy for room resolution.
//!
//! A room that is merely offline is *not* an error: it resolves to a
//! [`StreamResult`](crate::StreamResult) with `is_live == false`.

use std::fmt;

use thiserror::Error;

/// Errors raised while resolving a room.
#[derive(Error, Debug)]
pub enum Error {
    /// Room id, page structure or payload shape not recognized.
    #[error("parse error: {0}")]
    Parse(String),

    /// Signing fragment missing or changed, signer page unreachable, or the
    /// evaluator failed.
    #[error("signing error: {0}")]
    Signing(String),

    /// Network-level failure (connect, TLS, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Anonymous login failed (at any level, once retries are spent) or the
    /// platform rejected the signature.
    #[error("upstream auth failed: {0}")]
    UpstreamAuth(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether a retry could plausibly succeed.
    ///
    /// Only transport and HTTP status failures qualify; parse and signing
    /// failures are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Status { .. })
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub(crate) fn signing(msg: impl Into<String>) -> Self {
        Error::Signing(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The resolution phase an error surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Metadata,
    Signing,
    Stream,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Metadata => "metadata fetch",
            Phase::Signing => "signing",
            Phase::Stream => "stream resolution",
        })
    }
}

/// An [`Error`] tagged with the phase that produced it.
#[derive(Error, Debug)]
#[error("{phase} failed: {source}")]
pub struct ResolveError {
    pub phase: Phase,
    #[source]
    pub source: Error,
}

impl ResolveError {
    pub fn new(phase: Phase, source: Error) -> Self {
        Self { phase, source }
    }

    /// Tag an error raised during stream resolution.
    ///
    /// Signing and login failures are attributed to [`Phase::Signing`]
    /// even though they happen inside `resolve_stream`.
    pub fn from_stream(source: Error) -> Self {
        let phase = match source {
            Error::Signing(_) | Error::UpstreamAuth(_) => Phase::Signing,
            _ => Phase::Stream,
        };
        Self { phase, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_class_errors_retry() {
        assert!(Error::Status {
            status: 502,
            url: "https://example.com".into()
        }
        .is_retryable());
        assert!(!Error::parse("no room id").is_retryable());
        assert!(!Error::signing("pattern changed").is_retryable());
        assert!(!Error::UpstreamAuth("no uid".into()).is_retryable());
    }

    #[test]
    fn stream_errors_are_tagged_by_kind() {
        let err = ResolveError::from_stream(Error::signing("gone"));
        assert_eq!(err.phase, Phase::Signing);

        let err = ResolveError::from_stream(Error::parse("bad json"));
        assert_eq!(err.phase, Phase::Stream);
        assert_eq!(err.to_string(), "stream resolution failed: parse error: bad json");
    }
}
