//! Token derivation for protected media URLs.
//!
//! Two families are implemented:
//!
//! - [`script`]: the platform ships obfuscated JavaScript that computes the
//!   request signature; we extract it, defuse it, and run it.
//! - [`anti_leech`]: the platform ships a base64 template; the access
//!   secret is an md5 over the filled-in template.

pub mod anti_leech;
pub mod script;

pub use anti_leech::{AntiLeechCode, AntiLeechToken};
pub use script::{sign_blocking, ScriptSignature, ScriptSigner};

/// Per-call signing inputs. Built fresh for every signing call so that
/// tokens are never replayed across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    /// Device id presented to the platform.
    pub device_id: String,
    /// Unix seconds at creation.
    pub timestamp: i64,
    /// Monotonic-ish sequence id (unix time in 1/10000 s).
    pub sequence: i64,
    /// Random id unique to this context; tags the log lines of one signing.
    pub nonce: String,
    /// Secret material obtained for this call only (e.g. an anonymous uid).
    pub secret: Option<String>,
}

impl SigningContext {
    pub fn new(device_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            device_id: device_id.into(),
            timestamp: now.timestamp(),
            sequence: now.timestamp_micros() / 100,
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            secret: None,
        }
    }

    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

/// Lowercase hex md5 of `input`.
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_known_vector() {
        assert_eq!(md5_hex("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn contexts_are_unique_per_call() {
        let a = SigningContext::new("did");
        let b = SigningContext::new("did");
        assert_ne!(a.nonce, b.nonce);
        assert_eq!(a.nonce.len(), 32);
        assert!(a.sequence >= a.timestamp * 10_000);
        assert_eq!(a.secret, None);
        assert_eq!(a.with_secret("uid").secret.as_deref(), Some("uid"));
    }
}
