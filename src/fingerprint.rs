//! Client fingerprints for platform requests.
//!
//! Platforms serve different payloads (and different anti-bot checks) to
//! desktop browsers and to their mobile apps, so each request picks one of
//! two profiles.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, USER_AGENT};
use tracing::warn;

/// Real Chrome versions from 2024-2025 (high market share)
const CHROME_VERSIONS: &[&str] = &[
    "131.0.0.0",
    "130.0.0.0",
    "129.0.0.0",
    "128.0.0.0",
    "127.0.0.0",
];

const DESKTOP_OS: &[&str] = &[
    "Windows NT 10.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
];

/// User agent of the iOS live-streaming apps these APIs are built for.
const MOBILE_APP_UA: &str = "ios/7.830 (ios 17.0; ; iPhone 15 (A2846/A3089/A3090/A3092))";

const ACCEPT_LANGUAGE_ZH: &str = "zh-CN,zh;q=0.8,zh-TW;q=0.7,zh-HK;q=0.5,en-US;q=0.3,en;q=0.2";

/// Which client a request pretends to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientProfile {
    Desktop,
    Mobile,
}

impl ClientProfile {
    pub fn user_agent(self) -> String {
        match self {
            ClientProfile::Desktop => desktop_user_agent(),
            ClientProfile::Mobile => MOBILE_APP_UA.to_string(),
        }
    }

    /// Header set for this profile, with an optional cookie string.
    pub fn headers(self, cookie: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(ua) = HeaderValue::from_str(&self.user_agent()) {
            headers.insert(USER_AGENT, ua);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_ZH));

        if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
            match HeaderValue::from_str(cookie) {
                Ok(v) => {
                    headers.insert(COOKIE, v);
                }
                Err(_) => warn!("ignoring cookie string with invalid header characters"),
            }
        }

        headers
    }
}

fn desktop_user_agent() -> String {
    let mut rng = rand::thread_rng();
    let version = CHROME_VERSIONS.choose(&mut rng).copied().unwrap_or("131.0.0.0");
    // Windows is the bulk of real desktop traffic
    let os = if rng.gen_bool(0.75) { DESKTOP_OS[0] } else { DESKTOP_OS[1] };

    format!(
        "Mozilla/5.0 ({os}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{version} Safari/537.36"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_profile_is_chrome() {
        let ua = ClientProfile::Desktop.user_agent();
        assert!(ua.starts_with("Mozilla/5.0"));
        assert!(ua.contains("Chrome/"));
    }

    #[test]
    fn mobile_profile_is_app() {
        assert!(ClientProfile::Mobile.user_agent().starts_with("ios/"));
    }

    #[test]
    fn cookie_is_attached_when_present() {
        let headers = ClientProfile::Desktop.headers(Some("a=1; b=2"));
        assert_eq!(headers.get(COOKIE).unwrap(), "a=1; b=2");
        assert!(headers.contains_key(USER_AGENT));

        let headers = ClientProfile::Desktop.headers(Some(""));
        assert!(!headers.contains_key(COOKIE));
    }

    #[test]
    fn invalid_cookie_is_skipped() {
        let headers = ClientProfile::Mobile.headers(Some("bad\ncookie"));
        assert!(!headers.contains_key(COOKIE));
    }
}
