//! Records passed between the resolution phases.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::quality::Quality;

/// Which room the caller wants, in the platform's own terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomIdentity {
    pub platform: Platform,
    /// Room id or URL fragment exactly as supplied.
    pub room_id: String,
    /// Page URL the metadata phase starts from.
    pub live_url: String,
}

impl RoomIdentity {
    /// Derive the identity from caller input.
    ///
    /// Full URLs are used as-is; anything else is substituted into the
    /// platform's URL template.
    pub fn parse(platform: Platform, input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::parse("empty room id"));
        }

        let live_url = if input.starts_with("http://") || input.starts_with("https://") {
            input.to_string()
        } else {
            platform.url_template().replace("{room_id}", input)
        };

        Ok(Self {
            platform,
            room_id: input.to_string(),
            live_url,
        })
    }
}

/// Result of the metadata phase. Never cached.
#[derive(Debug, Clone, Default)]
pub struct RoomMetadata {
    pub anchor_name: String,
    pub is_live: bool,
    pub title: String,
    /// Canonical platform room id (may differ from the vanity id supplied).
    pub room_id: String,
    pub live_url: String,
    /// Platform payload, consumed by the same platform's stream phase.
    pub raw: serde_json::Value,
}

/// Container/transport of a candidate URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Flv,
    M3u8,
    Rtmp,
}

impl Protocol {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("rtmp://") {
            Protocol::Rtmp
        } else if url.contains(".m3u8") {
            Protocol::M3u8
        } else {
            Protocol::Flv
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Flv => "flv",
            Protocol::M3u8 => "m3u8",
            Protocol::Rtmp => "rtmp",
        })
    }
}

/// One playable URL served by one CDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCandidate {
    pub cdn: String,
    pub url: String,
    pub protocol: Protocol,
}

impl StreamCandidate {
    pub fn new(cdn: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            cdn: cdn.into(),
            protocol: Protocol::from_url(&url),
            url,
        }
    }
}

/// Final, normalized answer for one room.
///
/// Built only through [`StreamResult::offline`] and [`StreamResult::live`],
/// which enforce the URL invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamResult {
    pub platform: String,
    pub anchor_name: String,
    pub is_live: bool,
    pub title: String,
    pub live_url: String,
    pub quality: Option<Quality>,
    pub primary_url: String,
    pub record_url: String,
    pub backup_urls: Vec<String>,
}
