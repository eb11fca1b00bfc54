//! Platform registry and the two-phase resolution contract.
//!
//! Every platform resolves a room in two steps:
//!
//! 1. [`PlatformResolver::fetch_metadata`]: find the canonical room id and
//!    learn whether the room is live, its title and its anchor.
//! 2. [`PlatformResolver::resolve_stream`]: if live, sign, assemble CDN
//!    candidates and normalize them into a [`StreamResult`].
//!
//! The platform set is closed; [`Platform`] is the registry.

pub mod douyin;
pub mod douyu;
pub mod huya;
pub mod piaopiao;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::{RoomMetadata, StreamResult};
use crate::quality::{Quality, QualityHint};
use crate::session::Session;

pub use douyin::DouyinResolver;
pub use douyu::DouyuResolver;
pub use huya::HuyaResolver;
pub use piaopiao::PreviewResolver;

/// Backup cap used when a platform does not set its own.
pub const DEFAULT_MAX_BACKUPS: usize = 4;

/// Supported platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Douyin,
    Huya,
    Douyu,
    Piaopiao,
    Huamao,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Douyin,
        Platform::Huya,
        Platform::Douyu,
        Platform::Piaopiao,
        Platform::Huamao,
    ];

    /// Short lowercase id used on the command line and in settings.
    pub fn id(self) -> &'static str {
        match self {
            Platform::Douyin => "douyin",
            Platform::Huya => "huya",
            Platform::Douyu => "douyu",
            Platform::Piaopiao => "piaopiao",
            Platform::Huamao => "huamao",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Douyin => "抖音",
            Platform::Huya => "虎牙直播",
            Platform::Douyu => "斗鱼直播",
            Platform::Piaopiao => "飘飘直播",
            Platform::Huamao => "花猫直播",
        }
    }

    /// Room page template; `{room_id}` is replaced by the caller's id.
    pub fn url_template(self) -> &'static str {
        match self {
            Platform::Douyin => "https://live.douyin.com/{room_id}",
            Platform::Huya => "https://www.huya.com/{room_id}",
            Platform::Douyu => "https://www.douyu.com/{room_id}",
            Platform::Piaopiao => {
                "https://m.pp.weimipopo.com/live/preview.html?uid=91648673&anchorUid={room_id}"
            }
            Platform::Huamao => {
                "https://h.catshow168.com/live/preview.html?uid=19066357&anchorUid={room_id}"
            }
        }
    }

    /// Resolver talking to the platform's production endpoints.
    pub fn resolver(self) -> Box<dyn PlatformResolver> {
        match self {
            Platform::Douyin => Box::new(DouyinResolver::default()),
            Platform::Huya => Box::new(HuyaResolver::default()),
            Platform::Douyu => Box::new(DouyuResolver::default()),
            Platform::Piaopiao => Box::new(PreviewResolver::piaopiao()),
            Platform::Huamao => Box::new(PreviewResolver::huamao()),
        }
    }

    /// Comma-separated ids, for help and error messages.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|p| p.id())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| Error::UnsupportedPlatform(s.trim().to_string()))
    }
}

/// Two-phase resolver implemented once per platform.
///
/// Resolvers hold configuration only. All per-call state lives in the
/// borrowed [`Session`].
#[async_trait]
pub trait PlatformResolver: Send + Sync {
    fn platform(&self) -> Platform;

    /// Ordered quality tiers; the first entry is the default.
    fn qualities(&self) -> &'static [Quality];

    /// Most backup URLs this platform returns.
    fn max_backups(&self) -> usize {
        DEFAULT_MAX_BACKUPS
    }

    /// Metadata phase. Fails with [`Error::Parse`] if no room id can be
    /// extracted from `url`.
    async fn fetch_metadata(&self, session: &Session, url: &str) -> Result<RoomMetadata>;

    /// Stream phase for a room known to be live, at an already resolved
    /// quality.
    async fn live_stream(
        &self,
        session: &Session,
        metadata: &RoomMetadata,
        quality: Quality,
    ) -> Result<StreamResult>;

    /// Stream phase. Offline rooms short-circuit to an empty result without
    /// signing anything.
    async fn resolve_stream(
        &self,
        session: &Session,
        metadata: &RoomMetadata,
        hint: &QualityHint,
    ) -> Result<StreamResult> {
        if !metadata.is_live {
            return Ok(StreamResult::offline(self.platform().id(), metadata));
        }
        let quality = hint.resolve(self.qualities());
        self.live_stream(session, metadata, quality).await
    }
}

/// Walk `path` (object keys or array indices) through a JSON value.
pub(crate) fn json_at<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a serde_json::Value> {
    path.iter().try_fold(value, |v, key| match v {
        serde_json::Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => v.get(*key),
    })
}

/// String or number at `path`, as a string.
pub(crate) fn json_str(value: &serde_json::Value, path: &[&str]) -> Option<String> {
    match json_at(value, path)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Value of query parameter `key` in `url`.
pub(crate) fn query_param(url: &str, key: &str) -> Option<String> {
    url::Url::parse(url).ok().and_then(|u| {
        u.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    })
}

/// Last non-empty path segment of `url`.
pub(crate) fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .rfind(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::RoomIdentity;

    #[test]
    fn registry_round_trips_ids() {
        for platform in Platform::ALL {
            assert_eq!(platform.id().parse::<Platform>().unwrap(), platform);
            assert_eq!(platform.resolver().platform(), platform);
            assert!(platform.url_template().contains("{room_id}"));
        }
        assert_eq!(" HUYA ".parse::<Platform>().unwrap(), Platform::Huya);
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let err = "bilibili".parse::<Platform>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform(ref p) if p == "bilibili"));
        assert_eq!(
            Platform::supported_list(),
            "douyin, huya, douyu, piaopiao, huamao"
        );
    }

    #[test]
    fn preview_templates_carry_anchor_uid() {
        let id = RoomIdentity::parse(Platform::Huamao, "777").unwrap();
        assert_eq!(query_param(&id.live_url, "anchorUid").as_deref(), Some("777"));
    }

    #[test]
    fn json_path_walks_objects_and_arrays() {
        let v = json!({"data": {"data": [{"status": 2, "title": "t"}]}});
        assert_eq!(json_str(&v, &["data", "data", "0", "status"]).as_deref(), Some("2"));
        assert_eq!(json_str(&v, &["data", "data", "0", "title"]).as_deref(), Some("t"));
        assert!(json_at(&v, &["data", "data", "1"]).is_none());
        assert!(json_str(&v, &["data"]).is_none());
    }

    #[test]
    fn path_segment_extraction() {
        assert_eq!(last_path_segment("https://www.huya.com/333003").as_deref(), Some("333003"));
        assert_eq!(last_path_segment("https://www.huya.com/abc/?x=1").as_deref(), Some("abc"));
        assert_eq!(last_path_segment("https://live.douyin.com/"), None);
        assert_eq!(last_path_segment("not a url"), None);
    }
}
