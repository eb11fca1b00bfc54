//! Douyin resolver.
//!
//! The web `room/enter` API returns FLV and HLS maps keyed by tier. The
//! untranscoded origin stream is hidden in an embedded JSON document and is
//! put in front of both maps, so index 0 is always the best tier.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{json_at, json_str, last_path_segment, Platform, PlatformResolver};
use crate::error::{Error, Result};
use crate::fingerprint::ClientProfile;
use crate::model::{RoomMetadata, StreamCandidate, StreamResult};
use crate::quality::Quality;
use crate::session::Session;

const QUALITIES: &[Quality] = &[Quality::OD, Quality::UHD, Quality::HD, Quality::SD, Quality::LD];

/// Guest `ttwid` accepted by the web API when the caller has none.
const GUEST_COOKIE: &str = "ttwid=1%7CLAOiG67XxtjE2IQz04Hy-v5HcWLaBb0xKxcGI2Kfezg%7C1757134101\
    %7C1256b68c29b63c9d830b144cc13aa64c1d6198e089658177977757ea20923265";

const STATUS_LIVE: i64 = 2;

/// Hosts the resolver talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DouyinEndpoints {
    pub enter_api: String,
}

impl Default for DouyinEndpoints {
    fn default() -> Self {
        Self {
            enter_api: "https://live.douyin.com/webcast/room/web/enter/".into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DouyinResolver {
    endpoints: DouyinEndpoints,
}

impl DouyinResolver {
    pub fn new(endpoints: DouyinEndpoints) -> Self {
        Self { endpoints }
    }
}

fn headers(session: &Session) -> HeaderMap {
    // The API only answers when a ttwid is present.
    let cookie = session
        .cookies()
        .filter(|c| c.contains("ttwid="))
        .unwrap_or(GUEST_COOKIE);
    let mut headers = ClientProfile::Desktop.headers(Some(cookie));
    headers.insert(REFERER, HeaderValue::from_static("https://live.douyin.com/"));
    headers
}

#[async_trait]
impl PlatformResolver for DouyinResolver {
    fn platform(&self) -> Platform {
        Platform::Douyin
    }

    fn qualities(&self) -> &'static [Quality] {
        QUALITIES
    }

    async fn fetch_metadata(&self, session: &Session, url: &str) -> Result<RoomMetadata> {
        let web_rid = last_path_segment(url)
            .ok_or_else(|| Error::parse(format!("no douyin room id in {url}")))?;

        let api = Url::parse_with_params(
            &self.endpoints.enter_api,
            [
                ("aid", "6383"),
                ("app_name", "douyin_web"),
                ("live_id", "1"),
                ("device_platform", "web"),
                ("language", "zh-CN"),
                ("browser_language", "zh-CN"),
                ("browser_platform", "Win32"),
                ("browser_name", "Chrome"),
                ("browser_version", "116.0.0.0"),
                ("web_rid", web_rid.as_str()),
            ],
        )
        .map_err(|e| Error::parse(format!("bad douyin API url: {e}")))?;

        let text = session
            .transport()
            .get_text(api.as_str(), &headers(session))
            .await?;
        let body: Value = serde_json::from_str(&text)?;

        let room = json_at(&body, &["data", "data", "0"])
            .filter(|r| r.is_object())
            .ok_or_else(|| Error::parse(format!("douyin room {web_rid} not found")))?;
        let status = room.get("status").and_then(Value::as_i64);
        debug!(web_rid = %web_rid, ?status, "douyin room status");

        Ok(RoomMetadata {
            anchor_name: json_str(&body, &["data", "user", "nickname"]).unwrap_or_default(),
            is_live: status == Some(STATUS_LIVE),
            title: json_str(room, &["title"]).unwrap_or_default(),
            live_url: Platform::Douyin.url_template().replace("{room_id}", &web_rid),
            room_id: web_rid,
            raw: room.clone(),
        })
    }

    async fn live_stream(
        &self,
        session: &Session,
        metadata: &RoomMetadata,
        quality: Quality,
    ) -> Result<StreamResult> {
        let stream_url = metadata
            .raw
            .get("stream_url")
            .ok_or_else(|| Error::parse("douyin room is live but has no stream_url"))?;
        let tiers = PullLists::from_stream_url(stream_url)?;

        let mut index = QUALITIES.iter().position(|q| *q == quality).unwrap_or(0);
        if !session.transport().probe(&tiers.hls[index], &headers(session)).await {
            let fallback = if index < QUALITIES.len() - 1 { index + 1 } else { index - 1 };
            debug!(from = index, to = fallback, "douyin tier unavailable, stepping");
            index = fallback;
        }

        let primary = StreamCandidate::new(quality.label(), tiers.flv[index].clone());
        let record = Some(tiers.hls[index].clone());

        Ok(StreamResult::live(
            self.platform().id(),
            metadata,
            quality,
            Some(primary),
            record,
            Vec::new(),
        ))
    }
}

/// FLV and HLS URLs by tier, origin first, padded to one entry per tier.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PullLists {
    flv: Vec<String>,
    hls: Vec<String>,
}

impl PullLists {
    fn from_stream_url(stream_url: &Value) -> Result<Self> {
        let origin = origin_urls(stream_url);

        let mut flv: Vec<String> = origin.iter().map(|(f, _)| f.clone()).collect();
        flv.extend(map_values(stream_url.get("flv_pull_url")));
        let mut hls: Vec<String> = origin.into_iter().map(|(_, h)| h).collect();
        hls.extend(map_values(stream_url.get("hls_pull_url_map")));

        if flv.is_empty() || hls.is_empty() {
            return Err(Error::parse("douyin stream_url has no pull urls"));
        }
        pad(&mut flv, QUALITIES.len());
        pad(&mut hls, QUALITIES.len());
        Ok(Self { flv, hls })
    }
}

/// Origin FLV and HLS URLs from the embedded `stream_data` document.
fn origin_urls(stream_url: &Value) -> Option<(String, String)> {
    let stream_data = json_str(stream_url, &["live_core_sdk_data", "pull_data", "stream_data"])?;
    let doc: Value = serde_json::from_str(&stream_data).ok()?;
    let main = json_at(&doc, &["data", "origin", "main"])?;

    let codec = match main.get("sdk_params") {
        Some(Value::String(s)) => serde_json::from_str::<Value>(s).ok(),
        Some(other) => Some(other.clone()),
        None => None,
    }
    .and_then(|params| json_str(&params, &["VCodec"]))
    .unwrap_or_default();

    let flv = main.get("flv")?.as_str()?;
    let hls = main.get("hls")?.as_str()?;
    Some((format!("{flv}&codec={codec}"), format!("{hls}&codec={codec}")))
}

fn map_values(map: Option<&Value>) -> Vec<String> {
    map.and_then(Value::as_object)
        .map(|m| {
            m.values()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Repeat the last entry until `list` has `len` entries.
fn pad(list: &mut Vec<String>, len: usize) {
    if let Some(last) = list.last().cloned() {
        if list.len() < len {
            list.resize(len, last);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn stream_url() -> Value {
        let stream_data = json!({
            "data": {"origin": {"main": {
                "flv": "https://pull-flv.douyincdn.com/stage/origin.flv?a=1",
                "hls": "https://pull-hls.douyincdn.com/stage/origin.m3u8?a=1",
                "sdk_params": "{\"VCodec\":\"h264\",\"vbitrate\":0}"
            }}}
        });
        json!({
            "flv_pull_url": {
                "FULL_HD1": "https://pull-flv.douyincdn.com/stage/fhd.flv",
                "HD1": "https://pull-flv.douyincdn.com/stage/hd.flv",
                "SD1": "https://pull-flv.douyincdn.com/stage/sd.flv"
            },
            "hls_pull_url_map": {
                "FULL_HD1": "https://pull-hls.douyincdn.com/stage/fhd.m3u8",
                "HD1": "https://pull-hls.douyincdn.com/stage/hd.m3u8",
                "SD1": "https://pull-hls.douyincdn.com/stage/sd.m3u8"
            },
            "live_core_sdk_data": {"pull_data": {"stream_data": stream_data.to_string()}}
        })
    }

    #[test]
    fn origin_goes_first_with_codec() {
        let lists = PullLists::from_stream_url(&stream_url()).unwrap();
        assert_eq!(
            lists.flv[0],
            "https://pull-flv.douyincdn.com/stage/origin.flv?a=1&codec=h264"
        );
        assert_eq!(
            lists.hls[0],
            "https://pull-hls.douyincdn.com/stage/origin.m3u8?a=1&codec=h264"
        );
        assert_eq!(lists.flv[1], "https://pull-flv.douyincdn.com/stage/fhd.flv");
        assert_eq!(lists.flv[3], "https://pull-flv.douyincdn.com/stage/sd.flv");
    }

    #[test]
    fn short_lists_are_padded_with_last_tier() {
        let mut url = stream_url();
        url["live_core_sdk_data"] = json!({});
        let lists = PullLists::from_stream_url(&url).unwrap();
        assert_eq!(lists.flv.len(), 5);
        assert_eq!(lists.hls.len(), 5);
        assert_eq!(lists.flv[4], "https://pull-flv.douyincdn.com/stage/sd.flv");
        assert_eq!(lists.hls[2], "https://pull-hls.douyincdn.com/stage/sd.m3u8");
    }

    #[test]
    fn empty_maps_are_parse_errors() {
        let err = PullLists::from_stream_url(&json!({"flv_pull_url": {}})).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn pad_never_truncates() {
        let mut list: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        pad(&mut list, 5);
        assert_eq!(list.len(), 7);

        let mut empty = Vec::new();
        pad(&mut empty, 5);
        assert!(empty.is_empty());
    }
}
