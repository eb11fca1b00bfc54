//! Douyu resolver.
//!
//! Stream URLs come from the `getH5Play` API, which needs a signature
//! produced by JavaScript embedded in the room page (see
//! [`crate::signing::script`]). Every alternate CDN listed in the answer is
//! requested again with its own fresh signature.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderValue, REFERER};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{json_str, last_path_segment, query_param, Platform, PlatformResolver};
use crate::aggregate::BackupAggregator;
use crate::error::{Error, Result};
use crate::fingerprint::ClientProfile;
use crate::model::{RoomMetadata, StreamCandidate, StreamResult};
use crate::quality::Quality;
use crate::session::Session;
use crate::signing::script::{extract_fragment, sign_blocking};
use crate::signing::SigningContext;

/// Device id the web player presents when it has none.
const DEVICE_ID: &str = "10000000000000000000000000003306";
/// Player build the stream API expects alongside the signature.
const PLAYER_VERSION: &str = "22011191";

const QUALITIES: &[Quality] = &[
    Quality::OD,
    Quality::BD,
    Quality::UHD,
    Quality::HD,
    Quality::SD,
    Quality::LD,
];

static PAGE_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<script id="vike_pageContext" type="application/json">(.*?)</script>"#)
        .expect("static regex")
});

/// Hosts the resolver talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DouyuEndpoints {
    /// Desktop site: room page, `betard` and the stream API.
    pub web: String,
    /// Mobile site, used to resolve vanity room aliases.
    pub mobile: String,
}

impl Default for DouyuEndpoints {
    fn default() -> Self {
        Self {
            web: "https://www.douyu.com".into(),
            mobile: "https://m.douyu.com".into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DouyuResolver {
    endpoints: DouyuEndpoints,
}

impl DouyuResolver {
    pub fn new(endpoints: DouyuEndpoints) -> Self {
        Self { endpoints }
    }

    async fn resolve_alias(&self, session: &Session, alias: &str) -> Result<String> {
        let url = format!("{}/{alias}", self.endpoints.mobile);
        let html = session
            .transport()
            .get_text(&url, &session.headers(ClientProfile::Desktop))
            .await?;
        room_id_from_mobile_page(&html)
    }

    /// Signer fragment from the room page. The page fetch is part of
    /// signing, so its failure is reported as a signing error.
    async fn signer_fragment(&self, session: &Session, rid: &str) -> Result<Arc<str>> {
        let page_url = format!("{}/{rid}", self.endpoints.web);
        let page = session
            .transport()
            .get_text(&page_url, &session.headers(ClientProfile::Desktop))
            .await
            .map_err(|e| Error::signing(format!("signer page unavailable: {e}")))?;
        Ok(Arc::from(extract_fragment(&page)?))
    }

    /// Sign and call the stream API once, optionally pinned to `cdn`.
    async fn h5_play(
        &self,
        session: &Session,
        fragment: &Arc<str>,
        rid: &str,
        rate: &str,
        cdn: Option<&str>,
    ) -> Result<H5PlayData> {
        let ctx = SigningContext::new(DEVICE_ID);
        let sig = sign_blocking(
            session.evaluator(),
            Arc::clone(fragment),
            rid.to_string(),
            ctx,
        )
        .await?;

        let mut form: Vec<(&str, &str)> = vec![
            ("v", sig.v.as_str()),
            ("did", sig.did.as_str()),
            ("tt", sig.tt.as_str()),
            ("sign", sig.sign.as_str()),
            ("ver", PLAYER_VERSION),
            ("rid", rid),
            ("rate", rate),
        ];
        if let Some(cdn) = cdn {
            form.push(("cdn", cdn));
        }

        let mut headers = session.headers(ClientProfile::Mobile);
        if let Ok(referer) = HeaderValue::from_str(&format!("{}/{rid}", self.endpoints.mobile)) {
            headers.insert(REFERER, referer);
        }

        let url = format!("{}/lapi/live/getH5Play/{rid}", self.endpoints.web);
        let text = session.transport().post_form(&url, &headers, &form).await?;
        parse_h5_play(&text)
    }
}

#[async_trait]
impl PlatformResolver for DouyuResolver {
    fn platform(&self) -> Platform {
        Platform::Douyu
    }

    fn qualities(&self) -> &'static [Quality] {
        QUALITIES
    }

    async fn fetch_metadata(&self, session: &Session, url: &str) -> Result<RoomMetadata> {
        let rid = match query_param(url, "rid").filter(|r| !r.is_empty()) {
            Some(rid) => rid,
            None => {
                let alias = last_path_segment(url)
                    .ok_or_else(|| Error::parse(format!("no douyu room id in {url}")))?;
                self.resolve_alias(session, &alias).await?
            }
        };

        let betard = format!("{}/betard/{rid}", self.endpoints.web);
        let text = session
            .transport()
            .get_text(&betard, &session.headers(ClientProfile::Desktop))
            .await?;
        let raw: Value = serde_json::from_str(&text)?;
        let room = BetardRoom::deserialize(
            raw.get("room")
                .ok_or_else(|| Error::parse("betard answer has no room"))?,
        )?;

        Ok(RoomMetadata {
            anchor_name: room.nickname,
            is_live: room.video_loop == 0 && room.show_status == 1,
            title: room.room_name.replace("&nbsp;", ""),
            room_id: json_str(&raw, &["room", "room_id"]).unwrap_or(rid),
            live_url: url.to_string(),
            raw,
        })
    }

    async fn live_stream(
        &self,
        session: &Session,
        metadata: &RoomMetadata,
        quality: Quality,
    ) -> Result<StreamResult> {
        let rid = metadata.room_id.as_str();
        let rate = rate(quality);

        let fragment = self.signer_fragment(session, rid).await?;
        let fragment = &fragment;

        let data = self.h5_play(session, fragment, rid, rate, None).await?;
        let primary = StreamCandidate::new(data.rtmp_cdn.clone(), data.stream_url());
        debug!(rid, cdn = %primary.cdn, alternates = data.cdns_with_name.len(), "douyu primary resolved");

        let tasks = data.alternate_cdns().map(|cdn| async move {
            let backup = self.h5_play(session, fragment, rid, rate, Some(cdn)).await?;
            Ok::<_, Error>(StreamCandidate::new(cdn, backup.stream_url()))
        });
        let backups = BackupAggregator::new(session.backup_cap(self.max_backups()))
            .collect(&primary.url, tasks)
            .await;

        // The web player records from the first alternate when there is one.
        let record = backups.first().map(|c| c.url.clone());

        Ok(StreamResult::live(
            self.platform().id(),
            metadata,
            quality,
            Some(primary),
            record,
            backups,
        ))
    }
}

/// `rate` parameter of the stream API for a tier.
pub fn rate(quality: Quality) -> &'static str {
    match quality {
        Quality::OD | Quality::BD => "0",
        Quality::UHD => "3",
        Quality::HD => "2",
        Quality::SD | Quality::LD => "1",
    }
}

fn room_id_from_mobile_page(html: &str) -> Result<String> {
    let json = PAGE_CONTEXT
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::parse("douyu mobile page has no page context"))?;
    let context: Value = serde_json::from_str(json.as_str())?;
    json_str(&context, &["pageProps", "room", "roomInfo", "roomInfo", "rid"])
        .ok_or_else(|| Error::parse("douyu page context has no rid"))
}

#[derive(Debug, Deserialize)]
struct BetardRoom {
    #[serde(default)]
    nickname: String,
    #[serde(rename = "videoLoop", default)]
    video_loop: i64,
    #[serde(default)]
    show_status: i64,
    #[serde(default)]
    room_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct H5PlayData {
    rtmp_url: String,
    rtmp_live: String,
    rtmp_cdn: String,
    #[serde(rename = "cdnsWithName")]
    cdns_with_name: Vec<CdnEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CdnEntry {
    cdn: String,
}

impl H5PlayData {
    fn stream_url(&self) -> String {
        if self.rtmp_url.is_empty() || self.rtmp_live.is_empty() {
            String::new()
        } else {
            format!("{}/{}", self.rtmp_url, self.rtmp_live)
        }
    }

    /// CDNs other than the one already serving the primary.
    fn alternate_cdns(&self) -> impl Iterator<Item = &str> {
        self.cdns_with_name
            .iter()
            .map(|c| c.cdn.as_str())
            .filter(move |cdn| !cdn.is_empty() && *cdn != self.rtmp_cdn)
    }
}

fn parse_h5_play(text: &str) -> Result<H5PlayData> {
    let body: Value = serde_json::from_str(text)?;

    let code = body.get("error").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let msg = body.get("msg").and_then(Value::as_str).unwrap_or_default();
        return Err(Error::UpstreamAuth(format!(
            "douyu stream API refused the request ({code}): {msg}"
        )));
    }

    match body.get("data") {
        Some(data) if data.is_object() => Ok(H5PlayData::deserialize(data)?),
        _ => Err(Error::parse("douyu stream API returned no data")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_table() {
        let rates: Vec<&str> = QUALITIES.iter().map(|q| rate(*q)).collect();
        assert_eq!(rates, ["0", "0", "3", "2", "1", "1"]);
    }

    #[test]
    fn stream_api_answer_is_parsed() {
        let data = parse_h5_play(
            r#"{"error":0,"msg":"ok","data":{
                "rtmp_url":"https://hw.douyucdn.cn/live","rtmp_live":"9999rOa.flv?wsAuth=x",
                "rtmp_cdn":"hw-h5",
                "cdnsWithName":[{"name":"A","cdn":"hw-h5"},{"name":"B","cdn":"tct-h5"},{"name":"C","cdn":""}]
            }}"#,
        )
        .unwrap();

        assert_eq!(data.stream_url(), "https://hw.douyucdn.cn/live/9999rOa.flv?wsAuth=x");
        assert_eq!(data.alternate_cdns().collect::<Vec<_>>(), ["tct-h5"]);
    }

    #[test]
    fn refused_signature_is_auth_error() {
        let err = parse_h5_play(r#"{"error":-5,"msg":"签名错误","data":""}"#).unwrap_err();
        assert!(matches!(err, Error::UpstreamAuth(ref m) if m.contains("-5")));
    }

    #[test]
    fn missing_data_is_parse_error() {
        assert!(matches!(parse_h5_play(r#"{"error":0}"#), Err(Error::Parse(_))));
        assert!(matches!(parse_h5_play("<html>"), Err(Error::Json(_))));
    }

    #[test]
    fn incomplete_stream_fields_give_empty_url() {
        let data = parse_h5_play(r#"{"error":0,"data":{"rtmp_url":"https://x"}}"#).unwrap();
        assert_eq!(data.stream_url(), "");
    }

    #[test]
    fn mobile_page_context_yields_rid() {
        let html = r#"<html><script id="vike_pageContext" type="application/json">{"pageProps":{"room":{"roomInfo":{"roomInfo":{"rid":9999,"nickname":"x"}}}}}</script></html>"#;
        assert_eq!(room_id_from_mobile_page(html).unwrap(), "9999");
        assert!(matches!(
            room_id_from_mobile_page("<html></html>"),
            Err(Error::Parse(_))
        ));
    }
}
