//! Huya resolver.
//!
//! The profile API returns one stream descriptor per CDN, each with an
//! anti-leech code. Turning a descriptor into a playable URL needs an
//! anonymous uid, obtained by a fresh anonymous login on every call.

use async_trait::async_trait;
use futures::future;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{json_at, json_str, last_path_segment, Platform, PlatformResolver};
use crate::aggregate::BackupAggregator;
use crate::error::{Error, Result};
use crate::fingerprint::ClientProfile;
use crate::model::{RoomMetadata, StreamCandidate, StreamResult};
use crate::quality::Quality;
use crate::session::Session;
use crate::signing::{anti_leech, AntiLeechCode, SigningContext};

const QUALITIES: &[Quality] = &[Quality::OD, Quality::UHD, Quality::HD, Quality::SD, Quality::LD];

/// Patterns that reveal the numeric room behind a vanity alias, in the
/// order they are tried.
static ALIAS_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(
            r#"(?i)<link\s+[^>]*rel=["']canonical["'][^>]*href=["']https?://www\.huya\.com/(\d+)["']"#,
        )
        .expect("static regex"),
        Regex::new(
            r#"(?i)<meta\s+[^>]*property=["']og:url["'][^>]*content=["']https?://www\.huya\.com/(\d+)["']"#,
        )
        .expect("static regex"),
        Regex::new(r#""lProfileRoom"\s*:\s*(\d+)"#).expect("static regex"),
    ]
});

/// Hosts the resolver talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuyaEndpoints {
    /// Mini-program profile API.
    pub profile_api: String,
    /// Anonymous login endpoint.
    pub login: String,
}

impl Default for HuyaEndpoints {
    fn default() -> Self {
        Self {
            profile_api: "https://mp.huya.com/cache.php".into(),
            login: "https://udblgn.huya.com/web/anonymousLogin".into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HuyaResolver {
    endpoints: HuyaEndpoints,
}

impl HuyaResolver {
    pub fn new(endpoints: HuyaEndpoints) -> Self {
        Self { endpoints }
    }

    async fn resolve_alias(&self, session: &Session, page_url: &str) -> Result<String> {
        let html = session
            .transport()
            .get_text(page_url, &session.headers(ClientProfile::Desktop))
            .await?;
        room_id_from_page(&html).ok_or_else(|| {
            Error::parse(format!("cannot resolve huya alias {page_url}; try the numeric room id"))
        })
    }

    /// Anonymous uid for this call only.
    async fn anonymous_uid(&self, session: &Session) -> Result<String> {
        let body = json!({
            "appId": 5002,
            "byPass": 3,
            "context": "",
            "version": "2.4",
            "data": {},
        });
        let text = session
            .transport()
            .post_json(&self.endpoints.login, &session.headers(ClientProfile::Desktop), &body)
            .await
            .map_err(|e| Error::UpstreamAuth(format!("anonymous login failed: {e}")))?;

        let answer: Value = serde_json::from_str(&text)
            .map_err(|e| Error::UpstreamAuth(format!("anonymous login answer unreadable: {e}")))?;
        json_str(&answer, &["data", "uid"])
            .filter(|uid| !uid.is_empty() && uid != "0")
            .ok_or_else(|| Error::UpstreamAuth("anonymous login returned no uid".into()))
    }
}

#[async_trait]
impl PlatformResolver for HuyaResolver {
    fn platform(&self) -> Platform {
        Platform::Huya
    }

    fn qualities(&self) -> &'static [Quality] {
        QUALITIES
    }

    async fn fetch_metadata(&self, session: &Session, url: &str) -> Result<RoomMetadata> {
        let segment = last_path_segment(url)
            .ok_or_else(|| Error::parse(format!("no huya room id in {url}")))?;
        let room_id = if segment.bytes().all(|b| b.is_ascii_digit()) {
            segment
        } else {
            debug!(alias = %segment, "resolving huya alias");
            self.resolve_alias(session, url).await?
        };

        let api = format!(
            "{}?m=Live&do=profileRoom&roomid={room_id}&showSecret=1",
            self.endpoints.profile_api
        );
        let text = session
            .transport()
            .get_text(&api, &session.headers(ClientProfile::Desktop))
            .await?;
        let raw: Value = serde_json::from_str(&text)?;
        if !json_at(&raw, &["data"]).is_some_and(Value::is_object) {
            return Err(Error::parse(format!("huya room {room_id} not found")));
        }

        Ok(RoomMetadata {
            anchor_name: json_str(&raw, &["data", "profileInfo", "nick"]).unwrap_or_default(),
            is_live: json_str(&raw, &["data", "realLiveStatus"]).as_deref() == Some("ON"),
            title: json_str(&raw, &["data", "liveData", "introduction"]).unwrap_or_default(),
            live_url: Platform::Huya.url_template().replace("{room_id}", &room_id),
            room_id,
            raw,
        })
    }

    async fn live_stream(
        &self,
        session: &Session,
        metadata: &RoomMetadata,
        quality: Quality,
    ) -> Result<StreamResult> {
        let descriptors: Vec<StreamDescriptor> = match json_at(
            &metadata.raw,
            &["data", "stream", "baseSteamInfoList"],
        ) {
            Some(list) => Vec::deserialize(list)?,
            None => Vec::new(),
        };
        if descriptors.is_empty() {
            warn!(room_id = %metadata.room_id, "huya room is live but lists no streams");
            return Ok(StreamResult::live(
                self.platform().id(),
                metadata,
                quality,
                None,
                None,
                Vec::new(),
            ));
        }

        // One login and one sequence id per resolution, shared by every CDN.
        let uid = self.anonymous_uid(session).await?;
        let ctx = SigningContext::new(String::new()).with_secret(uid);
        debug!(nonce = %ctx.nonce, descriptors = descriptors.len(), "signing huya streams");

        let mut candidates = Vec::with_capacity(descriptors.len());
        let mut first_error = None;
        for descriptor in &descriptors {
            match descriptor.candidate(&ctx, quality) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => {
                    warn!(cdn = %descriptor.cdn_type, error = %e, "skipping unsignable huya stream");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        let mut candidates = candidates.into_iter();
        let Some(primary) = candidates.next() else {
            return Err(first_error.unwrap_or_else(|| Error::parse("no huya stream could be signed")));
        };

        let backups = BackupAggregator::new(session.backup_cap(self.max_backups()))
            .collect(&primary.url, candidates.map(|c| future::ready(Ok::<_, Error>(c))))
            .await;

        let record = Some(primary.url.clone());
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

fn room_id_from_page(html: &str) -> Option<String> {
    ALIAS_PATTERNS
        .iter()
        .find_map(|re| re.captures(html).map(|c| c[1].to_string()))
}

/// One entry of `baseSteamInfoList`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StreamDescriptor {
    #[serde(rename = "sCdnType")]
    cdn_type: String,
    #[serde(rename = "sStreamName")]
    stream_name: String,
    #[serde(rename = "sFlvUrl")]
    flv_url: String,
    #[serde(rename = "sFlvAntiCode")]
    flv_anti_code: String,
}

impl StreamDescriptor {
    fn candidate(&self, ctx: &SigningContext, quality: Quality) -> Result<StreamCandidate> {
        let code = AntiLeechCode::parse(&self.flv_anti_code);
        let token = anti_leech::sign(&code, &self.stream_name, ctx, quality)?;
        let url = format!("{}/{}.flv?{}", self.flv_url, self.stream_name, token.query)
            .replace("http://", "https://");
        Ok(StreamCandidate::new(self.cdn_type.clone(), url))
    }
}
