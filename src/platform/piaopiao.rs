//! Piaopiao and Huamao resolver.
//!
//! Both apps run the same backend on different hosts: a single `preview`
//! call returns the anchor, the live flag and an HLS pull URL.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde_json::{json, Value};

use super::{json_at, json_str, query_param, Platform, PlatformResolver};
use crate::error::{Error, Result};
use crate::fingerprint::ClientProfile;
use crate::model::{RoomMetadata, StreamCandidate, StreamResult};
use crate::quality::Quality;
use crate::session::Session;

/// The preview API serves a single rendition.
const QUALITIES: &[Quality] = &[Quality::OD];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewResolver {
    platform: Platform,
    /// Preview API endpoint.
    api: String,
    /// Web front-end the API expects requests to come from.
    origin: String,
}

impl PreviewResolver {
    pub fn new(platform: Platform, api: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            platform,
            api: api.into(),
            origin: origin.into(),
        }
    }

    pub fn piaopiao() -> Self {
        Self::new(
            Platform::Piaopiao,
            "https://api.pp.weimipopo.com/live/preview",
            "https://m.pp.weimipopo.com",
        )
    }

    pub fn huamao() -> Self {
        Self::new(
            Platform::Huamao,
            "https://api.catshow168.com/live/preview",
            "https://h.catshow168.com",
        )
    }

    fn headers(&self, session: &Session) -> HeaderMap {
        let mut headers = session.headers(ClientProfile::Mobile);
        if let Ok(origin) = HeaderValue::from_str(&self.origin) {
            headers.insert(ORIGIN, origin.clone());
            headers.insert(REFERER, origin);
        }
        headers
    }
}

#[async_trait]
impl PlatformResolver for PreviewResolver {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn qualities(&self) -> &'static [Quality] {
        QUALITIES
    }

    async fn fetch_metadata(&self, session: &Session, url: &str) -> Result<RoomMetadata> {
        let anchor = query_param(url, "anchorUid")
            .filter(|a| !a.is_empty())
            .ok_or_else(|| Error::parse(format!("no anchorUid in {url}")))?;

        let body = json!({ "inviteUuid": "", "anchorUuid": anchor });
        let text = session
            .transport()
            .post_json(&self.api, &self.headers(session), &body)
            .await?;
        let raw: Value = serde_json::from_str(&text)?;
        let data = json_at(&raw, &["data"])
            .filter(|d| d.is_object())
            .ok_or_else(|| Error::parse(format!("{} anchor {anchor} not found", self.platform)))?;

        Ok(RoomMetadata {
            anchor_name: json_str(data, &["name"]).unwrap_or_default(),
            is_live: data.get("living").and_then(Value::as_bool).unwrap_or(false),
            title: json_str(data, &["title"]).unwrap_or_default(),
            room_id: anchor,
            live_url: url.to_string(),
            raw: data.clone(),
        })
    }

    async fn live_stream(
        &self,
        _session: &Session,
        metadata: &RoomMetadata,
        quality: Quality,
    ) -> Result<StreamResult> {
        let pull_url = json_str(&metadata.raw, &["pullUrl"])
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::parse(format!("{} room is live but has no pullUrl", self.platform)))?;

        Ok(StreamResult::live(
            self.platform.id(),
            metadata,
            quality,
            Some(StreamCandidate::new(self.platform.id(), pull_url)),
            None,
            Vec::new(),
        ))
    }
}
