//! Canonical [`StreamResult`] construction.

use std::collections::HashSet;

use crate::model::{RoomMetadata, StreamCandidate, StreamResult};
use crate::quality::Quality;

impl StreamResult {
    /// Result for a room that is not broadcasting: every URL field empty.
    pub fn offline(platform: &str, meta: &RoomMetadata) -> Self {
        Self {
            platform: platform.to_string(),
            anchor_name: meta.anchor_name.clone(),
            is_live: false,
            title: meta.title.clone(),
            live_url: meta.live_url.clone(),
            quality: None,
            primary_url: String::new(),
            record_url: String::new(),
            backup_urls: Vec::new(),
        }
    }

    /// Result for a live room.
    ///
    /// `record` defaults to the primary URL. Empty and duplicate backups are
    /// dropped, as is any backup equal to the primary. An empty primary is
    /// replaced by the first usable backup.
    pub fn live(
        platform: &str,
        meta: &RoomMetadata,
        quality: Quality,
        primary: Option<StreamCandidate>,
        record: Option<String>,
        backups: impl IntoIterator<Item = StreamCandidate>,
    ) -> Self {
        let mut backups: Vec<String> = backups
            .into_iter()
            .map(|c| c.url)
            .filter(|u| !u.is_empty())
            .collect();

        let mut primary_url = primary.map(|c| c.url).unwrap_or_default();
        if primary_url.is_empty() && !backups.is_empty() {
            primary_url = backups.remove(0);
        }

        let mut seen = HashSet::new();
        seen.insert(primary_url.clone());
        backups.retain(|u| seen.insert(u.clone()));

        let record_url = match record {
            Some(r) if !r.is_empty() && !primary_url.is_empty() => r,
            _ => primary_url.clone(),
        };

        Self {
            platform: platform.to_string(),
            anchor_name: meta.anchor_name.clone(),
            is_live: true,
            title: meta.title.clone(),
            live_url: meta.live_url.clone(),
            quality: Some(quality),
            primary_url,
            record_url,
            backup_urls: backups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> RoomMetadata {
        RoomMetadata {
            anchor_name: "anchor".into(),
            is_live: true,
            title: "title".into(),
            room_id: "1".into(),
            live_url: "https://live.example/1".into(),
            raw: serde_json::Value::Null,
        }
    }

    fn cand(url: &str) -> StreamCandidate {
        StreamCandidate::new("cdn", url)
    }

    #[test]
    fn offline_has_no_urls() {
        let r = StreamResult::offline("Huya", &meta());
        assert!(!r.is_live);
        assert!(r.primary_url.is_empty());
        assert!(r.record_url.is_empty());
        assert!(r.backup_urls.is_empty());
        assert_eq!(r.quality, None);
    }

    #[test]
    fn record_falls_back_to_primary() {
        let r = StreamResult::live("Huya", &meta(), Quality::OD, Some(cand("a.flv")), None, vec![]);
        assert_eq!(r.primary_url, "a.flv");
        assert_eq!(r.record_url, "a.flv");
    }

    #[test]
    fn backups_exclude_primary_duplicates_and_empties() {
        let r = StreamResult::live(
            "Douyu",
            &meta(),
            Quality::HD,
            Some(cand("a.flv")),
            Some("a.m3u8".into()),
            vec![cand("a.flv"), cand(""), cand("b.flv"), cand("b.flv"), cand("c.flv")],
        );
        assert_eq!(r.record_url, "a.m3u8");
        assert_eq!(r.backup_urls, vec!["b.flv", "c.flv"]);
    }

    #[test]
    fn empty_primary_promotes_first_backup() {
        let r = StreamResult::live(
            "Douyu",
            &meta(),
            Quality::OD,
            Some(cand("")),
            None,
            vec![cand("b.flv"), cand("c.flv")],
        );
        assert_eq!(r.primary_url, "b.flv");
        assert_eq!(r.record_url, "b.flv");
        assert_eq!(r.backup_urls, vec!["c.flv"]);
    }

    #[test]
    fn nothing_resolved_keeps_both_empty() {
        let r = StreamResult::live("Douyu", &meta(), Quality::OD, None, Some("x.m3u8".into()), vec![]);
        assert!(r.primary_url.is_empty());
        assert!(r.record_url.is_empty());
    }
}
