use std::collections::HashSet;

use anyhow::Result;
use serde::Serialize;

use livefetch::{Platform, StreamResult};

/// Compact answer printed by default.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Envelope {
    pub platform: String,
    pub rid: String,
    pub title: String,
    pub anchor: String,
    pub urls: Vec<UrlEntry>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UrlEntry {
    pub url: String,
}

impl Envelope {
    /// Primary, record and backup URLs in that order, without repeats.
    pub fn new(platform: Platform, rid: &str, result: &StreamResult) -> Self {
        let mut seen = HashSet::new();
        let urls = std::iter::once(&result.primary_url)
            .chain(std::iter::once(&result.record_url))
            .chain(&result.backup_urls)
            .filter(|u| !u.is_empty() && seen.insert(u.as_str()))
            .map(|u| UrlEntry { url: u.clone() })
            .collect();

        Self {
            platform: platform.display_name().to_string(),
            rid: rid.to_string(),
            title: result.title.clone(),
            anchor: result.anchor_name.clone(),
            urls,
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(primary: &str, record: &str, backups: &[&str]) -> StreamResult {
        StreamResult {
            platform: "huya".into(),
            anchor_name: "anchor".into(),
            is_live: !primary.is_empty(),
            title: "title".into(),
            live_url: "https://www.huya.com/1".into(),
            quality: None,
            primary_url: primary.into(),
            record_url: record.into(),
            backup_urls: backups.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn urls_are_ordered_and_unique() {
        let env = Envelope::new(Platform::Huya, "1", &result("a", "a", &["b", "c"]));
        let urls: Vec<&str> = env.urls.iter().map(|u| u.url.as_str()).collect();
        assert_eq!(urls, ["a", "b", "c"]);
        assert_eq!(env.platform, "虎牙直播");
        assert_eq!(env.anchor, "anchor");
    }

    #[test]
    fn distinct_record_url_is_listed_second() {
        let env = Envelope::new(Platform::Douyin, "7", &result("x.flv", "x.m3u8", &[]));
        let urls: Vec<&str> = env.urls.iter().map(|u| u.url.as_str()).collect();
        assert_eq!(urls, ["x.flv", "x.m3u8"]);
    }

    #[test]
    fn offline_room_has_no_urls() {
        let env = Envelope::new(Platform::Douyu, "9999", &result("", "", &[]));
        assert!(env.urls.is_empty());
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["rid"], "9999");
        assert_eq!(json["urls"], serde_json::json!([]));
    }
}
