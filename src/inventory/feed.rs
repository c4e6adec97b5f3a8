//! Feed document parsing.
//!
//! The feed is a small XML document:
//!
//! ```xml
//! <ads rotation-interval="30">
//!   <ad weight="3">
//!     <href>https://example.com/landing</href>
//!     <sponsor-url>https://example.com</sponsor-url>
//!     <sponsor-name>Example Co</sponsor-name>
//!     <src>https://example.com/banner.png</src>
//!     <ad-title>Spring sale</ad-title>
//!     <ad-desc>Everything must go.</ad-desc>
//!     <ad-link>example.com</ad-link>
//!   </ad>
//! </ads>
//! ```
//!
//! The root element name is not checked. Unknown elements are ignored.

use serde::Deserialize;

use crate::inventory::FeedError;
use crate::inventory::record::{
    AdId, AdRecord, DEFAULT_HREF, DEFAULT_SPONSOR_NAME, DEFAULT_TITLE, MAX_WEIGHT,
};

/// Longest rotation interval a feed may request (one day, in seconds).
pub const MAX_ROTATION_INTERVAL: u64 = 24 * 60 * 60;

/// A parsed feed: normalized records plus the rotation cadence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedFeed {
    pub ads: Vec<AdRecord>,
    /// Seconds between rotation passes; 0 disables rotation. At most
    /// [`MAX_ROTATION_INTERVAL`].
    pub rotation_interval: u64,
}

impl LoadedFeed {
    /// The "no ads" fallback every failure degrades to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ads.is_empty()
    }
}

/// Values substituted for missing feed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDefaults {
    pub sponsor_name: String,
}

impl Default for FeedDefaults {
    fn default() -> Self {
        Self {
            sponsor_name: DEFAULT_SPONSOR_NAME.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedDocument {
    #[serde(rename = "@rotation-interval", default)]
    rotation_interval: Option<String>,
    #[serde(rename = "ad", default)]
    ads: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(rename = "@weight", default)]
    weight: Option<String>,
    #[serde(default)]
    href: Option<String>,
    #[serde(rename = "sponsor-url", default)]
    sponsor_url: Option<String>,
    #[serde(rename = "sponsor-name", default)]
    sponsor_name: Option<String>,
    #[serde(default)]
    src: Option<String>,
    #[serde(rename = "ad-title", default)]
    title: Option<String>,
    #[serde(rename = "ad-desc", default)]
    description: Option<String>,
    #[serde(rename = "ad-link", default)]
    display_link: Option<String>,
}

/// Parse a feed body into normalized records.
///
/// # Errors
/// Returns `FeedError::Malformed` when the body is empty or is not well-formed XML.
pub fn parse_feed(body: &str, defaults: &FeedDefaults) -> Result<LoadedFeed, FeedError> {
    if body.trim().is_empty() {
        return Err(FeedError::Malformed("empty document".to_string()));
    }

    let document: FeedDocument = quick_xml::de::from_str(body)?;

    let rotation_interval = document
        .rotation_interval
        .as_deref()
        .map(parse_rotation_interval)
        .unwrap_or(0);

    let ads = document
        .ads
        .into_iter()
        .map(|entry| entry.into_record(defaults))
        .collect();

    Ok(LoadedFeed {
        ads,
        rotation_interval,
    })
}

impl FeedEntry {
    fn into_record(self, defaults: &FeedDefaults) -> AdRecord {
        let href = present(self.href);
        let title = present(self.title);
        // Identity comes from the raw text, before defaults are applied.
        let id = AdId::fingerprint(
            href.as_deref().unwrap_or_default(),
            title.as_deref().unwrap_or_default(),
        );

        let href = href.unwrap_or_else(|| DEFAULT_HREF.to_string());
        let display_link = present(self.display_link).unwrap_or_else(|| href.clone());

        AdRecord {
            id,
            display_link,
            href,
            sponsor_name: present(self.sponsor_name)
                .unwrap_or_else(|| defaults.sponsor_name.clone()),
            sponsor_url: present(self.sponsor_url).unwrap_or_else(|| DEFAULT_HREF.to_string()),
            image_src: present(self.src).unwrap_or_default(),
            title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            description: present(self.description).unwrap_or_default(),
            weight: parse_weight(self.weight.as_deref()),
        }
    }
}

/// Trimmed text, or `None` when absent or blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Leading integer of `raw`: optional sign then digits, trailing text ignored
/// (`"2px"` is 2, `"3.5"` is 3). Saturates instead of overflowing.
fn leading_int(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit);
    let mut value: Option<i64> = None;
    for digit in digits {
        let digit = i64::from(digit - b'0');
        value = Some(
            value
                .unwrap_or(0)
                .saturating_mul(10)
                .saturating_add(digit),
        );
    }
    value.map(|v| if negative { -v } else { v })
}

/// Weight attribute clamped to `1..=MAX_WEIGHT`; non-numeric or missing means 1.
fn parse_weight(raw: Option<&str>) -> u32 {
    raw.and_then(leading_int)
        .map(|w| w.clamp(1, i64::from(MAX_WEIGHT)) as u32)
        .unwrap_or(1)
}

/// Rotation attribute clamped to `0..=MAX_ROTATION_INTERVAL`; non-numeric
/// means 0 (no rotation).
fn parse_rotation_interval(raw: &str) -> u64 {
    leading_int(raw).map_or(0, |s| s.clamp(0, MAX_ROTATION_INTERVAL as i64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ads rotation-interval="30">
  <ad weight="3">
    <href>https://example.com/a</href>
    <sponsor-url>https://example.com</sponsor-url>
    <sponsor-name>Example Co</sponsor-name>
    <src>https://example.com/a.png</src>
    <ad-title>Spring sale</ad-title>
    <ad-desc>Everything &amp; more.</ad-desc>
    <ad-link>example.com/a</ad-link>
  </ad>
  <ad>
    <href>https://example.org/b</href>
  </ad>
</ads>"#;

    #[test]
    fn test_parse_full_feed() {
        let feed = parse_feed(FEED, &FeedDefaults::default()).unwrap();
        assert_eq!(feed.rotation_interval, 30);
        assert_eq!(feed.ads.len(), 2);

        let a = &feed.ads[0];
        assert_eq!(a.weight, 3);
        assert_eq!(a.href, "https://example.com/a");
        assert_eq!(a.sponsor_name, "Example Co");
        assert_eq!(a.sponsor_url, "https://example.com");
        assert_eq!(a.image_src, "https://example.com/a.png");
        assert_eq!(a.title, "Spring sale");
        assert_eq!(a.description, "Everything & more.");
        assert_eq!(a.display_link, "example.com/a");
        assert_eq!(a.id, AdId::fingerprint("https://example.com/a", "Spring sale"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let defaults = FeedDefaults {
            sponsor_name: "House Brand".to_string(),
        };
        let feed = parse_feed(FEED, &defaults).unwrap();
        let b = &feed.ads[1];

        assert_eq!(b.weight, 1);
        assert_eq!(b.title, DEFAULT_TITLE);
        assert_eq!(b.sponsor_name, "House Brand");
        assert_eq!(b.sponsor_url, DEFAULT_HREF);
        assert_eq!(b.display_link, "https://example.org/b");
        assert_eq!(b.description, "");
        // Fingerprint uses the raw (empty) title, not the default.
        assert_eq!(b.id, AdId::fingerprint("https://example.org/b", ""));
    }

    #[test]
    fn test_missing_rotation_interval_is_zero() {
        let feed = parse_feed("<ads><ad><href>x</href></ad></ads>", &FeedDefaults::default())
            .unwrap();
        assert_eq!(feed.rotation_interval, 0);
        assert_eq!(feed.ads.len(), 1);
    }

    #[test]
    fn test_root_without_ads_is_empty_inventory() {
        let feed = parse_feed(r#"<ads rotation-interval="10"/>"#, &FeedDefaults::default())
            .unwrap();
        assert!(feed.is_empty());
        assert_eq!(feed.rotation_interval, 10);
    }

    #[test]
    fn test_weight_coercion() {
        assert_eq!(parse_weight(None), 1);
        assert_eq!(parse_weight(Some("abc")), 1);
        assert_eq!(parse_weight(Some("0")), 1);
        assert_eq!(parse_weight(Some("-4")), 1);
        assert_eq!(parse_weight(Some(" 7 ")), 7);
        assert_eq!(parse_weight(Some("3.5")), 3);
        assert_eq!(parse_weight(Some("2px")), 2);
        assert_eq!(parse_weight(Some("+4")), 4);
    }

    #[test]
    fn test_weight_is_capped() {
        assert_eq!(parse_weight(Some("1000")), MAX_WEIGHT);
        assert_eq!(parse_weight(Some("4000000000")), MAX_WEIGHT);
        assert_eq!(parse_weight(Some("99999999999999999999999")), MAX_WEIGHT);

        let feed = parse_feed(
            r#"<ads><ad weight="4000000000"><href>a</href></ad></ads>"#,
            &FeedDefaults::default(),
        )
        .unwrap();
        assert_eq!(feed.ads[0].weight, MAX_WEIGHT);
    }

    #[test]
    fn test_rotation_interval_coercion() {
        assert_eq!(parse_rotation_interval("abc"), 0);
        assert_eq!(parse_rotation_interval("-5"), 0);
        assert_eq!(parse_rotation_interval("45"), 45);
        assert_eq!(parse_rotation_interval("30s"), 30);
        assert_eq!(parse_rotation_interval(""), 0);
        assert_eq!(parse_rotation_interval("-"), 0);
    }

    #[test]
    fn test_rotation_interval_is_capped() {
        assert_eq!(parse_rotation_interval("86400"), MAX_ROTATION_INTERVAL);
        assert_eq!(parse_rotation_interval("86401"), MAX_ROTATION_INTERVAL);
        assert_eq!(
            parse_rotation_interval("9223372036854775807"),
            MAX_ROTATION_INTERVAL
        );

        let feed = parse_feed(
            r#"<ads rotation-interval="9223372036854775807"><ad><href>a</href></ad></ads>"#,
            &FeedDefaults::default(),
        )
        .unwrap();
        assert_eq!(feed.rotation_interval, MAX_ROTATION_INTERVAL);
    }

    #[test]
    fn test_empty_body_is_malformed() {
        let err = parse_feed("   ", &FeedDefaults::default()).unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[test]
    fn test_mismatched_tags_are_malformed() {
        let err = parse_feed("<ads><ad><href>x</ad></ads>", &FeedDefaults::default())
            .unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }
}
