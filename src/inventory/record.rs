//! Normalized ad records.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Title used when a feed entry carries no `ad-title`.
pub const DEFAULT_TITLE: &str = "Untitled Ad";

/// Sponsor name used when a feed entry carries no `sponsor-name`.
pub const DEFAULT_SPONSOR_NAME: &str = "Sponsored";

/// Largest selection weight; larger values are clamped down to it.
pub const MAX_WEIGHT: u32 = 1000;

/// Destination used when a feed entry carries no `href` / `sponsor-url`.
pub const DEFAULT_HREF: &str = "#";

/// Prefix for every fingerprint identifier.
const AD_ID_PREFIX: &str = "ad_";

/// Number of digest bytes kept in an identifier.
const AD_ID_DIGEST_BYTES: usize = 8;

/// Content fingerprint of an ad.
///
/// Derived from the destination URL and the title only. Two entries that share
/// both collide, and editing either one upstream changes the identity (and so
/// orphans its metrics). Treat it as a best-effort key, not a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdId(String);

impl AdId {
    /// Fingerprint an ad from its raw `href` and `ad-title` text.
    pub fn fingerprint(href: &str, title: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(href.as_bytes());
        hasher.update(b"||");
        hasher.update(title.as_bytes());
        let digest = hasher.finalize();
        Self(format!(
            "{}{}",
            AD_ID_PREFIX,
            hex::encode(&digest[..AD_ID_DIGEST_BYTES])
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AdId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AdId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An immutable, normalized ad placement candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdRecord {
    /// Fingerprint of `href` + `title` as they appeared in the feed.
    pub id: AdId,
    /// Primary destination URL.
    pub href: String,
    /// Sponsor display name.
    pub sponsor_name: String,
    /// Sponsor landing page.
    pub sponsor_url: String,
    /// Creative image source.
    pub image_src: String,
    pub title: String,
    pub description: String,
    /// Text shown for the destination link.
    pub display_link: String,
    /// Relative selection weight, always >= 1.
    pub weight: u32,
}

impl AdRecord {
    /// Build a record with defaults for everything except destination and title.
    ///
    /// Mostly useful for tests and for hosts that assemble inventory in code.
    pub fn new(href: impl Into<String>, title: impl Into<String>) -> Self {
        let href = href.into();
        let title = title.into();
        Self {
            id: AdId::fingerprint(&href, &title),
            display_link: href.clone(),
            href,
            sponsor_name: DEFAULT_SPONSOR_NAME.to_string(),
            sponsor_url: DEFAULT_HREF.to_string(),
            image_src: String::new(),
            title,
            description: String::new(),
            weight: 1,
        }
    }

    /// Set the weight, clamped to `1..=MAX_WEIGHT`.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight.clamp(1, MAX_WEIGHT);
        self
    }

    /// Set the sponsor name and landing page.
    pub fn with_sponsor(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.sponsor_name = name.into();
        self.sponsor_url = url.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image(mut self, src: impl Into<String>) -> Self {
        self.image_src = src.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let a = AdId::fingerprint("https://example.com/a", "Spring sale");
        let b = AdId::fingerprint("https://example.com/a", "Spring sale");
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("ad_"));
        assert_eq!(a.as_str().len(), AD_ID_PREFIX.len() + AD_ID_DIGEST_BYTES * 2);
    }

    #[test]
    fn test_fingerprint_changes_with_title() {
        let a = AdId::fingerprint("https://example.com/a", "Spring sale");
        let b = AdId::fingerprint("https://example.com/a", "Summer sale");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_separator_prevents_trivial_overlap() {
        let a = AdId::fingerprint("https://example.com/ab", "c");
        let b = AdId::fingerprint("https://example.com/a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_builder_defaults() {
        let record = AdRecord::new("https://example.com", "Hello").with_weight(0);
        assert_eq!(record.weight, 1);
        let record = AdRecord::new("https://example.com", "Hello").with_weight(u32::MAX);
        assert_eq!(record.weight, MAX_WEIGHT);
        assert_eq!(record.display_link, "https://example.com");
        assert_eq!(record.sponsor_name, DEFAULT_SPONSOR_NAME);
        assert_eq!(record.id, AdId::fingerprint("https://example.com", "Hello"));
    }
}
