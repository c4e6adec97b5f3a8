//! Event payloads handed to analytics sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::inventory::{AdId, AdRecord};

/// Batched event classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EventKind {
    /// Primary destination link activated.
    Click,
    /// Ad became sufficiently visible for the first time.
    Impression,
    /// Sponsor name seen since the last flush.
    Sponsor,
}

/// One click or impression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdEvent {
    pub ad_id: AdId,
    pub title: String,
    pub sponsor: String,
    pub href: String,
    /// Slot index the ad was placed in.
    pub slot: usize,
    pub ts: DateTime<Utc>,
}

impl AdEvent {
    /// Event for `ad` shown in `slot`, stamped now.
    pub fn new(ad: &AdRecord, slot: usize) -> Self {
        Self {
            ad_id: ad.id.clone(),
            title: ad.title.clone(),
            sponsor: ad.sponsor_name.clone(),
            href: ad.href.clone(),
            slot,
            ts: Utc::now(),
        }
    }
}

/// Input to [`EventBatcher::enqueue`](super::EventBatcher::enqueue).
#[derive(Debug, Clone, PartialEq)]
pub enum BatchedEvent {
    Click(AdEvent),
    Impression(AdEvent),
    Sponsor(String),
}

impl BatchedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Click(_) => EventKind::Click,
            Self::Impression(_) => EventKind::Impression,
            Self::Sponsor(_) => EventKind::Sponsor,
        }
    }
}

/// One sink call's worth of events of a single kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum SinkBatch {
    Clicks(Vec<AdEvent>),
    Impressions(Vec<AdEvent>),
    /// Distinct sponsor names.
    Sponsors(Vec<String>),
}

impl SinkBatch {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Clicks(_) => EventKind::Click,
            Self::Impressions(_) => EventKind::Impression,
            Self::Sponsors(_) => EventKind::Sponsor,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Clicks(items) | Self::Impressions(items) => items.len(),
            Self::Sponsors(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_event_kind_from_str() {
        assert_eq!(EventKind::from_str("click").unwrap(), EventKind::Click);
        assert_eq!(EventKind::from_str("IMPRESSION").unwrap(), EventKind::Impression);
        assert_eq!(EventKind::Sponsor.as_ref(), "sponsor");
        assert!(EventKind::from_str("view").is_err());
    }

    #[test]
    fn test_sink_batch_serializes_tagged() {
        let batch = SinkBatch::Sponsors(vec!["Example Co".to_string()]);
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["kind"], "sponsors");
        assert_eq!(json["items"][0], "Example Co");
        assert_eq!(batch.kind(), EventKind::Sponsor);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_ad_event_copies_record_fields() {
        let ad = AdRecord::new("https://example.com", "Hello").with_sponsor("Example Co", "#");
        let event = AdEvent::new(&ad, 2);
        assert_eq!(event.ad_id, ad.id);
        assert_eq!(event.sponsor, "Example Co");
        assert_eq!(event.slot, 2);
        assert_eq!(BatchedEvent::Click(event).kind(), EventKind::Click);
    }
}
