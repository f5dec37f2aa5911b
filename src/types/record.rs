//! Decoded news records and the effective-time rule.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::entity::EntityTag;
use crate::constants::{HISTORICAL_CRAWL_OFFSET, MAX_CRAWL_DRIFT};

/// Vendor-assigned record identifier. Records are keyed by this value alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Reconcile crawl and publish times into the time used for bucketing and ordering.
///
/// Crawl time is trusted when it lies within a day of the publish time. Older
/// articles re-crawled much later are placed an hour after publication instead.
#[must_use]
pub fn effective_time(published: DateTime<Utc>, crawled: DateTime<Utc>) -> DateTime<Utc> {
    if (crawled - published).abs() <= MAX_CRAWL_DRIFT {
        crawled
    } else {
        published + HISTORICAL_CRAWL_OFFSET
    }
}

/// One decoded article.
///
/// `effective_time` is fixed at construction; `payload` is the serialized article
/// exactly as it will be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub published_time: DateTime<Utc>,
    pub crawl_time: DateTime<Utc>,
    effective_time: DateTime<Utc>,
    /// False when the source carried neither a publish nor a crawl time.
    pub dated: bool,
    pub entity_tags: Vec<EntityTag>,
    pub payload: Vec<u8>,
}

impl Record {
    #[must_use]
    pub fn new(
        id: RecordId,
        published_time: DateTime<Utc>,
        crawl_time: DateTime<Utc>,
        entity_tags: Vec<EntityTag>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            effective_time: effective_time(published_time, crawl_time),
            id,
            published_time,
            crawl_time,
            dated: true,
            entity_tags,
            payload,
        }
    }

    /// Record with no usable timestamps. It is never bucketed.
    #[must_use]
    pub fn undated(id: RecordId, entity_tags: Vec<EntityTag>, payload: Vec<u8>) -> Self {
        let epoch = DateTime::<Utc>::default();
        Self {
            id,
            published_time: epoch,
            crawl_time: epoch,
            effective_time: epoch,
            dated: false,
            entity_tags,
            payload,
        }
    }

    #[must_use]
    pub fn effective_time(&self) -> DateTime<Utc> {
        self.effective_time
    }

    /// UTC calendar date of the effective time.
    #[must_use]
    pub fn bucket_date(&self) -> NaiveDate {
        self.effective_time.date_naive()
    }

    /// Whether the record can enter a bucket at all.
    #[must_use]
    pub fn is_routable(&self) -> bool {
        self.dated && !self.id.is_empty() && !self.entity_tags.is_empty()
    }

    /// Tags that take part in entity indexing.
    pub fn indexable_tags(&self) -> impl Iterator<Item = &EntityTag> {
        self.entity_tags.iter().filter(|tag| tag.is_indexable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::entity::EntityId;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn crawl_time_wins_within_a_day() {
        let published = at(2021, 3, 1, 10);
        let crawled = at(2021, 3, 2, 10);
        assert_eq!(effective_time(published, crawled), crawled);

        // Crawled before publication still counts as drift.
        let early = at(2021, 2, 28, 11);
        assert_eq!(effective_time(published, early), early);
    }

    #[test]
    fn historical_recrawl_uses_publish_plus_offset() {
        let published = at(2014, 1, 1, 0);
        let crawled = at(2019, 5, 1, 0);
        assert_eq!(effective_time(published, crawled), at(2014, 1, 1, 1));

        let just_over = at(2021, 3, 1, 0) + chrono::TimeDelta::seconds(86_401);
        assert_eq!(effective_time(at(2021, 3, 1, 0), just_over), at(2021, 3, 1, 1));
    }

    #[test]
    fn routing_requires_id_date_and_tags() {
        let tag = EntityTag::new("AAPL", EntityId::new("AAPL"));
        let record = Record::new(
            RecordId::new("1"),
            at(2021, 3, 1, 23),
            at(2021, 3, 2, 1),
            vec![tag.clone()],
            Vec::new(),
        );
        assert!(record.is_routable());
        assert_eq!(record.bucket_date(), NaiveDate::from_ymd_opt(2021, 3, 2).unwrap());

        let untagged = Record::new(
            RecordId::new("2"),
            at(2021, 3, 1, 0),
            at(2021, 3, 1, 0),
            Vec::new(),
            Vec::new(),
        );
        assert!(!untagged.is_routable());

        let undated = Record::undated(RecordId::new("3"), vec![tag], Vec::new());
        assert!(!undated.is_routable());
    }
}
