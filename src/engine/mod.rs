//! Temporal bucketing of decoded records into per-date flushes.
//!
//! Records arrive roughly in effective-time order. Each one lands in the bucket
//! for its UTC effective date and updates the entity index for that date. When a
//! record moves the [`DateWatermark`] forward, every bucket dated before the
//! watermark's previous position is finalized and handed to a [`FlushSink`].
//!
//! The engine is owned by the single producer thread; nothing in here is shared.

mod index;
mod watermark;

use std::collections::BTreeMap;

use chrono::NaiveDate;

pub use index::{EntityIndex, IndexEntry};
pub use watermark::{DateWatermark, WatermarkStep};

use crate::error::{ConverterError, Result};
use crate::types::{EngineStats, Record, RecordId};

/// Everything persisted for one completed date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFlush {
    pub date: NaiveDate,
    /// Stored payload per record id.
    pub archive: BTreeMap<RecordId, Vec<u8>>,
    pub entries: Vec<IndexEntry>,
}

/// Receives finalized dates from the engine.
pub trait FlushSink {
    fn flush(&mut self, batch: DateFlush) -> Result<()>;
}

/// Collects flushes in memory.
impl FlushSink for Vec<DateFlush> {
    fn flush(&mut self, batch: DateFlush) -> Result<()> {
        self.push(batch);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct BucketingEngine {
    watermark: DateWatermark,
    buckets: BTreeMap<NaiveDate, Vec<Record>>,
    index: EntityIndex,
    stats: EngineStats,
}

impl BucketingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one record into its bucket, flushing completed buckets first when
    /// the record advances the watermark.
    ///
    /// Records without id, date, or entity tags are dropped. A record dated more
    /// than a day behind the watermark is a `WindowViolation`.
    pub fn ingest(&mut self, record: Record, sink: &mut dyn FlushSink) -> Result<()> {
        if !record.is_routable() {
            self.stats.records_dropped += 1;
            tracing::warn!(
                target: "bulknews::engine",
                id = %record.id,
                dated = record.dated,
                tags = record.entity_tags.len(),
                "dropping unroutable record"
            );
            return Ok(());
        }

        let date = record.bucket_date();
        match self.watermark.observe(date) {
            WatermarkStep::Advanced { previous } => self.flush_before(previous, sink)?,
            WatermarkStep::Regressed { watermark } => {
                return Err(ConverterError::WindowViolation { date, watermark });
            }
            WatermarkStep::Held => {}
        }

        for tag in record.indexable_tags() {
            self.index.add(
                tag.entity.clone(),
                date,
                record.id.clone(),
                record.effective_time(),
            );
        }
        self.buckets.entry(date).or_default().push(record);
        self.stats.records_ingested += 1;
        self.stats.peak_live_buckets = self.stats.peak_live_buckets.max(self.buckets.len());
        Ok(())
    }

    /// Flush every remaining bucket, oldest first. Called once at end of input.
    pub fn drain_all(&mut self, sink: &mut dyn FlushSink) -> Result<()> {
        let buckets = std::mem::take(&mut self.buckets);
        for (date, records) in buckets {
            self.flush_date(date, records, sink)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn watermark(&self) -> NaiveDate {
        self.watermark.current()
    }

    /// Dates currently buffered, ascending.
    pub fn live_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.buckets.keys().copied()
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    fn flush_before(&mut self, cutoff: NaiveDate, sink: &mut dyn FlushSink) -> Result<()> {
        let live = self.buckets.split_off(&cutoff);
        let expired = std::mem::replace(&mut self.buckets, live);
        for (date, records) in expired {
            self.flush_date(date, records, sink)?;
        }
        Ok(())
    }

    fn flush_date(
        &mut self,
        date: NaiveDate,
        records: Vec<Record>,
        sink: &mut dyn FlushSink,
    ) -> Result<()> {
        let entries = self.index.take_and_remove(date);
        let record_count = records.len();
        let archive: BTreeMap<RecordId, Vec<u8>> = records
            .into_iter()
            .map(|record| (record.id, record.payload))
            .collect();
        tracing::debug!(
            target: "bulknews::engine",
            %date,
            records = record_count,
            entities = entries.len(),
            watermark = %self.watermark.current(),
            "flushing bucket"
        );
        sink.flush(DateFlush {
            date,
            archive,
            entries,
        })?;
        self.stats.dates_flushed += 1;
        Ok(())
    }
}
