//! Per-(entity, date) lists of record ids, built while buckets fill.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::{EntityId, RecordId};

/// Finalized index for one entity on one date, ordered by effective time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub entity: EntityId,
    pub date: NaiveDate,
    pub ids: Vec<RecordId>,
}

#[derive(Debug, Clone)]
struct IndexedRef {
    effective_time: DateTime<Utc>,
    id: RecordId,
}

#[derive(Debug, Default)]
pub struct EntityIndex {
    by_date: HashMap<NaiveDate, HashMap<EntityId, Vec<IndexedRef>>>,
}

impl EntityIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` to the entity's list for `date`, in arrival order.
    pub fn add(
        &mut self,
        entity: EntityId,
        date: NaiveDate,
        id: RecordId,
        effective_time: DateTime<Utc>,
    ) {
        self.by_date
            .entry(date)
            .or_default()
            .entry(entity)
            .or_default()
            .push(IndexedRef { effective_time, id });
    }

    /// Remove every entry for `date` and return them finalized.
    ///
    /// Ids are stably re-sorted by effective time, so records with equal times
    /// keep arrival order; a repeated id keeps only its earliest position.
    /// Entries come back ordered by entity.
    pub fn take_and_remove(&mut self, date: NaiveDate) -> Vec<IndexEntry> {
        let Some(entities) = self.by_date.remove(&date) else {
            return Vec::new();
        };
        let mut entries: Vec<IndexEntry> = entities
            .into_iter()
            .map(|(entity, mut refs)| {
                refs.sort_by_key(|r| r.effective_time);
                let mut seen = HashSet::with_capacity(refs.len());
                let ids = refs
                    .into_iter()
                    .filter(|r| seen.insert(r.id.clone()))
                    .map(|r| r.id)
                    .collect();
                IndexEntry { entity, date, ids }
            })
            .collect();
        entries.sort_by(|a, b| a.entity.cmp(&b.entity));
        entries
    }

    /// Number of live (entity, date) keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_date.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}
