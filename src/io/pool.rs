//! Background persistence of flushed dates.
//!
//! Submitted units go onto an unbounded channel served by a fixed set of worker
//! threads. An in-flight counter guarded by a `Condvar` lets the producer
//! throttle itself: once more than `max_outstanding` units are pending it waits
//! for the whole queue to drain before continuing.
//!
//! A failing unit is logged and counted; it never reaches the producer.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::NaiveDate;
use crossbeam_channel::{Receiver, Sender};

use super::layout::{OutputLayout, write_archive, write_index};
use crate::engine::{DateFlush, FlushSink};
use crate::error::{ConverterError, Result};
use crate::types::{EntityId, PersistenceStats, RecordId};

/// One self-contained write. Each unit targets a distinct path.
#[derive(Debug)]
pub enum WorkUnit {
    Index {
        entity: EntityId,
        date: NaiveDate,
        ids: Vec<RecordId>,
    },
    Archive {
        date: NaiveDate,
        archive: BTreeMap<RecordId, Vec<u8>>,
    },
}

impl WorkUnit {
    fn run(self, layout: &OutputLayout) -> Result<()> {
        match self {
            Self::Index { entity, date, ids } => {
                write_index(&layout.index_path(&entity, date)?, &ids)
            }
            Self::Archive { date, archive } => {
                write_archive(&layout.archive_path(date), &archive)
            }
        }
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index { entity, date, ids } => {
                write!(f, "index {entity}/{date} ({} ids)", ids.len())
            }
            Self::Archive { date, archive } => {
                write!(f, "archive {date} ({} records)", archive.len())
            }
        }
    }
}

#[derive(Debug, Default)]
struct InFlight {
    counts: Mutex<PersistenceStats>,
    quiescent: Condvar,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, PersistenceStats> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn submitted(&self) {
        self.lock().submitted += 1;
    }

    fn finished(&self, ok: bool) {
        let mut counts = self.lock();
        if ok {
            counts.completed += 1;
        } else {
            counts.failed += 1;
        }
        if counts.outstanding() == 0 {
            self.quiescent.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut counts = self.lock();
        while counts.outstanding() > 0 {
            counts = self
                .quiescent
                .wait(counts)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

pub struct PersistencePool {
    sender: Option<Sender<WorkUnit>>,
    workers: Vec<JoinHandle<()>>,
    tracker: Arc<InFlight>,
    max_outstanding: usize,
}

impl PersistencePool {
    /// Spawn `workers` threads writing into `layout`.
    pub fn new(layout: OutputLayout, workers: usize, max_outstanding: usize) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let layout = Arc::new(layout);
        let tracker = Arc::new(InFlight::default());
        let handles = (0..workers.max(1))
            .map(|i| {
                let receiver = receiver.clone();
                let layout = Arc::clone(&layout);
                let tracker = Arc::clone(&tracker);
                thread::Builder::new()
                    .name(format!("bulknews-persist-{i}"))
                    .spawn(move || worker_loop(&receiver, &layout, &tracker))
            })
            .collect::<std::io::Result<Vec<_>>>()?;
        tracing::debug!(
            target: "bulknews::persist",
            workers = handles.len(),
            max_outstanding,
            root = %layout.root().display(),
            "persistence pool started"
        );
        Ok(Self {
            sender: Some(sender),
            workers: handles,
            tracker,
            max_outstanding,
        })
    }

    pub fn submit_index_write(
        &self,
        entity: EntityId,
        date: NaiveDate,
        ids: Vec<RecordId>,
    ) -> Result<()> {
        self.submit(WorkUnit::Index { entity, date, ids })
    }

    pub fn submit_archive_write(
        &self,
        date: NaiveDate,
        archive: BTreeMap<RecordId, Vec<u8>>,
    ) -> Result<()> {
        self.submit(WorkUnit::Archive { date, archive })
    }

    fn submit(&self, unit: WorkUnit) -> Result<()> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(pool_closed());
        };
        self.tracker.submitted();
        if sender.send(unit).is_err() {
            self.tracker.finished(false);
            return Err(pool_closed());
        }
        Ok(())
    }

    /// Block until every unit completes if more than `max_outstanding` are pending.
    pub fn throttle(&self) {
        let outstanding = self.outstanding();
        if outstanding > self.max_outstanding as u64 {
            tracing::debug!(
                target: "bulknews::persist",
                outstanding,
                limit = self.max_outstanding,
                "throttling producer until persistence drains"
            );
            self.tracker.wait_idle();
        }
    }

    /// Block until every submitted unit has completed or failed.
    pub fn final_drain(&self) {
        self.tracker.wait_idle();
    }

    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.tracker.lock().outstanding()
    }

    #[must_use]
    pub fn stats(&self) -> PersistenceStats {
        *self.tracker.lock()
    }

    /// Drain the queue, stop the workers, and report final counts.
    pub fn shutdown(mut self) -> PersistenceStats {
        self.close();
        self.stats()
    }

    fn close(&mut self) {
        // Dropping the last sender ends each worker's receive loop after the
        // queue empties.
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!(target: "bulknews::persist", "persistence worker exited abnormally");
            }
        }
    }
}

impl Drop for PersistencePool {
    fn drop(&mut self) {
        self.close();
    }
}

impl FlushSink for PersistencePool {
    fn flush(&mut self, batch: DateFlush) -> Result<()> {
        let DateFlush {
            date,
            archive,
            entries,
        } = batch;
        for entry in entries {
            self.submit_index_write(entry.entity, entry.date, entry.ids)?;
        }
        self.submit_archive_write(date, archive)
    }
}

fn worker_loop(receiver: &Receiver<WorkUnit>, layout: &OutputLayout, tracker: &InFlight) {
    for unit in receiver {
        let label = unit.to_string();
        let ok = match panic::catch_unwind(AssertUnwindSafe(|| unit.run(layout))) {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                tracing::error!(
                    target: "bulknews::persist",
                    unit = %label,
                    error = %err,
                    "persistence unit failed"
                );
                false
            }
            Err(_) => {
                tracing::error!(
                    target: "bulknews::persist",
                    unit = %label,
                    "persistence unit panicked"
                );
                false
            }
        };
        tracker.finished(ok);
    }
}

fn pool_closed() -> ConverterError {
    std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "persistence pool has shut down",
    )
    .into()
}
