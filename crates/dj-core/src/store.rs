use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use crate::error::{Error, Result};
use crate::job::GenerationJob;

/// Key/value persistence for jobs handed from one page to the next.
pub trait JobStore: Send + Sync {
    fn put(&self, job: GenerationJob) -> Result<()>;

    fn get(&self, id: &str) -> Result<Option<GenerationJob>>;

    fn remove(&self, id: &str) -> Result<Option<GenerationJob>>;

    /// Like [`JobStore::put`], but only writes when a live record with the
    /// same id is still stored. Returns whether the write happened.
    fn update(&self, job: GenerationJob) -> Result<bool>;

    /// Drops expired records, returning how many were removed.
    fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}

struct Entry {
    job: GenerationJob,
    written_at: DateTime<Utc>,
}

/// In-memory store where every record expires `ttl` after its last write.
pub struct MemoryJobStore {
    ttl: TimeDelta,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryJobStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.written_at) > self.ttl
    }

    fn put_at(&self, job: GenerationJob, now: DateTime<Utc>) -> Result<()> {
        self.write_at(job, now, false).map(|_| ())
    }

    fn update_at(&self, job: GenerationJob, now: DateTime<Utc>) -> Result<bool> {
        self.write_at(job, now, true)
    }

    fn write_at(&self, job: GenerationJob, now: DateTime<Utc>, must_exist: bool) -> Result<bool> {
        if !job.is_consistent() {
            return Err(Error::MissingResult(job.id));
        }

        let mut entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        let live = entries.get(&job.id).filter(|existing| !self.is_expired(existing, now));
        match live {
            Some(existing) => {
                let (from, to) = (existing.job.status(), job.status());
                if !from.can_become(to) {
                    return Err(Error::StatusRegression { id: job.id, from, to });
                }
            }
            None if must_exist => {
                debug!("Skipping write for removed job {}", job.id);
                return Ok(false);
            }
            None => {}
        }

        entries.insert(job.id.clone(), Entry { job, written_at: now });
        Ok(true)
    }

    fn get_at(&self, id: &str, now: DateTime<Utc>) -> Result<Option<GenerationJob>> {
        let mut entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        let expired = match entries.get(id) {
            Some(entry) => self.is_expired(entry, now),
            None => return Ok(None),
        };

        if expired {
            debug!("Dropping expired job {}", id);
            entries.remove(id);
            return Ok(None);
        }
        Ok(entries.get(id).map(|entry| entry.job.clone()))
    }

    fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!("Purged {} expired jobs", purged);
        }
        Ok(purged)
    }
}

impl JobStore for MemoryJobStore {
    fn put(&self, job: GenerationJob) -> Result<()> {
        self.put_at(job, Utc::now())
    }

    fn get(&self, id: &str) -> Result<Option<GenerationJob>> {
        self.get_at(id, Utc::now())
    }

    fn update(&self, job: GenerationJob) -> Result<bool> {
        self.update_at(job, Utc::now())
    }

    fn remove(&self, id: &str) -> Result<Option<GenerationJob>> {
        let mut entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        Ok(entries.remove(id).map(|entry| entry.job))
    }

    fn purge_expired(&self) -> Result<usize> {
        self.purge_expired_at(Utc::now())
    }
}
