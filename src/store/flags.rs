//! Device-local voted markers
//!
//! The markers mirror what a browser keeps in local storage: one
//! `voted_<studentId>` key per student who voted on the device, and a generic
//! `hasVoted` flag. They are hints for the presentation layer only; the
//! authoritative voted flag lives in the [`BallotStore`](super::BallotStore).

use crate::{Result, store_error};
use std::collections::HashMap;
use std::sync::RwLock;

/// Generic "someone voted on this device" flag
pub const HAS_VOTED_KEY: &str = "hasVoted";

/// Prefix of the per-student voted marker
pub const VOTED_KEY_PREFIX: &str = "voted_";

/// Key/value storage for device-local flags
pub trait FlagCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; `true` if it was present
    fn remove(&self, key: &str) -> Result<bool>;

    fn keys(&self) -> Result<Vec<String>>;

    /// Record that `student_id` voted on this device
    fn mark_voted(&self, student_id: &str) -> Result<()> {
        self.set(&voted_key(student_id), "true")?;
        self.set(HAS_VOTED_KEY, "true")
    }

    /// Whether this device remembers `student_id` as having voted
    fn voted_hint(&self, student_id: &str) -> Result<bool> {
        Ok(self.get(&voted_key(student_id))?.is_some())
    }

    /// Drop every `voted_*` marker and the `hasVoted` flag
    fn clear_voting_markers(&self) -> Result<usize> {
        let mut cleared = 0;
        for key in self.keys()? {
            if (key.starts_with(VOTED_KEY_PREFIX) || key == HAS_VOTED_KEY) && self.remove(&key)? {
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

/// Per-student marker key
pub fn voted_key(student_id: &str) -> String {
    format!("{VOTED_KEY_PREFIX}{student_id}")
}

/// In-process flag cache
#[derive(Debug, Default)]
pub struct MemoryFlags {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryFlags {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagCache for MemoryFlags {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| store_error!("Flag cache read error"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| store_error!("Flag cache write error"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| store_error!("Flag cache write error"))?;
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| store_error!("Flag cache read error"))?;
        Ok(entries.keys().cloned().collect())
    }
}
