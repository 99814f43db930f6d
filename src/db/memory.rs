//! In-memory stores for unit tests.

use super::EntryStore;
use crate::errors::DatabaseError;
use crate::journal::{DiaryEntry, EntryAnalysis, EntryMessage, NewAnalysis, NewEntry, NewMessage, TimeRange};
use std::sync::Mutex;

/// Records every append in memory.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub entries: Mutex<Vec<DiaryEntry>>,
    pub messages: Mutex<Vec<EntryMessage>>,
    pub analyses: Mutex<Vec<EntryAnalysis>>,
}

impl EntryStore for MemoryStore {
    fn append(&self, entry: &NewEntry) -> Result<i64, DatabaseError> {
        let mut entries = self.entries.lock().unwrap();
        let id = entries.len() as i64 + 1;
        entries.push(DiaryEntry::from_new(id, entry.clone()));
        Ok(id)
    }

    fn list_by_owner(&self, owner_id: &str, range: &TimeRange) -> Result<Vec<DiaryEntry>, DatabaseError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.owner_id == owner_id && range.contains(e.created_at))
            .cloned()
            .collect())
    }

    fn get(&self, entry_id: i64) -> Result<Option<DiaryEntry>, DatabaseError> {
        Ok(self.entries.lock().unwrap().iter().find(|e| e.id == entry_id).cloned())
    }

    fn append_messages(&self, new_messages: &[NewMessage]) -> Result<Vec<i64>, DatabaseError> {
        let mut messages = self.messages.lock().unwrap();
        let mut ids = Vec::new();
        for message in new_messages {
            let id = messages.len() as i64 + 1;
            messages.push(EntryMessage::from_new(id, message.clone()));
            ids.push(id);
        }
        Ok(ids)
    }

    fn list_messages(&self, entry_id: i64) -> Result<Vec<EntryMessage>, DatabaseError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.entry_id == entry_id)
            .cloned()
            .collect())
    }

    fn append_analysis(&self, analysis: &NewAnalysis) -> Result<i64, DatabaseError> {
        let mut analyses = self.analyses.lock().unwrap();
        let id = analyses.len() as i64 + 1;
        analyses.push(EntryAnalysis::from_new(id, analysis.clone()));
        Ok(id)
    }

    fn latest_analysis(&self, entry_id: i64) -> Result<Option<EntryAnalysis>, DatabaseError> {
        Ok(self
            .analyses
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|a| a.entry_id == entry_id)
            .cloned())
    }
}

/// Serves reads from `inner` and fails every write.
#[derive(Default)]
pub(crate) struct BrokenStore {
    pub inner: MemoryStore,
}

impl BrokenStore {
    fn disk_full<T>() -> Result<T, DatabaseError> {
        Err(DatabaseError::Custom("disk full".to_string()))
    }
}

impl EntryStore for BrokenStore {
    fn append(&self, _entry: &NewEntry) -> Result<i64, DatabaseError> {
        Self::disk_full()
    }

    fn list_by_owner(&self, owner_id: &str, range: &TimeRange) -> Result<Vec<DiaryEntry>, DatabaseError> {
        self.inner.list_by_owner(owner_id, range)
    }

    fn get(&self, entry_id: i64) -> Result<Option<DiaryEntry>, DatabaseError> {
        self.inner.get(entry_id)
    }

    fn append_messages(&self, _messages: &[NewMessage]) -> Result<Vec<i64>, DatabaseError> {
        Self::disk_full()
    }

    fn list_messages(&self, entry_id: i64) -> Result<Vec<EntryMessage>, DatabaseError> {
        self.inner.list_messages(entry_id)
    }

    fn append_analysis(&self, _analysis: &NewAnalysis) -> Result<i64, DatabaseError> {
        Self::disk_full()
    }

    fn latest_analysis(&self, entry_id: i64) -> Result<Option<EntryAnalysis>, DatabaseError> {
        self.inner.latest_analysis(entry_id)
    }
}
