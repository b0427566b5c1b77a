use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::{generate_id, RemoteCollection};
use crate::error::CollectionError;
use crate::models::{GuestEntry, NewEntry};

/// In-process collection for development and tests. Entries are kept in
/// write order; timestamps never go backwards.
pub struct MemoryCollection {
    entries: Mutex<Vec<GuestEntry>>,
    changes: broadcast::Sender<()>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        MemoryCollection {
            entries: Mutex::new(Vec::new()),
            changes,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

fn stamp_after(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if last > now => last,
        _ => now,
    }
}

#[async_trait]
impl RemoteCollection for MemoryCollection {
    async fn append(&self, entry: NewEntry) -> Result<GuestEntry, CollectionError> {
        let stored = {
            let mut entries = self.entries.lock();
            let stored = GuestEntry {
                id: generate_id(),
                name: entry.name,
                message: entry.message,
                attendance: entry.attendance,
                submitted_at: stamp_after(entries.last().map(|e| e.submitted_at)),
            };
            entries.push(stored.clone());
            stored
        };
        // no subscribers is fine
        let _ = self.changes.send(());
        Ok(stored)
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<GuestEntry>, CollectionError> {
        let entries = self.entries.lock();
        let newest_first = entries.iter().rev().cloned();
        Ok(match limit {
            Some(n) => newest_first.take(n).collect(),
            None => newest_first.collect(),
        })
    }

    fn changes(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attendance;

    fn draft(name: &str) -> NewEntry {
        NewEntry {
            name: name.into(),
            message: "Selamat menikah".into(),
            attendance: Attendance::Attending,
        }
    }

    #[tokio::test]
    async fn append_assigns_id_and_timestamp() {
        let collection = MemoryCollection::new();
        let before = Utc::now();
        let stored = collection.append(draft("Budi")).await.unwrap();
        assert_eq!(stored.name, "Budi");
        assert_eq!(stored.id.len(), 20);
        assert!(stored.submitted_at >= before);
        assert_eq!(collection.len(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_capped() {
        let collection = MemoryCollection::new();
        for name in ["Ani", "Budi", "Citra"] {
            collection.append(draft(name)).await.unwrap();
        }

        let all = collection.list(None).await.unwrap();
        let names: Vec<_> = all.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Citra", "Budi", "Ani"]);
        assert!(all.windows(2).all(|w| w[0].submitted_at >= w[1].submitted_at));

        let capped = collection.list(Some(2)).await.unwrap();
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].name, "Citra");
    }

    #[tokio::test]
    async fn append_signals_change() {
        let collection = MemoryCollection::new();
        let mut changes = collection.changes();
        collection.append(draft("Budi")).await.unwrap();
        assert!(changes.try_recv().is_ok());
    }
}
