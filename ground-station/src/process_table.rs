//! Registry of external analysis processes keyed by observer.
//!
//! An entry exists exactly while its [`ProcessLease`] is alive. Dropping the
//! lease removes the entry on every exit path of the supervising task,
//! including panics. Each registration carries a generation number so a lease
//! from an earlier run never removes the entry of a newer run for the same
//! observer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::events::ObserverId;

/// A running external analysis.
#[derive(Debug, Clone)]
pub struct ProcessEntry {
    /// OS process id, if the platform reported one
    pub pid: Option<u32>,
    pub program: PathBuf,
    pub started: Instant,
    generation: u64,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<ObserverId, ProcessEntry>>,
    next_generation: AtomicU64,
}

/// Shared handle to the process registry. Cloning is cheap.
#[derive(Clone, Default)]
pub struct ProcessTable {
    inner: Arc<Inner>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ObserverId, ProcessEntry>> {
        // Entries are plain data; a panic while holding the lock cannot
        // leave them half-written
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a process for `observer`, replacing any previous entry.
    pub fn register(&self, observer: ObserverId, pid: Option<u32>, program: &Path) -> ProcessLease {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let entry = ProcessEntry {
            pid,
            program: program.to_path_buf(),
            started: Instant::now(),
            generation,
        };

        if let Some(previous) = self.entries().insert(observer.clone(), entry) {
            tracing::warn!(
                "Observer {observer} started a new analysis while pid {:?} is still registered",
                previous.pid
            );
        }

        ProcessLease {
            table: self.clone(),
            observer,
            generation,
        }
    }

    pub fn contains(&self, observer: &ObserverId) -> bool {
        self.entries().contains_key(observer)
    }

    pub fn get(&self, observer: &ObserverId) -> Option<ProcessEntry> {
        self.entries().get(observer).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn release(&self, observer: &ObserverId, generation: u64) {
        let mut entries = self.entries();
        if entries
            .get(observer)
            .is_some_and(|entry| entry.generation == generation)
        {
            entries.remove(observer);
        }
    }
}

/// Ownership of one registry entry. The entry is removed when this drops.
pub struct ProcessLease {
    table: ProcessTable,
    observer: ObserverId,
    generation: u64,
}

impl ProcessLease {
    pub fn observer(&self) -> &ObserverId {
        &self.observer
    }
}

impl Drop for ProcessLease {
    fn drop(&mut self) {
        self.table.release(&self.observer, self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_drop_removes_entry() {
        let table = ProcessTable::new();
        let observer = ObserverId::from("obs");

        let lease = table.register(observer.clone(), Some(42), Path::new("/bin/true"));
        assert!(table.contains(&observer));
        assert_eq!(table.get(&observer).unwrap().pid, Some(42));
        assert_eq!(lease.observer(), &observer);

        drop(lease);
        assert!(!table.contains(&observer));
        assert!(table.is_empty());
    }

    #[test]
    fn test_stale_lease_keeps_newer_entry() {
        let table = ProcessTable::new();
        let observer = ObserverId::from("obs");

        let first = table.register(observer.clone(), Some(1), Path::new("a"));
        let second = table.register(observer.clone(), Some(2), Path::new("b"));

        drop(first);
        assert_eq!(table.get(&observer).unwrap().pid, Some(2));

        drop(second);
        assert!(!table.contains(&observer));
    }

    #[test]
    fn test_observers_are_independent() {
        let table = ProcessTable::new();
        let a = table.register("a".into(), None, Path::new("x"));
        let _b = table.register("b".into(), None, Path::new("x"));
        assert_eq!(table.len(), 2);

        drop(a);
        assert_eq!(table.len(), 1);
        assert!(table.contains(&"b".into()));
    }

    #[test]
    fn test_lease_released_on_panic() {
        let table = ProcessTable::new();
        let observer = ObserverId::from("panicky");

        let worker_table = table.clone();
        let worker_observer = observer.clone();
        let result = std::thread::spawn(move || {
            let _lease = worker_table.register(worker_observer, None, Path::new("x"));
            panic!("supervisor failed");
        })
        .join();

        assert!(result.is_err());
        assert!(!table.contains(&observer));
    }
}
