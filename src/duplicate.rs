use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

use crate::models::{Entry, StoredEntry};
use crate::store::{Store, StoreError};

// Outcome of a duplicate check. A failed store read is reported as its own
// case so the caller can log it; it still counts as "not a duplicate".
#[derive(Debug)]
pub enum DuplicateCheck {
    Unique,
    Duplicate,
    CheckFailed(StoreError),
}

impl DuplicateCheck {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DuplicateCheck::Duplicate)
    }
}

/// Suppresses a submission that repeats the newest stored entry.
///
/// Only the single newest entry is compared. A repeat that arrives after
/// some other entry was stored goes through.
pub struct DuplicateGuard {
    store: Arc<dyn Store>,
    window: TimeDelta,
}

impl DuplicateGuard {
    pub fn new(store: Arc<dyn Store>, window: TimeDelta) -> Self {
        Self { store, window }
    }

    pub async fn check(&self, entry: &Entry, now: DateTime<Utc>) -> DuplicateCheck {
        match self.store.latest().await {
            Ok(Some(latest)) if self.repeats(&latest, entry, now) => DuplicateCheck::Duplicate,
            Ok(_) => DuplicateCheck::Unique,
            Err(e) => DuplicateCheck::CheckFailed(e),
        }
    }

    // same text, ip and os as `latest`, and `latest` is younger than the window
    pub fn repeats(&self, latest: &StoredEntry, entry: &Entry, now: DateTime<Utc>) -> bool {
        let age = now - latest.timestamp;
        age < self.window
            && latest.entry.text == entry.text
            && latest.entry.ip == entry.ip
            && latest.entry.os == entry.os
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl Store for BrokenStore {
        async fn latest(&self) -> Result<Option<StoredEntry>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn append(&self, _entry: StoredEntry) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn entry(text: &str, ip: Option<&str>, os: Option<&str>) -> Entry {
        Entry {
            text: text.to_string(),
            ip: ip.map(str::to_string),
            country: None,
            region: None,
            city: None,
            location: None,
            os: os.map(str::to_string),
        }
    }

    fn guard(store: Arc<dyn Store>) -> DuplicateGuard {
        DuplicateGuard::new(store, TimeDelta::minutes(10))
    }

    #[tokio::test]
    async fn test_empty_store_is_unique() {
        let guard = guard(Arc::new(MemoryStore::new()));
        let check = guard.check(&entry("hello", None, None), Utc::now()).await;
        assert!(matches!(check, DuplicateCheck::Unique));
    }

    #[tokio::test]
    async fn test_recent_identical_entry_is_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let e = entry("hello", Some("1.2.3.4"), Some("mac"));
        store
            .append(StoredEntry::new(e.clone(), now - TimeDelta::seconds(6)))
            .await
            .unwrap();

        let check = guard(store).check(&e, now).await;
        assert!(check.is_duplicate());
    }

    #[test]
    fn test_window_boundary() {
        let guard = guard(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        let e = entry("hello", Some("1.2.3.4"), Some("mac"));

        let just_inside = StoredEntry::new(
            e.clone(),
            now - TimeDelta::minutes(10) + TimeDelta::milliseconds(1),
        );
        let exactly = StoredEntry::new(e.clone(), now - TimeDelta::minutes(10));
        let older = StoredEntry::new(e.clone(), now - TimeDelta::minutes(11));

        assert!(guard.repeats(&just_inside, &e, now));
        assert!(!guard.repeats(&exactly, &e, now));
        assert!(!guard.repeats(&older, &e, now));
    }

    #[test]
    fn test_any_differing_field_is_not_duplicate() {
        let guard = guard(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        let latest = StoredEntry::new(entry("hello", Some("1.2.3.4"), Some("mac")), now);

        assert!(!guard.repeats(&latest, &entry("hellO", Some("1.2.3.4"), Some("mac")), now));
        assert!(!guard.repeats(&latest, &entry("hello", Some("1.2.3.5"), Some("mac")), now));
        assert!(!guard.repeats(&latest, &entry("hello", Some("1.2.3.4"), Some("win")), now));
        assert!(!guard.repeats(&latest, &entry("hello", None, Some("mac")), now));
        // fields outside text/ip/os don't matter
        let mut other_city = entry("hello", Some("1.2.3.4"), Some("mac"));
        other_city.city = Some("Lima".to_string());
        assert!(guard.repeats(&latest, &other_city, now));
    }

    #[tokio::test]
    async fn test_only_newest_entry_is_compared() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let repeat = entry("hello", None, None);
        store
            .append(StoredEntry::new(repeat.clone(), now - TimeDelta::seconds(30)))
            .await
            .unwrap();
        store
            .append(StoredEntry::new(entry("other", None, None), now - TimeDelta::seconds(10)))
            .await
            .unwrap();

        let check = guard(store).check(&repeat, now).await;
        assert!(matches!(check, DuplicateCheck::Unique));
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let guard = guard(Arc::new(BrokenStore));
        let check = guard.check(&entry("hello", None, None), Utc::now()).await;
        assert!(matches!(check, DuplicateCheck::CheckFailed(StoreError::Unavailable(_))));
        assert!(!check.is_duplicate());
    }
}
