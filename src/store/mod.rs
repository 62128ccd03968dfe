//! Persistence for submitted entries.
//!
//! The store is an append-only collection ordered by the server-assigned
//! `timestamp`. The service only ever reads back the newest entry.

use async_trait::async_trait;

use crate::models::StoredEntry;

mod firestore;
mod memory;

pub use firestore::{FirestoreAuth, FirestoreStore};
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not get a store access token: {0}")]
    Auth(#[from] gcp_auth::Error),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed store document: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Newest entry by `timestamp`, if any.
    async fn latest(&self) -> Result<Option<StoredEntry>, StoreError>;

    /// Appends one entry. Entries are never updated or removed.
    async fn append(&self, entry: StoredEntry) -> Result<(), StoreError>;
}
