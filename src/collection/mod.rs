//! The durable, append-only store behind the guestbook.

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use tokio::sync::broadcast;

use crate::error::CollectionError;
use crate::models::{GuestEntry, NewEntry};

pub mod memory;
pub mod mysql;

pub use memory::MemoryCollection;
pub use mysql::MysqlCollection;

const ID_LEN: usize = 20;

/// Append-only list of guest entries owned by an external service.
///
/// The collection is the authority on ids and write timestamps; callers only
/// hand over validated fields.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Durably append an entry and return it as stored.
    async fn append(&self, entry: NewEntry) -> Result<GuestEntry, CollectionError>;

    /// Entries ordered newest first, optionally capped to the `limit` most recent.
    async fn list(&self, limit: Option<usize>) -> Result<Vec<GuestEntry>, CollectionError>;

    /// Signals once for every change to the collection.
    fn changes(&self) -> broadcast::Receiver<()>;
}

fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}
