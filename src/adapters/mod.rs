pub mod memory;

#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub mod sql;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;

pub use memory::MemoryAdapter;

use crate::{error::Error, query::Query, record::Record};

/// -----------------------------
/// Adapter contract
/// -----------------------------
///
/// The query engine behind pagination. Adapters translate the [`Query`]
/// plan (predicate tree, ordering, limit) into whatever their engine runs.
/// Errors are returned as they come; pagination never retries.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Rows matching the filters, in `query.ordering`, capped at `query.limit`.
    async fn fetch(&self, query: &Query) -> Result<Vec<Record>, Error>;

    /// Number of rows matching the filters. Ordering and limit are ignored.
    async fn count(&self, query: &Query) -> Result<u64, Error>;
}
