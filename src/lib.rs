//! # Ousia Cursor
//!
//! Keyset (cursor) pagination over any query engine that can filter, order
//! and count rows.
//!
//! Instead of `OFFSET`, every page is located by the sort-key values of the
//! row at its edge. The next page is "rows strictly after this tuple" under
//! the query's multi-column ordering; the previous page runs the same
//! predicate with every direction flipped and reverses the rows it gets
//! back. Pages therefore stay stable while rows are inserted or deleted
//! elsewhere in the table, and every page costs one indexed range scan.
//!
//! ## What's inside
//!
//! ### Opaque cursors
//! A cursor is a URL-safe token carrying one value per ordering rule. Dates
//! keep sub-second precision, JSON values survive intact, and an optional
//! ordering fingerprint rejects cursors minted under another sort order.
//!
//! ### Ordering rules
//! Plain columns, `COALESCE` orderings for nullable columns, JSON paths and
//! arbitrary expressions with a custom boundary transform.
//!
//! ### Page metadata
//! `next` and `previous` cursors come with every page. Totals, remaining
//! counts and `has_next`/`has_previous` flags are opt-in; each one needs a
//! counting query and the counts run concurrently.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use ousia_cursor::{Engine, PageRequest, Query, adapters::sqlite::SqliteAdapter};
//!
//! let engine = Engine::new(Box::new(SqliteAdapter::new_memory().await?));
//! let query = Query::new("movies").order_by_desc("released_at").order_by_asc("id");
//!
//! let page = engine.page(&query, PageRequest::first().with_limit(20)).await?;
//! let next = engine.next_page(&query, page.page_info.next.clone()).await?;
//! ```
//!
//! ## Feature flags
//!
//! | Flag       | Default | Description                  |
//! |------------|---------|------------------------------|
//! | `postgres` | ✓       | PostgreSQL adapter via sqlx  |
//! | `sqlite`   | ✓       | SQLite adapter via sqlx      |
pub mod adapters;
pub mod config;
pub mod cursor;
pub mod error;
pub mod expr;
pub mod keyset;
pub mod ordering;
pub mod page;
pub mod page_info;
pub mod query;
pub mod record;
pub mod resolver;
pub mod value;

use metrics::histogram;
use std::{sync::Arc, time::Instant};

pub use crate::adapters::{Adapter, MemoryAdapter};
pub use crate::config::{DEFAULT_LIMIT, PaginationOptions};
pub use crate::cursor::{Cursor, CursorCodec};
pub use crate::error::Error;
pub use crate::expr::{Comparison, Expr, Predicate};
pub use crate::ordering::{Direction, KeysetTuple, OrderingRule, OrderingSpec};
pub use crate::page::{Node, PageRequest, PageResult};
pub use crate::page_info::{PageInfo, PageInfoOptions};
pub use crate::query::Query;
pub use crate::record::Record;
pub use crate::resolver::{DefaultResolver, MappedResolver, PropertyResolver};
pub use crate::value::{ToValue, Value};

/// The Engine pairs an adapter with pagination settings and a property
/// resolver. Cloning is cheap; clones share the adapter.
#[derive(Clone)]
pub struct Engine {
    adapter: Arc<dyn Adapter>,
    resolver: Arc<dyn PropertyResolver>,
    options: PaginationOptions,
}

impl Engine {
    pub fn new(adapter: Box<dyn Adapter>) -> Self {
        Self {
            adapter: Arc::from(adapter),
            resolver: Arc::new(DefaultResolver),
            options: PaginationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PaginationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_resolver(mut self, resolver: impl PropertyResolver) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn options(&self) -> &PaginationOptions {
        &self.options
    }

    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    /// Fetch one page of `query`. The query must carry at least one ordering
    /// rule; its ordering is the keyset.
    pub async fn page(&self, query: &Query, request: PageRequest) -> Result<PageResult, Error> {
        page::execute(
            self.adapter.as_ref(),
            self.resolver.as_ref(),
            &self.options,
            query,
            &request,
        )
        .await
    }

    /// Rows after `cursor`. An empty cursor yields the first page.
    pub async fn next_page(
        &self,
        query: &Query,
        cursor: impl Into<Cursor>,
    ) -> Result<PageResult, Error> {
        self.page(query, PageRequest::forward(cursor)).await
    }

    /// Rows before `cursor`. An empty cursor yields the last page.
    pub async fn previous_page(
        &self,
        query: &Query,
        cursor: impl Into<Cursor>,
    ) -> Result<PageResult, Error> {
        self.page(query, PageRequest::backward(cursor)).await
    }

    /// Run `query` as-is, without pagination.
    pub async fn fetch(&self, query: &Query) -> Result<Vec<Record>, Error> {
        let start = Instant::now();
        let records = self.adapter.fetch(query).await?;
        histogram!("ousia_cursor.query.duration_ms",
            "source" => query.source.clone()
        )
        .record(start.elapsed().as_millis() as f64);
        Ok(records)
    }

    /// Count rows matching the filters of `query`.
    pub async fn count(&self, query: &Query) -> Result<u64, Error> {
        self.adapter.count(query).await
    }
}
