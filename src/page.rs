//! Page execution.
//!
//! A page request runs four stages in order: snapshot the caller's query,
//! resolve the ordering and decode the cursor, attach the keyset predicate
//! and limit, then execute and reassemble the page with its cursors.

use std::time::Instant;

use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    adapters::Adapter,
    config::PaginationOptions,
    cursor::{Cursor, CursorCodec},
    error::Error,
    keyset::build_predicate,
    ordering::KeysetTuple,
    page_info::{self, PageInfo},
    query::Query,
    record::Record,
    resolver::PropertyResolver,
};

/// Where a page starts and which way it runs.
///
/// A forward request returns the rows after `cursor`; a backward request
/// returns the rows before it, still in declared order. Without a cursor
/// a forward request yields the first page and a backward one the last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: Option<Cursor>,
    pub backward: bool,
    /// Page size; ignored when the query carries its own limit.
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn first() -> Self {
        Self::default()
    }

    pub fn last() -> Self {
        Self {
            backward: true,
            ..Self::default()
        }
    }

    pub fn forward(cursor: impl Into<Cursor>) -> Self {
        Self {
            cursor: Some(cursor.into()),
            ..Self::default()
        }
    }

    pub fn backward(cursor: impl Into<Cursor>) -> Self {
        Self {
            cursor: Some(cursor.into()),
            backward: true,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A row of a page together with the cursor pointing at it.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    pub record: &'a Record,
    pub cursor: &'a Cursor,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageResult {
    pub records: Vec<Record>,
    /// One cursor per record, same order.
    pub cursors: Vec<Cursor>,
    pub page_info: PageInfo,
}

impl PageResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> {
        self.records
            .iter()
            .zip(&self.cursors)
            .map(|(record, cursor)| Node { record, cursor })
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.records.iter().map(Record::deserialize).collect()
    }
}

pub(crate) async fn execute(
    adapter: &dyn Adapter,
    resolver: &dyn PropertyResolver,
    options: &PaginationOptions,
    query: &Query,
    request: &PageRequest,
) -> Result<PageResult, Error> {
    let start = Instant::now();
    let backward = request.backward;

    // Snapshot
    let snapshot = query.clone();

    // Resolve
    let declared = query.ordering.resolved(resolver)?;
    let codec = if options.fingerprint_cursors {
        CursorCodec::fingerprinted(declared.fingerprint())
    } else {
        CursorCodec::new()
    };
    let raw = request.cursor.as_ref().map(Cursor::as_str).unwrap_or_default();
    let boundary = codec.decode(raw, declared.len()).inspect_err(|err| {
        warn!(source = %query.source, error = %err, "rejected pagination cursor");
        counter!("ousia_cursor.page.invalid_cursor").increment(1);
    })?;
    debug!(
        source = %query.source,
        arity = declared.len(),
        backward,
        has_boundary = boundary.is_some(),
        "resolved ordering"
    );

    // Filter & order
    let active = if backward {
        declared.reversed()
    } else {
        declared.clone()
    };
    let keyset = build_predicate(active.rules(), boundary.as_ref())?;

    let mut filtered = query.clone();
    filtered.set_ordering(active);
    if let Some(predicate) = keyset {
        filtered = filtered.filter(predicate);
    }

    let mut paged = filtered.clone();
    if !paged.has_limit() {
        paged.set_limit(request.limit.unwrap_or(options.limit));
    }
    debug!(source = %query.source, limit = ?paged.limit, "issuing page query");

    // Execute & reassemble
    let mut records = adapter.fetch(&paged).await?;
    if backward {
        records.reverse();
    }

    let first: Option<KeysetTuple> = match records.first() {
        Some(record) => Some(declared.tuple_of(record)),
        None if backward => boundary.clone(),
        None => None,
    };
    let last: Option<KeysetTuple> = match records.last() {
        Some(record) => Some(declared.tuple_of(record)),
        None if !backward => boundary.clone(),
        None => None,
    };

    let cursors = records
        .iter()
        .map(|record| codec.encode(Some(&declared.tuple_of(record))))
        .collect();

    let mut page_info = PageInfo::new(codec.encode(last.as_ref()), codec.encode(first.as_ref()));
    page_info::compute(
        adapter,
        &snapshot,
        &filtered,
        records.len(),
        backward,
        &options.page_info,
        &mut page_info,
    )
    .await?;

    histogram!("ousia_cursor.page.duration_ms",
        "direction" => if backward { "backward" } else { "forward" }
    )
    .record(start.elapsed().as_millis() as f64);
    debug!(source = %query.source, len = records.len(), backward, "page assembled");

    Ok(PageResult {
        records,
        cursors,
        page_info,
    })
}
