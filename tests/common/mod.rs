#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use ousia_cursor::{
    Cursor, Engine, MemoryAdapter, PageInfoOptions, PageRequest, PaginationOptions, Query, Record,
};
use serde_json::json;

pub const GENRES: [&str; 3] = ["drama", "comedy", "horror"];
pub const DIRECTORS: [Option<&str>; 4] = [Some("Varda"), None, Some("akerman"), Some("Kubrick")];

/// Twenty movies with duplicated sort keys, nullable directors and JSON
/// metadata, so every ordering needs a tie-breaker.
pub fn movies() -> Vec<Record> {
    (1..=20i64)
        .map(|id| {
            Record::new()
                .with("id", id)
                .with("title", format!("Title {:02}", (id * 7) % 9))
                .with("genre", GENRES[(id % 3) as usize])
                .with("rating", ((id * 13) % 5) as f64 + 0.5)
                .with("director", DIRECTORS[(id % 4) as usize])
                .with("released", format!("2020-{:02}-01", (id % 12) + 1))
        })
        .collect()
}

/// `movies()` with typed dates and JSON columns, for the in-memory engine.
pub fn rich_movies() -> Vec<Record> {
    movies()
        .into_iter()
        .map(|record| {
            let id = record.get_path("id").as_int().unwrap_or_default();
            let mut record = record
                .with(
                    "published_at",
                    Utc.timestamp_millis_opt(1_600_000_000_000 + (id % 6) * 1_001)
                        .unwrap(),
                )
                .with(
                    "data",
                    json!({"author": {"name": format!("Author {}", id % 5)}, "pages": id * 10}),
                );
            if id % 7 == 0 {
                record.insert("published_at", ousia_cursor::Value::Null);
            }
            record
        })
        .collect()
}

pub fn memory_engine() -> Engine {
    let adapter = MemoryAdapter::new();
    adapter.insert_many("movies", rich_movies()).unwrap();
    Engine::new(Box::new(adapter)).with_options(all_page_info())
}

pub fn all_page_info() -> PaginationOptions {
    PaginationOptions::default().with_page_info(PageInfoOptions::all())
}

/// Walks `query` front to back and back to front for every page size,
/// comparing each page and its metadata with the unpaginated result, then
/// resumes from every row of a first page in both directions.
pub async fn assert_walk(engine: &Engine, query: &Query, page_sizes: std::ops::RangeInclusive<usize>) {
    let expected = engine.fetch(query).await.unwrap();
    let total = expected.len();
    assert!(total > 0, "fixture must not be empty");

    for size in page_sizes {
        let mut cursor = Cursor::empty();
        let mut offset = 0;
        while offset < total {
            let end = (offset + size).min(total);
            let label = format!("size {}, forward rows {}..{} of {}", size, offset, end, total);
            let page = engine
                .page(query, PageRequest::forward(cursor.clone()).with_limit((end - offset) as u32))
                .await
                .unwrap();

            assert_eq!(page.records, expected[offset..end], "{}", label);
            assert_eq!(page.cursors.len(), page.records.len(), "{}", label);
            let info = &page.page_info;
            assert_eq!(info.total, Some(total as u64), "{}", label);
            assert_eq!(info.remaining, Some((total - end) as u64), "{}", label);
            assert_eq!(info.remaining_after, Some((total - end) as u64), "{}", label);
            assert_eq!(info.remaining_before, Some(offset as u64), "{}", label);
            assert_eq!(info.has_more, Some(end < total), "{}", label);
            assert_eq!(info.has_next, Some(end < total), "{}", label);
            assert_eq!(info.has_previous, Some(offset > 0), "{}", label);

            cursor = page.page_info.next.clone();
            offset = end;
        }

        let past_end = engine
            .page(query, PageRequest::forward(cursor.clone()).with_limit(5))
            .await
            .unwrap();
        assert!(past_end.is_empty(), "size {}: page past the end", size);
        assert_eq!(past_end.page_info.next, cursor);

        let mut cursor = past_end.page_info.previous.clone();
        let mut end = total;
        while end > 0 {
            let offset = end.saturating_sub(size);
            let label = format!("size {}, backward rows {}..{} of {}", size, offset, end, total);
            let page = engine
                .page(query, PageRequest::backward(cursor.clone()).with_limit((end - offset) as u32))
                .await
                .unwrap();

            assert_eq!(page.records, expected[offset..end], "{}", label);
            let info = &page.page_info;
            assert_eq!(info.total, Some(total as u64), "{}", label);
            assert_eq!(info.remaining, Some(offset as u64), "{}", label);
            assert_eq!(info.remaining_after, Some((total - end) as u64), "{}", label);
            assert_eq!(info.remaining_before, Some(offset as u64), "{}", label);
            assert_eq!(info.has_more, Some(offset > 0), "{}", label);
            assert_eq!(info.has_next, Some(end < total), "{}", label);
            assert_eq!(info.has_previous, Some(offset > 0), "{}", label);

            cursor = page.page_info.previous.clone();
            end = offset;
        }

        let past_start = engine
            .page(query, PageRequest::backward(cursor.clone()).with_limit(5))
            .await
            .unwrap();
        assert!(past_start.is_empty(), "size {}: page before the start", size);
        assert_eq!(past_start.page_info.previous, cursor);
    }

    assert_resume_from_nodes(engine, query, &expected).await;
}

async fn assert_resume_from_nodes(engine: &Engine, query: &Query, expected: &[Record]) {
    let total = expected.len();
    let first = engine
        .page(query, PageRequest::first().with_limit(5))
        .await
        .unwrap();

    for (i, node) in first.nodes().enumerate() {
        assert_eq!(node.record, &expected[i]);

        let after = engine
            .page(query, PageRequest::forward(node.cursor.clone()).with_limit(5))
            .await
            .unwrap();
        let end = (i + 6).min(total);
        assert_eq!(after.records, expected[i + 1..end], "after node {}", i);
        assert_eq!(after.page_info.remaining_before, Some(i as u64 + 1));
        assert_eq!(after.page_info.remaining, Some((total - end) as u64));
        assert_eq!(after.page_info.has_previous, Some(true));

        let before = engine
            .page(query, PageRequest::backward(node.cursor.clone()))
            .await
            .unwrap();
        assert_eq!(before.records, expected[..i], "before node {}", i);
        assert_eq!(before.page_info.remaining, Some(0));
        assert_eq!(before.page_info.remaining_after, Some((total - i) as u64));
        assert_eq!(before.page_info.has_more, Some(false));
        assert_eq!(before.page_info.has_previous, Some(false));
        assert_eq!(before.page_info.has_next, Some(true));
    }
}
