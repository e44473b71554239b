//! Optional page metadata derived from counting queries.

use std::time::Instant;

use metrics::histogram;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{adapters::Adapter, cursor::Cursor, error::Error, query::Query};

/// Which metrics to compute. Every metric costs a counting query, so all
/// are off by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageInfoOptions {
    pub total: bool,
    pub remaining: bool,
    pub remaining_before: bool,
    pub remaining_after: bool,
    pub has_more: bool,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageInfoOptions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            total: true,
            remaining: true,
            remaining_before: true,
            remaining_after: true,
            has_more: true,
            has_next: true,
            has_previous: true,
        }
    }

    /// Metrics that need the row count of the unpaginated query.
    fn needs_total(&self) -> bool {
        self.total
            || self.has_next
            || self.has_previous
            || self.remaining_before
            || self.remaining_after
    }

    /// Metrics that need the row count past the boundary.
    fn needs_matching(&self) -> bool {
        self.remaining
            || self.remaining_before
            || self.remaining_after
            || self.has_more
            || self.has_next
            || self.has_previous
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub next: Cursor,
    pub previous: Cursor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_before: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_previous: Option<bool>,
}

impl PageInfo {
    pub fn new(next: Cursor, previous: Cursor) -> Self {
        Self {
            next,
            previous,
            ..Default::default()
        }
    }
}

/// Issues the counting queries the enabled metrics need and fills them in.
///
/// `snapshot` is the caller's query before pagination; `filtered` carries
/// the keyset predicate but no pagination limit. Both counts run
/// concurrently, and a count no enabled metric needs is never issued.
pub(crate) async fn compute(
    adapter: &dyn Adapter,
    snapshot: &Query,
    filtered: &Query,
    page_len: usize,
    backward: bool,
    options: &PageInfoOptions,
    info: &mut PageInfo,
) -> Result<(), Error> {
    if !options.needs_total() && !options.needs_matching() {
        return Ok(());
    }

    let start = Instant::now();
    let total = async {
        if options.needs_total() {
            adapter.count(snapshot).await.map(Some)
        } else {
            Ok(None)
        }
    };
    let matching = async {
        if options.needs_matching() {
            adapter.count(filtered).await.map(Some)
        } else {
            Ok(None)
        }
    };
    let (total, matching) = tokio::try_join!(total, matching)?;

    histogram!("ousia_cursor.page_info.duration_ms").record(start.elapsed().as_millis() as f64);
    debug!(?total, ?matching, page_len, backward, "page info counts");

    derive(total, matching, page_len as u64, backward, options, info);
    Ok(())
}

fn derive(
    total: Option<u64>,
    matching: Option<u64>,
    page_len: u64,
    backward: bool,
    options: &PageInfoOptions,
    info: &mut PageInfo,
) {
    if options.total {
        info.total = total;
    }

    let Some(matching) = matching else {
        return;
    };

    let remaining = matching.saturating_sub(page_len);
    // Rows on the other side of the boundary.
    let behind = total.map(|t| t.saturating_sub(matching)).unwrap_or(0);

    if options.remaining {
        info.remaining = Some(remaining);
    }
    if options.remaining_before {
        info.remaining_before = Some(if backward { remaining } else { behind });
    }
    if options.remaining_after {
        info.remaining_after = Some(if backward { behind } else { remaining });
    }
    if options.has_more {
        info.has_more = Some(remaining > 0);
    }
    if options.has_previous {
        info.has_previous = Some((backward && remaining > 0) || (!backward && behind > 0));
    }
    if options.has_next {
        info.has_next = Some((!backward && remaining > 0) || (backward && behind > 0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derived(total: u64, matching: u64, len: u64, backward: bool) -> PageInfo {
        let mut info = PageInfo::default();
        derive(
            Some(total),
            Some(matching),
            len,
            backward,
            &PageInfoOptions::all(),
            &mut info,
        );
        info
    }

    #[test]
    fn test_forward_from_start() {
        let info = derived(20, 20, 5, false);
        assert_eq!(info.total, Some(20));
        assert_eq!(info.remaining, Some(15));
        assert_eq!(info.remaining_before, Some(0));
        assert_eq!(info.remaining_after, Some(15));
        assert_eq!(info.has_more, Some(true));
        assert_eq!(info.has_next, Some(true));
        assert_eq!(info.has_previous, Some(false));
    }

    #[test]
    fn test_forward_middle() {
        // Rows 10..15 of 20: 10 matched past the boundary at row 9.
        let info = derived(20, 10, 5, false);
        assert_eq!(info.remaining, Some(5));
        assert_eq!(info.remaining_before, Some(10));
        assert_eq!(info.remaining_after, Some(5));
        assert_eq!(info.has_previous, Some(true));
        assert_eq!(info.has_next, Some(true));
    }

    #[test]
    fn test_backward_middle() {
        // Rows 5..10 of 20 fetched backward from row 10: 10 rows lie before it.
        let info = derived(20, 10, 5, true);
        assert_eq!(info.remaining, Some(5));
        assert_eq!(info.remaining_before, Some(5));
        assert_eq!(info.remaining_after, Some(10));
        assert_eq!(info.has_more, Some(true));
        assert_eq!(info.has_previous, Some(true));
        assert_eq!(info.has_next, Some(true));
    }

    #[test]
    fn test_only_enabled_metrics_are_set() {
        let mut info = PageInfo::default();
        let options = PageInfoOptions {
            has_next: true,
            ..Default::default()
        };
        derive(Some(20), Some(20), 5, false, &options, &mut info);
        assert_eq!(info.has_next, Some(true));
        assert_eq!(info.total, None);
        assert_eq!(info.remaining, None);
        assert_eq!(info.has_previous, None);
    }

    #[test]
    fn test_count_requirements() {
        assert!(!PageInfoOptions::none().needs_total());
        assert!(!PageInfoOptions::none().needs_matching());

        let remaining_only = PageInfoOptions {
            remaining: true,
            ..Default::default()
        };
        assert!(!remaining_only.needs_total());
        assert!(remaining_only.needs_matching());

        let total_only = PageInfoOptions {
            total: true,
            ..Default::default()
        };
        assert!(total_only.needs_total());
        assert!(!total_only.needs_matching());
    }
}
