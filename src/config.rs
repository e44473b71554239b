use serde::{Deserialize, Serialize};

use crate::{error::Error, page_info::PageInfoOptions};

pub const DEFAULT_LIMIT: u32 = 50;

/// Engine-wide pagination settings.
///
/// ```json
/// { "limit": 25, "pageInfo": { "total": true, "hasNext": true }, "fingerprintCursors": true }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationOptions {
    /// Page size used when neither the query nor the request carries one.
    pub limit: u32,
    pub page_info: PageInfoOptions,
    /// Append an ordering digest to cursors and reject cursors minted under
    /// another ordering.
    pub fingerprint_cursors: bool,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page_info: PageInfoOptions::default(),
            fingerprint_cursors: false,
        }
    }
}

impl PaginationOptions {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialize(e.to_string()))
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_page_info(mut self, page_info: PageInfoOptions) -> Self {
        self.page_info = page_info;
        self
    }

    pub fn with_fingerprint(mut self, enabled: bool) -> Self {
        self.fingerprint_cursors = enabled;
        self
    }
}
