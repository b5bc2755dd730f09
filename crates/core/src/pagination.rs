//! Offset/limit pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// Page size used when the caller asks for a non-positive limit.
pub const DEFAULT_LIMIT: i64 = 10;

/// A normalized offset/limit pair.
///
/// Construction always normalizes: `limit <= 0` becomes [`DEFAULT_LIMIT`] and
/// a negative `offset` becomes `0`, so a `PageRequest` is never degenerate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    offset: i64,
    limit: i64,
}

impl PageRequest {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset: offset.max(0),
            limit: if limit <= 0 { DEFAULT_LIMIT } else { limit },
        }
    }

    /// Build from optional query parameters (`?offset=&limit=`).
    pub fn from_query(offset: Option<i64>, limit: Option<i64>) -> Self {
        Self::new(offset.unwrap_or(0), limit.unwrap_or(DEFAULT_LIMIT))
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Apply skip/limit to an already filtered and sorted sequence.
    pub fn slice<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_LIMIT)
    }
}

/// One page of results plus the pre-pagination total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            offset: request.offset(),
            limit: request.limit(),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), 0, request)
    }

    /// `ceil(total / limit)`.
    pub fn total_pages(&self) -> u64 {
        let limit = self.limit.max(1) as u64;
        self.total.div_ceil(limit)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}
