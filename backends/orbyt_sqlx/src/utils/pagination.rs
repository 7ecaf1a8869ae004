use serde::Deserialize;

/// Raw `?page=&limit=` values. Kept as strings so that junk falls back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

/// Largest `limit` any listing accepts.
pub const MAX_PAGE_LIMIT: i64 = 50;

/// Offset pagination, 1-based pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn from_query(query: &PageQuery, default_limit: i64, max_limit: i64) -> Self {
        let page = positive(query.page.as_deref()).unwrap_or(1);
        let limit = positive(query.limit.as_deref())
            .unwrap_or(default_limit)
            .min(max_limit);

        Self { page, limit }
    }

    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn has_more(&self, returned: usize, total: i64) -> bool {
        self.skip().saturating_add(returned as i64) < total
    }
}

fn positive(raw: Option<&str>) -> Option<i64> {
    raw?.trim().parse::<i64>().ok().filter(|n| *n > 0)
}
