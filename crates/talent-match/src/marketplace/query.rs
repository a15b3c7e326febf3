//! Translation of admin listing parameters into store-level filter and range
//! expressions.

use std::collections::HashMap;

use serde::Serialize;

use super::domain::{CompanyStatus, EnglishLevel, RequestStatus, TalentRole, TalentStatus};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filter value meaning "do not constrain this column".
pub const ALL_SENTINEL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Talents,
    Companies,
    HiringRequests,
}

impl Table {
    pub const fn name(self) -> &'static str {
        match self {
            Table::Talents => "talents",
            Table::Companies => "companies",
            Table::HiringRequests => "hiring_requests",
        }
    }

    /// Recognized filter keys, in the order their constraints are appended.
    pub const fn filters(self) -> &'static [FilterSpec] {
        match self {
            Table::Talents => TALENT_FILTERS,
            Table::Companies => &[],
            Table::HiringRequests => HIRING_REQUEST_FILTERS,
        }
    }
}

/// Maps an HTTP filter key onto a column and the values that column accepts.
#[derive(Clone, Copy)]
pub struct FilterSpec {
    pub key: &'static str,
    pub column: &'static str,
    accepts: fn(&str) -> bool,
}

const TALENT_FILTERS: &[FilterSpec] = &[
    FilterSpec {
        key: "status",
        column: "application_status",
        accepts: |value| TalentStatus::parse(value).is_some(),
    },
    FilterSpec {
        key: "role",
        column: "role",
        accepts: |value| TalentRole::parse(value).is_some(),
    },
    FilterSpec {
        key: "englishLevel",
        column: "english_level",
        accepts: |value| EnglishLevel::parse(value).is_some(),
    },
];

const HIRING_REQUEST_FILTERS: &[FilterSpec] = &[
    FilterSpec {
        key: "requestStatus",
        column: "request_status",
        accepts: |value| RequestStatus::parse(value).is_some(),
    },
    FilterSpec {
        key: "applicationStatus",
        column: "application_status",
        accepts: |value| CompanyStatus::parse(value).is_some(),
    },
];

/// Equality constraint on a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub column: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: &'static str,
    pub descending: bool,
}

impl SortOrder {
    pub const fn newest_first() -> Self {
        Self {
            column: "created_at",
            descending: true,
        }
    }
}

/// Inclusive row window, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub from: u64,
    pub to: u64,
}

/// Store-agnostic description of a listing read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub table: Table,
    pub constraints: Vec<Constraint>,
    pub order: SortOrder,
    pub range: RowRange,
}

impl ListingQuery {
    /// Unfiltered first page of `table`.
    pub fn base(table: Table) -> Self {
        let pagination = Pagination::default();
        Self {
            table,
            constraints: Vec::new(),
            order: SortOrder::newest_first(),
            range: pagination.range(),
        }
    }
}

/// Raw filter parameters as they arrive from a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilters(HashMap<String, String>);

impl ListingFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl From<HashMap<String, String>> for ListingFilters {
    fn from(value: HashMap<String, String>) -> Self {
        Self(value)
    }
}

/// Requested page, always normalized to `page >= 1` and
/// `1 <= page_size <= MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = u32::try_from(page.max(1)).unwrap_or(u32::MAX);
        let page_size = if page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            u32::try_from(page_size.min(i64::from(MAX_PAGE_SIZE))).unwrap_or(MAX_PAGE_SIZE)
        };
        Self { page, page_size }
    }

    /// Builds from optional query parameters, falling back to defaults.
    pub fn from_params(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self::new(page.unwrap_or(1), page_size.unwrap_or(i64::from(DEFAULT_PAGE_SIZE)))
    }

    pub const fn page(self) -> u32 {
        self.page
    }

    pub const fn page_size(self) -> u32 {
        self.page_size
    }

    /// `[(page-1)*size, page*size-1]`.
    pub fn range(self) -> RowRange {
        let size = u64::from(self.page_size);
        let from = (u64::from(self.page) - 1) * size;
        RowRange {
            from,
            to: from + size - 1,
        }
    }

    pub fn meta(self, total_count: u64) -> PageMeta {
        let size = u64::from(self.page_size);
        PageMeta {
            page: self.page,
            page_size: self.page_size,
            total_count,
            total_pages: total_count.div_ceil(size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

/// Listing response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

/// Appends one equality constraint per recognized, non-sentinel filter (in the
/// table's declared key order), orders newest first, and windows the result.
/// Unknown keys and values outside a column's domain are ignored.
pub fn build_query(
    base: ListingQuery,
    filters: &ListingFilters,
    pagination: Pagination,
) -> ListingQuery {
    let mut query = base;

    for spec in query.table.filters() {
        let Some(raw) = filters.get(spec.key) else {
            continue;
        };
        let value = raw.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(ALL_SENTINEL) || !(spec.accepts)(value)
        {
            continue;
        }
        query.constraints.push(Constraint {
            column: spec.column,
            value: value.to_string(),
        });
    }

    query.order = SortOrder::newest_first();
    query.range = pagination.range();
    query
}
