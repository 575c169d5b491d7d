//! List query parsing
//!
//! A list request carries two kinds of query parameters: the paging pair
//! (`pageNumber`, `pageSize`) and the filters a resource declares. Paging
//! input is clamped, never rejected. Filters are exact-match conditions; a
//! missing, empty or whitespace-only value means "no filter".
//!
//! Parameter names are matched case-insensitively and unknown keys are
//! ignored.

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};

use crate::error::{Error, Result};
use crate::repository::{FilterCondition, FilterValue, Pagination, Predicate};

/// Page returned when none is requested
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

/// Items per page when none is requested
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Hard upper bound on items per page
pub const MAX_PAGE_SIZE: u64 = 100;

const PAGE_NUMBER_PARAM: &str = "pagenumber";
const PAGE_SIZE_PARAM: &str = "pagesize";

/// Normalized paging request
///
/// Always satisfies `page_number >= 1` and `1 <= page_size <= MAX_PAGE_SIZE`.
///
/// ```rust
/// use organized_scann::handlers::PageRequest;
///
/// let page = PageRequest::normalize(Some(0), Some(500));
/// assert_eq!(page.page_number, 1);
/// assert_eq!(page.page_size, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u64,
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Clamp raw input into range; absent values take the defaults
    #[must_use]
    pub fn normalize(page_number: Option<i64>, page_size: Option<i64>) -> Self {
        let page_number = page_number.map_or(DEFAULT_PAGE_NUMBER, |n| n.max(1).unsigned_abs());
        let page_size = page_size.map_or(DEFAULT_PAGE_SIZE, |n| {
            n.clamp(1, MAX_PAGE_SIZE as i64).unsigned_abs()
        });
        Self {
            page_number,
            page_size,
        }
    }

    /// Offset/limit window for the persistence gateway
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        Pagination::page(self.page_number, self.page_size)
    }
}

/// How a filter value is compared
#[derive(Debug, Clone, Copy)]
pub enum FilterKind {
    /// String equality on the raw value
    Text,
    /// Integer equality; a non-integer value is rejected
    Integer,
    /// String equality after mapping the value onto a canonical keyword
    ///
    /// Values the mapping does not recognize are compared as given.
    Keyword(fn(&str) -> Option<&'static str>),
}

/// A filter a resource accepts on its list endpoint
#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    /// Query parameter name
    pub param: &'static str,
    /// Storage column the parameter constrains
    pub column: &'static str,
    pub kind: FilterKind,
}

impl FilterField {
    pub const fn text(param: &'static str, column: &'static str) -> Self {
        Self {
            param,
            column,
            kind: FilterKind::Text,
        }
    }

    pub const fn integer(param: &'static str, column: &'static str) -> Self {
        Self {
            param,
            column,
            kind: FilterKind::Integer,
        }
    }

    pub const fn keyword(
        param: &'static str,
        column: &'static str,
        canonical: fn(&str) -> Option<&'static str>,
    ) -> Self {
        Self {
            param,
            column,
            kind: FilterKind::Keyword(canonical),
        }
    }

    fn condition(&self, raw: &str) -> Result<FilterCondition> {
        let value = match self.kind {
            FilterKind::Text => FilterValue::from(raw),
            FilterKind::Integer => raw.trim().parse::<i64>().map(FilterValue::from).map_err(|_| {
                Error::ValidationError(format!("{}: must be an integer", self.param))
            })?,
            FilterKind::Keyword(canonical) => match canonical(raw) {
                Some(keyword) => FilterValue::from(keyword),
                None => FilterValue::from(raw),
            },
        };
        Ok(FilterCondition::eq(self.column, value))
    }
}

/// Raw filter values keyed by lowercased parameter name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    values: HashMap<String, String>,
}

impl FilterSet {
    /// Collect query pairs; the first occurrence of a repeated key wins
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values = HashMap::new();
        for (key, value) in pairs {
            values
                .entry(key.as_ref().to_ascii_lowercase())
                .or_insert_with(|| value.into());
        }
        Self { values }
    }

    /// Value for `param` unless it is absent, empty or whitespace
    pub fn get(&self, param: &str) -> Option<&str> {
        self.values
            .get(&param.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// AND together one exact-match condition per declared, present filter
    ///
    /// # Errors
    ///
    /// Returns a validation error when an integer filter is not an integer.
    pub fn build(&self, fields: &[FilterField]) -> Result<Predicate> {
        fields.iter().try_fold(Predicate::all(), |predicate, field| {
            Ok(match self.get(field.param) {
                Some(raw) => predicate.and(field.condition(raw)?),
                None => predicate,
            })
        })
    }

    fn page_param(&self, param: &str) -> Option<i64> {
        self.get(param).and_then(|v| v.trim().parse().ok())
    }
}

/// Query extractor for list endpoints
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: PageRequest,
    pub filters: FilterSet,
}

impl ListQuery {
    /// Parse an already-split query
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let filters = FilterSet::from_pairs(pairs);
        let page = PageRequest::normalize(
            filters.page_param(PAGE_NUMBER_PARAM),
            filters.page_param(PAGE_SIZE_PARAM),
        );
        Self { page, filters }
    }
}

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|rejection| Error::BadRequest(rejection.body_text()))?;
        Ok(Self::from_pairs(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILTERS: &[FilterField] = &[
        FilterField::text("brand", "brand"),
        FilterField::integer("year", "year"),
    ];

    #[test]
    fn test_page_defaults() {
        assert_eq!(
            PageRequest::normalize(None, None),
            PageRequest {
                page_number: 1,
                page_size: 20
            }
        );
    }

    #[test]
    fn test_page_clamping() {
        let page = PageRequest::normalize(Some(-4), Some(0));
        assert_eq!((page.page_number, page.page_size), (1, 1));

        let page = PageRequest::normalize(Some(3), Some(101));
        assert_eq!((page.page_number, page.page_size), (3, 100));

        let page = PageRequest::normalize(Some(i64::MIN), Some(i64::MAX));
        assert_eq!((page.page_number, page.page_size), (1, 100));
    }

    #[test]
    fn test_page_window() {
        let window = PageRequest::normalize(Some(3), Some(10)).pagination();
        assert_eq!(window, Pagination::new(20, 10));
    }

    #[test]
    fn test_non_numeric_paging_falls_back_to_defaults() {
        let query = ListQuery::from_pairs([("pageNumber", "two"), ("pageSize", "lots")]);
        assert_eq!(query.page, PageRequest::default());
    }

    #[test]
    fn test_paging_keys_are_case_insensitive() {
        let query = ListQuery::from_pairs([("PAGENUMBER", "2"), ("pagesize", "5")]);
        assert_eq!(query.page.page_number, 2);
        assert_eq!(query.page.page_size, 5);
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let filters = FilterSet::from_pairs([("brand", "   "), ("year", "")]);
        assert!(filters.build(FILTERS).unwrap().is_empty());
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let filters =
            FilterSet::from_pairs([("brand", "Honda"), ("year", "2022"), ("color", "red")]);
        let predicate = filters.build(FILTERS).unwrap();
        assert_eq!(predicate.to_string(), "brand = 'Honda' AND year = 2022");
    }

    #[test]
    fn test_non_integer_filter_is_rejected() {
        let filters = FilterSet::from_pairs([("year", "new")]);
        let err = filters.build(FILTERS).unwrap_err();
        assert!(matches!(err, Error::ValidationError(msg) if msg.contains("year")));
    }

    #[test]
    fn test_keyword_filter_is_canonicalized() {
        fn upper(v: &str) -> Option<&'static str> {
            v.eq_ignore_ascii_case("admin").then_some("ADMIN")
        }
        let fields = [FilterField::keyword("role", "role", upper)];

        let predicate = FilterSet::from_pairs([("role", "admin")]).build(&fields).unwrap();
        assert_eq!(predicate.to_string(), "role = 'ADMIN'");

        let predicate = FilterSet::from_pairs([("role", "guest")]).build(&fields).unwrap();
        assert_eq!(predicate.to_string(), "role = 'guest'");
    }
}
