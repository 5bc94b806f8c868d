//! List arguments and pagination metadata.

use pagecraft_core::PageStatus;
use serde::{Deserialize, Serialize};

use crate::search::{DocumentKind, SearchQuery, SortSpec, TagFilter};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListWhere {
    pub category: Option<String>,
    pub status: Option<PageStatus>,
    pub tags: Option<TagFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListPagesArgs {
    #[serde(rename = "where")]
    pub filter: ListWhere,
    /// Free text matched against the title
    pub search: Option<String>,
    pub sort: Option<SortSpec>,
    /// 1-based page number
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl ListPagesArgs {
    /// Page number and clamped page size.
    pub fn window(&self, default_limit: usize, max_limit: usize) -> (usize, usize) {
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit.max(1));
        let page = self.page.unwrap_or(1).max(1);
        (page, limit)
    }

    pub fn to_query(
        &self,
        kind: DocumentKind,
        locale: &str,
        default_limit: usize,
        max_limit: usize,
    ) -> SearchQuery {
        let (page, limit) = self.window(default_limit, max_limit);
        let mut query = SearchQuery::new(kind, locale);
        query.category = self.filter.category.clone();
        query.status = self.filter.status;
        query.tags = self.filter.tags.clone();
        query.text = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        query.sort = self.sort.unwrap_or_default();
        query.from = (page - 1).saturating_mul(limit);
        query.size = limit;
        query
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub page: usize,
    pub limit: usize,
    pub total_count: usize,
    pub total_pages: usize,
    /// 1-based index of the first item on this page, 0 when empty
    pub from: usize,
    pub to: usize,
    pub next_page: Option<usize>,
    pub previous_page: Option<usize>,
}

impl ListMeta {
    pub fn new(page: usize, limit: usize, total_count: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = total_count.div_ceil(limit);
        let from = if total_count == 0 {
            0
        } else {
            limit.saturating_mul(page - 1).saturating_add(1)
        };
        Self {
            page,
            limit,
            total_count,
            total_pages,
            from,
            to: total_count.min(limit.saturating_mul(page)),
            next_page: (page < total_pages).then(|| page + 1),
            previous_page: (page > 1).then(|| page - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SortField;

    #[test]
    fn test_window_clamps() {
        let args = ListPagesArgs::default();
        assert_eq!(args.window(10, 100), (1, 10));

        let args = ListPagesArgs {
            page: Some(0),
            limit: Some(1000),
            ..ListPagesArgs::default()
        };
        assert_eq!(args.window(10, 100), (1, 100));
    }

    #[test]
    fn test_to_query() {
        let args: ListPagesArgs = serde_json::from_str(
            r#"{"where":{"category":"blog","tags":{"query":["a"],"rule":"any"}},
                "search":"  spring ","sort":{"field":"title","descending":false},
                "page":3,"limit":5}"#,
        )
        .unwrap();
        let query = args.to_query(DocumentKind::Published, "en-US", 10, 100);
        assert_eq!(query.category.as_deref(), Some("blog"));
        assert_eq!(query.text.as_deref(), Some("spring"));
        assert_eq!(query.sort.field, SortField::Title);
        assert_eq!(query.from, 10);
        assert_eq!(query.size, 5);
    }

    #[test]
    fn test_meta() {
        let meta = ListMeta::new(2, 10, 25);
        assert_eq!(meta.total_pages, 3);
        assert_eq!((meta.from, meta.to), (11, 20));
        assert_eq!(meta.next_page, Some(3));
        assert_eq!(meta.previous_page, Some(1));

        let meta = ListMeta::new(1, 10, 0);
        assert_eq!((meta.from, meta.to, meta.total_pages), (0, 0, 0));
        assert_eq!(meta.next_page, None);
        assert_eq!(meta.previous_page, None);
    }

    #[test]
    fn test_huge_page_number() {
        let args = ListPagesArgs {
            page: Some(usize::MAX),
            limit: Some(10),
            ..ListPagesArgs::default()
        };
        let query = args.to_query(DocumentKind::Published, "en-US", 10, 100);
        assert_eq!(query.from, usize::MAX);
        assert_eq!(query.size, 10);

        let meta = ListMeta::new(usize::MAX, 10, 5);
        assert_eq!(meta.total_pages, 1);
        assert_eq!((meta.from, meta.to), (usize::MAX, 5));
        assert_eq!(meta.next_page, None);
        assert_eq!(meta.previous_page, Some(usize::MAX - 1));
    }
}
