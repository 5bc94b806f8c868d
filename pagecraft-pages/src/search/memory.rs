//! In-process search index.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tokio::sync::RwLock;

use super::{
    DocumentKind, IndexOp, SearchDocument, SearchError, SearchHits, SearchIndex, SearchQuery,
    SortField, TagRule,
};

/// Documents per index name, keyed by document id.
#[derive(Default)]
pub struct MemorySearchIndex {
    indexes: RwLock<HashMap<String, BTreeMap<String, SearchDocument>>>,
    unavailable: AtomicBool,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every request fail with [`SearchError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    pub async fn document(&self, index: &str, id: &str) -> Option<SearchDocument> {
        let indexes = self.indexes.read().await;
        indexes.get(index).and_then(|docs| docs.get(id)).cloned()
    }

    pub async fn len(&self, index: &str) -> usize {
        let indexes = self.indexes.read().await;
        indexes.get(index).map_or(0, BTreeMap::len)
    }

    fn check_available(&self) -> Result<(), SearchError> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(SearchError::Unavailable("index is offline".into()));
        }
        Ok(())
    }
}

fn matches(doc: &SearchDocument, query: &SearchQuery) -> bool {
    let kind = match query.kind {
        DocumentKind::Latest => doc.latest,
        DocumentKind::Published => doc.published,
    };
    if !kind || doc.locale != query.locale {
        return false;
    }
    if let Some(created_by) = &query.created_by {
        if &doc.created_by.id != created_by {
            return false;
        }
    }
    if let Some(category) = &query.category {
        if &doc.category != category {
            return false;
        }
    }
    if let Some(status) = query.status {
        if doc.status != status {
            return false;
        }
    }
    if let Some(filter) = &query.tags {
        if !filter.query.is_empty() {
            let has = |tag: &String| doc.tags.contains(tag);
            let ok = match filter.rule {
                TagRule::All => filter.query.iter().all(has),
                TagRule::Any => filter.query.iter().any(has),
            };
            if !ok {
                return false;
            }
        }
    }
    if let Some(text) = &query.text {
        if !doc.title_lc.contains(&text.to_lowercase()) {
            return false;
        }
    }
    true
}

fn compare(a: &SearchDocument, b: &SearchDocument, field: SortField) -> Ordering {
    match field {
        SortField::CreatedOn => a.created_on.cmp(&b.created_on),
        SortField::SavedOn => a.saved_on.cmp(&b.saved_on),
        SortField::PublishedOn => a.published_on.cmp(&b.published_on),
        SortField::Title => a.title_lc.cmp(&b.title_lc),
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn bulk(&self, index: &str, ops: Vec<IndexOp>) -> Result<(), SearchError> {
        self.check_available()?;
        let mut indexes = self.indexes.write().await;
        let docs = indexes.entry(index.to_string()).or_default();
        for op in ops {
            match op {
                IndexOp::Index { id, document } => {
                    docs.insert(id, *document);
                }
                IndexOp::Delete { id } => {
                    docs.remove(&id);
                }
            }
        }
        Ok(())
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> Result<SearchHits, SearchError> {
        self.check_available()?;
        let indexes = self.indexes.read().await;
        let Some(docs) = indexes.get(index) else {
            return Ok(SearchHits::default());
        };

        let mut hits: Vec<&SearchDocument> = docs.values().filter(|d| matches(d, query)).collect();
        hits.sort_by(|a, b| {
            let ordering = compare(a, b, query.sort.field);
            let ordering = if query.sort.descending {
                ordering.reverse()
            } else {
                ordering
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });

        Ok(SearchHits {
            total: hits.len(),
            documents: hits
                .into_iter()
                .skip(query.from)
                .take(query.size)
                .cloned()
                .collect(),
        })
    }

    async fn tag_aggregation(
        &self,
        index: &str,
        contains: &str,
        size: usize,
    ) -> Result<Vec<String>, SearchError> {
        self.check_available()?;
        let indexes = self.indexes.read().await;
        let Some(docs) = indexes.get(index) else {
            return Ok(Vec::new());
        };

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for tag in docs.values().flat_map(|d| d.tags.iter()) {
            if tag.contains(contains) {
                *counts.entry(tag.as_str()).or_default() += 1;
            }
        }

        let mut buckets: Vec<(&str, usize)> = counts.into_iter().collect();
        buckets.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        Ok(buckets
            .into_iter()
            .take(size)
            .map(|(tag, _)| tag.to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{SortSpec, TagFilter};
    use pagecraft_core::{Owner, PageStatus};

    const INDEX: &str = "root-page-builder";

    fn doc(pid: &str, title: &str, created_on: u64, tags: &[&str], kind: DocumentKind) -> SearchDocument {
        let owner = Owner {
            id: if pid == "c" { "u2".into() } else { "u1".into() },
            display_name: "User".into(),
            kind: "admin".into(),
        };
        SearchDocument {
            tenant: "root".into(),
            id: format!("{pid}#0001"),
            pid: pid.into(),
            editor: "page-builder".into(),
            locale: "en-US".into(),
            created_on,
            saved_on: created_on,
            created_by: owner.clone(),
            owned_by: owner,
            category: "static".into(),
            version: 1,
            title: title.into(),
            title_lc: title.to_lowercase(),
            path: format!("/{pid}"),
            status: PageStatus::Draft,
            locked: false,
            published_on: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            snippet: None,
            image: None,
            latest: kind == DocumentKind::Latest,
            published: kind == DocumentKind::Published,
        }
    }

    async fn seeded() -> MemorySearchIndex {
        let index = MemorySearchIndex::new();
        let docs = [
            doc("a", "Alpha", 1, &["news", "tech"], DocumentKind::Latest),
            doc("b", "Beta", 2, &["news"], DocumentKind::Latest),
            doc("c", "Gamma", 3, &["tech"], DocumentKind::Latest),
            doc("a", "Alpha", 1, &["news", "tech"], DocumentKind::Published),
        ];
        let ops = docs
            .into_iter()
            .map(|d| IndexOp::Index {
                id: if d.latest { format!("L#{}", d.pid) } else { format!("P#{}", d.pid) },
                document: Box::new(d),
            })
            .collect();
        index.bulk(INDEX, ops).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_search_filters_and_sorts() {
        let index = seeded().await;

        let query = SearchQuery::new(DocumentKind::Latest, "en-US");
        let hits = index.search(INDEX, &query).await.unwrap();
        assert_eq!(hits.total, 3);
        let pids: Vec<_> = hits.documents.iter().map(|d| d.pid.as_str()).collect();
        assert_eq!(pids, vec!["c", "b", "a"]);

        let mut query = SearchQuery::new(DocumentKind::Latest, "en-US");
        query.tags = Some(TagFilter {
            query: vec!["news".into(), "tech".into()],
            rule: TagRule::All,
        });
        assert_eq!(index.search(INDEX, &query).await.unwrap().total, 1);
        query.tags = Some(TagFilter {
            query: vec!["news".into(), "tech".into()],
            rule: TagRule::Any,
        });
        assert_eq!(index.search(INDEX, &query).await.unwrap().total, 3);

        let mut query = SearchQuery::new(DocumentKind::Latest, "en-US");
        query.created_by = Some("u2".into());
        query.text = Some("GAM".into());
        assert_eq!(index.search(INDEX, &query).await.unwrap().documents[0].pid, "c");

        let query = SearchQuery::new(DocumentKind::Published, "de-DE");
        assert_eq!(index.search(INDEX, &query).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_search_pagination() {
        let index = seeded().await;
        let mut query = SearchQuery::new(DocumentKind::Latest, "en-US");
        query.sort = SortSpec {
            field: SortField::Title,
            descending: false,
        };
        query.from = 1;
        query.size = 1;
        let hits = index.search(INDEX, &query).await.unwrap();
        assert_eq!(hits.total, 3);
        assert_eq!(hits.documents.len(), 1);
        assert_eq!(hits.documents[0].title, "Beta");
    }

    #[tokio::test]
    async fn test_tag_aggregation() {
        let index = seeded().await;
        let tags = index.tag_aggregation(INDEX, "e", 10).await.unwrap();
        // "news" appears three times, "tech" three times; ties sort by name.
        assert_eq!(tags, vec!["news".to_string(), "tech".to_string()]);
        let tags = index.tag_aggregation(INDEX, "ec", 10).await.unwrap();
        assert_eq!(tags, vec!["tech".to_string()]);
    }

    #[tokio::test]
    async fn test_unavailable_and_delete() {
        let index = seeded().await;
        index
            .bulk(INDEX, vec![IndexOp::Delete { id: "L#b".into() }])
            .await
            .unwrap();
        assert!(index.document(INDEX, "L#b").await.is_none());
        assert_eq!(index.len(INDEX).await, 3);

        index.set_unavailable(true);
        assert!(matches!(
            index.tag_aggregation(INDEX, "ne", 10).await,
            Err(SearchError::Unavailable(_))
        ));
    }
}
