//! Process-local knowledge store ranked by term-frequency cosine similarity.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentChunker, KnowledgeStore, SearchHit};
use crate::models::Payload;

struct Entry {
    id: String,
    document: String,
    metadata: Payload,
    terms: HashMap<String, f64>,
    norm: f64,
}

pub struct InMemoryKnowledgeStore {
    collections: RwLock<BTreeMap<String, Vec<Entry>>>,
    chunker: DocumentChunker,
}

impl Default for InMemoryKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::with_chunker(DocumentChunker::default())
    }

    pub fn with_chunker(chunker: DocumentChunker) -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
            chunker,
        }
    }
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut terms = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *terms.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    terms
}

fn norm(terms: &HashMap<String, f64>) -> f64 {
    terms.values().map(|v| v * v).sum::<f64>().sqrt()
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn add_documents(
        &self,
        collection: &str,
        documents: Vec<String>,
        metadatas: Vec<Payload>,
        ids: Option<Vec<String>>,
    ) {
        let mut collections = self.collections.write().await;
        let entries = collections.entry(collection.to_string()).or_default();
        let mut added = 0;

        for (i, document) in documents.iter().enumerate() {
            let metadata = metadatas.get(i).cloned().unwrap_or_default();
            let base_id = ids
                .as_ref()
                .and_then(|ids| ids.get(i).cloned())
                .unwrap_or_else(|| format!("doc_{}", entries.len()));

            for (n, chunk) in self.chunker.split(document).into_iter().enumerate() {
                let id = if n == 0 {
                    base_id.clone()
                } else {
                    format!("{}_{}", base_id, n)
                };
                let terms = term_frequencies(&chunk);
                let entry = Entry {
                    norm: norm(&terms),
                    id,
                    document: chunk,
                    metadata: metadata.clone(),
                    terms,
                };
                match entries.iter_mut().find(|e| e.id == entry.id) {
                    Some(existing) => *existing = entry,
                    None => entries.push(entry),
                }
                added += 1;
            }
        }

        tracing::info!("[KnowledgeStore] Added {} chunk(s) to {}", added, collection);
    }

    async fn search(&self, collection: &str, query: &str, k: usize) -> Vec<SearchHit> {
        let collections = self.collections.read().await;
        let Some(entries) = collections.get(collection) else {
            tracing::debug!("[KnowledgeStore] Search on unknown collection {}", collection);
            return Vec::new();
        };

        let query_terms = term_frequencies(query);
        let query_norm = norm(&query_terms);

        let mut hits: Vec<SearchHit> = entries
            .iter()
            .map(|entry| {
                let dot: f64 = query_terms
                    .iter()
                    .filter_map(|(t, q)| entry.terms.get(t).map(|d| q * d))
                    .sum();
                let score = if query_norm > 0.0 && entry.norm > 0.0 {
                    dot / (query_norm * entry.norm)
                } else {
                    0.0
                };
                SearchHit {
                    id: entry.id.clone(),
                    document: entry.document.clone(),
                    metadata: entry.metadata.clone(),
                    score,
                }
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits
    }

    async fn collection_len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|e| e.len())
            .unwrap_or(0)
    }

    async fn list_collections(&self) -> Vec<String> {
        self.collections.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_search_ranks_by_overlap() {
        let store = InMemoryKnowledgeStore::new();
        store
            .add_documents(
                "seo",
                docs(&[
                    "Use canonical tags to prevent duplicate content issues.",
                    "Optimize images with descriptive filenames and alt text.",
                    "Create an XML sitemap and submit to search engines.",
                ]),
                Vec::new(),
                None,
            )
            .await;

        let hits = store.search("seo", "image alt text for images", 2).await;
        assert_eq!(hits.len(), 2);
        assert!(hits[0].document.starts_with("Optimize images"));
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits[0].id, "doc_1");
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order_and_unknown_is_empty() {
        let store = InMemoryKnowledgeStore::new();
        store
            .add_documents(
                "tips",
                docs(&["alpha", "beta", "gamma"]),
                Vec::new(),
                Some(vec!["a".into(), "b".into(), "c".into()]),
            )
            .await;

        let hits = store.search("tips", "unrelated", 3).await;
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert!(store.search("missing", "alpha", 3).await.is_empty());
        assert_eq!(store.collection_len("tips").await, 3);
        assert_eq!(store.list_collections().await, vec!["tips".to_string()]);
    }

    #[tokio::test]
    async fn test_same_id_replaces_document() {
        let store = InMemoryKnowledgeStore::new();
        store
            .add_documents("c", docs(&["first"]), Vec::new(), Some(vec!["x".into()]))
            .await;
        store
            .add_documents("c", docs(&["second"]), Vec::new(), Some(vec!["x".into()]))
            .await;
        assert_eq!(store.collection_len("c").await, 1);
        assert_eq!(store.search("c", "second", 1).await[0].document, "second");
    }
}
