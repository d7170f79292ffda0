//! Retrieval capability shared across agents.
//!
//! Collections are named buckets of text documents. Search never fails
//! from the caller's point of view: an unknown or broken collection yields
//! no hits.

pub mod chunker;
pub mod memory;
pub mod registry;

pub use chunker::DocumentChunker;
pub use memory::InMemoryKnowledgeStore;
pub use registry::KnowledgeRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Payload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub document: String,
    pub metadata: Payload,
    pub score: f64,
}

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Add documents to a collection, creating it on first use. Documents are
    /// chunked before indexing; `ids` default to `doc_<i>`.
    async fn add_documents(
        &self,
        collection: &str,
        documents: Vec<String>,
        metadatas: Vec<Payload>,
        ids: Option<Vec<String>>,
    );

    /// Up to `k` nearest documents, best first.
    async fn search(&self, collection: &str, query: &str, k: usize) -> Vec<SearchHit>;

    async fn collection_len(&self, collection: &str) -> usize;

    async fn list_collections(&self) -> Vec<String>;
}
