use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{KnowledgeStore, SearchHit};

/// Named groups of shared collections, keyed by workflow category.
pub struct KnowledgeRegistry {
    store: Arc<dyn KnowledgeStore>,
    domains: BTreeMap<String, BTreeSet<String>>,
}

impl KnowledgeRegistry {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        let mut domains = BTreeMap::new();
        for (domain, collections) in [
            ("marketing", &["marketing_knowledge", "seo_knowledge"][..]),
            ("productivity", &["meeting_knowledge", "productivity_tips"][..]),
            ("email", &["email_templates", "communication_best_practices"][..]),
            ("general", &["general_knowledge"][..]),
        ] {
            domains.insert(
                domain.to_string(),
                collections.iter().map(|c| c.to_string()).collect(),
            );
        }
        Self { store, domains }
    }

    pub fn store(&self) -> Arc<dyn KnowledgeStore> {
        self.store.clone()
    }

    /// Collections of a domain, sorted; unknown domains have none.
    pub fn domain_collections(&self, domain: &str) -> Vec<String> {
        self.domains
            .get(domain)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every collection registered to any domain.
    pub fn shared_collections(&self) -> Vec<String> {
        self.domains
            .values()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn register_collection(&mut self, domain: &str, collection: &str) {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .insert(collection.to_string());
    }

    pub fn list_domains(&self) -> Vec<String> {
        self.domains.keys().cloned().collect()
    }

    /// Search each collection of a domain independently.
    pub async fn search_domain(
        &self,
        domain: &str,
        query: &str,
        k: usize,
    ) -> BTreeMap<String, Vec<SearchHit>> {
        let mut results = BTreeMap::new();
        for collection in self.domain_collections(domain) {
            let hits = self.store.search(&collection, query, k).await;
            results.insert(collection, hits);
        }
        results
    }
}
