//! Keyword knowledge retriever: in-process ranking over named collections.
//!
//! Documents are scored by how many distinct query terms they contain,
//! weighted by how often each term occurs. Good enough to pick the right
//! OpenAPI chunk for a step like "[API] get runs of actor X".

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use stepwise_config::{CollectionConfig, CollectionKind};
use stepwise_core::error::RetrievalError;
use stepwise_core::{Document, KnowledgeRetriever};
use tracing::{debug, info};
use crate::openapi::ApiCatalog;

/// Collection seeded from the OpenAPI catalog.
pub const OPENAPI_COLLECTION: &str = "OpenAPISpecs";

/// Collection holding free-text definitions for the planner.
pub const KNOWLEDGE_COLLECTION: &str = "knowledgebase";

pub struct KeywordRetriever {
    collections: HashMap<String, Vec<Document>>,
    top_k: usize,
}

impl KeywordRetriever {
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
            top_k: 1,
        }
    }

    /// Number of documents returned per query (default 1).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Add documents to a collection, creating it if needed.
    pub fn insert(&mut self, collection: impl Into<String>, documents: Vec<Document>) {
        self.collections
            .entry(collection.into())
            .or_default()
            .extend(documents);
    }

    /// Seed [`OPENAPI_COLLECTION`] with one chunk per documented path.
    pub fn with_catalog(mut self, catalog: &ApiCatalog) -> Self {
        self.insert(OPENAPI_COLLECTION, catalog.chunks());
        self
    }

    /// Load a configured collection from disk.
    pub fn load_collection(&mut self, config: &CollectionConfig) -> std::result::Result<(), RetrievalError> {
        let documents = match config.kind {
            CollectionKind::Openapi => ApiCatalog::load_dir(&config.location)?.chunks(),
            CollectionKind::Text => load_text(&config.location)?,
        };
        info!(collection = %config.name, documents = documents.len(), "Collection loaded");
        self.insert(config.name.clone(), documents);
        Ok(())
    }

    pub fn collection_len(&self, collection: &str) -> Option<usize> {
        self.collections.get(collection).map(Vec::len)
    }
}

impl Default for KeywordRetriever {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeRetriever for KeywordRetriever {
    async fn retrieve(
        &self,
        query: &str,
        collection: &str,
    ) -> std::result::Result<Vec<Document>, RetrievalError> {
        let documents = self
            .collections
            .get(collection)
            .ok_or_else(|| RetrievalError::UnknownCollection(collection.to_string()))?;

        let terms = terms(query);
        let mut scored: Vec<(usize, Document)> = documents
            .iter()
            .enumerate()
            .filter_map(|(idx, doc)| {
                let score = score(&terms, &doc.content);
                (score > 0.0).then(|| {
                    let mut doc = doc.clone();
                    doc.score = score;
                    (idx, doc)
                })
            })
            .collect();

        // Highest score first; ties keep insertion order.
        scored.sort_by(|(ia, a), (ib, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ia.cmp(ib))
        });
        scored.truncate(self.top_k);

        debug!(collection, hits = scored.len(), "Keyword retrieval");
        Ok(scored.into_iter().map(|(_, d)| d).collect())
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

fn score(terms: &HashSet<String>, content: &str) -> f32 {
    let lower = content.to_lowercase();
    let mut matched = 0usize;
    let mut occurrences = 0usize;
    for term in terms {
        let count = lower.matches(term.as_str()).count();
        if count > 0 {
            matched += 1;
            occurrences += count;
        }
    }
    if matched == 0 {
        return 0.0;
    }
    // Distinct matches dominate; frequency breaks ties.
    matched as f32 + (occurrences as f32).ln_1p() / 10.0
}

fn load_text(path: &Path) -> std::result::Result<Vec<Document>, RetrievalError> {
    let content = std::fs::read_to_string(path).map_err(|e| RetrievalError::LoadFailed {
        location: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let source = path.display().to_string();
    Ok(content
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| Document::new(block).with_source(source.clone()))
        .collect())
}
