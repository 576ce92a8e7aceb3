//! Similarity retrieval with exact cosine re-scoring, and keyword lookup.
use serde::Serialize;
use tracing::debug;

use crate::db::{ChunkStore, IndexRecord, IndexStats, StoreError};
use crate::embedder::{Embedder, embed_or_zero};

/// Cosine similarity of two vectors.
///
/// Returns exactly `0.0` when either vector has zero norm or the lengths
/// differ. Accumulates in `f64`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// A stored record that passed the similarity threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub record: IndexRecord,
    pub similarity: f32,
}

pub struct Retriever<'a, S: ChunkStore + ?Sized, E: Embedder + ?Sized> {
    pub store: &'a S,
    pub embedder: &'a E,
}

impl<'a, S: ChunkStore + ?Sized, E: Embedder + ?Sized> Retriever<'a, S, E> {
    pub fn new(store: &'a S, embedder: &'a E) -> Self {
        Self { store, embedder }
    }

    /// Up to `limit` nearest candidates, re-scored by cosine similarity,
    /// filtered to `similarity >= threshold` and sorted descending.
    ///
    /// `limit` bounds the candidate set, not the result count. Store failures
    /// propagate; there is no retry.
    pub fn search_similar(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let query_vector = embed_or_zero(self.embedder, query);
        let candidates = self.store.nearest(&query_vector, limit)?;
        let candidate_count = candidates.len();

        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .map(|record| SearchResult {
                similarity: cosine_similarity(&query_vector, &record.embedding),
                record,
            })
            .filter(|r| r.similarity >= threshold)
            .collect();

        // stable: ties keep retrieval order
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        debug!(
            "{} of {} candidates passed threshold {}",
            results.len(),
            candidate_count,
            threshold
        );
        Ok(results)
    }

    /// Records whose code or name contains `keyword`, in store order.
    pub fn search_by_keyword(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<IndexRecord>, StoreError> {
        self.store.keyword_search(keyword, limit)
    }

    pub fn stats(&self) -> Result<IndexStats, StoreError> {
        self.store.stats()
    }
}
