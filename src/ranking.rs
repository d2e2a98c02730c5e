use crate::config::EngineConfig;
use crate::document::{DocId, Product};
use crate::index::InvertedIndex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// BM25 parameters
#[derive(Debug, Clone, Copy)]
pub struct BM25 {
    k1: f64,
    b: f64,
}

impl Default for BM25 {
    fn default() -> Self {
        Self {
            k1: crate::config::BM25_K1,
            b: crate::config::BM25_B,
        }
    }
}

impl BM25 {
    pub fn new(k1: f64, b: f64) -> Self {
        Self { k1, b }
    }

    /// Calculate the BM25 score of one document.
    ///
    /// Repeated query terms count once per occurrence. Empty documents and an
    /// empty corpus score zero.
    pub fn score(&self, query_terms: &[String], doc_id: DocId, index: &InvertedIndex) -> f64 {
        let avg_doc_length = index.avg_doc_length();
        let doc_length = match index.doc_length(doc_id) {
            Some(len) if len > 0 && avg_doc_length > 0.0 => len as f64,
            _ => return 0.0,
        };
        let total_docs = index.total_documents() as f64;

        let mut score = 0.0;
        for term in query_terms {
            let tf = index.term_frequency(term, doc_id) as f64;
            if tf == 0.0 {
                continue;
            }

            let doc_freq = index.doc_frequency(term) as f64;
            let idf = ((total_docs - doc_freq + 0.5) / (doc_freq + 0.5) + 1.0).ln();

            let normalized_tf = (tf * (self.k1 + 1.0))
                / (tf + self.k1 * (1.0 - self.b + self.b * (doc_length / avg_doc_length)));

            score += idf * normalized_tf;
        }

        score
    }
}

/// Ranked search result
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: f64,
}

impl ScoredDocument {
    pub fn new(doc_id: DocId, score: f64) -> Self {
        Self { doc_id, score }
    }
}

/// Stable sort by descending score; equal scores keep their current order.
pub fn sort_by_score(docs: &mut [ScoredDocument]) {
    docs.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// BM25 retrieval followed by product-aware boosts.
#[derive(Debug, Clone)]
pub struct Ranker {
    bm25: BM25,
    config: EngineConfig,
}

impl Ranker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            bm25: BM25::new(config.k1, config.b),
            config: config.clone(),
        }
    }

    /// Score every document that contains at least one query term and keep
    /// the best `limit`. Ties are ordered by ascending document id.
    pub fn retrieve(
        &self,
        query_terms: &[String],
        index: &InvertedIndex,
        limit: usize,
    ) -> Vec<ScoredDocument> {
        let candidates: BTreeSet<DocId> = query_terms
            .iter()
            .flat_map(|term| index.postings(term).iter().map(|p| p.doc_id))
            .collect();

        let mut scored: Vec<ScoredDocument> = candidates
            .into_iter()
            .map(|doc_id| ScoredDocument::new(doc_id, self.bm25.score(query_terms, doc_id, index)))
            .collect();

        sort_by_score(&mut scored);
        scored.truncate(limit);
        scored
    }

    /// Weighted count of query terms found verbatim in the name, category
    /// path and description.
    pub fn match_boost(&self, product: &Product, query_terms: &[String]) -> f64 {
        let name = product.name.to_lowercase();
        let categories = product.category_text().to_lowercase();
        let description = product.description.to_lowercase();

        let count = |field: &str| {
            query_terms
                .iter()
                .filter(|term| field.contains(term.as_str()))
                .count() as f64
        };

        count(&name) * self.config.name_weight
            + count(&categories) * self.config.category_weight
            + count(&description) * self.config.description_weight
    }

    /// Multiplier favouring discounted and well rated products. Unknown
    /// values leave it at 1.
    pub fn popularity_boost(&self, product: &Product) -> f64 {
        1.0 + product.discount_percentage().unwrap_or(0.0) * self.config.discount_weight
            + product.rating.unwrap_or(0.0) * self.config.rating_weight
    }

    /// Final relevance for a candidate that survived filtering.
    pub fn combined_score(&self, base_score: f64, product: &Product, query_terms: &[String]) -> f64 {
        let boost = self.match_boost(product, query_terms);
        let score = base_score * (1.0 + boost * self.config.match_boost_scale);

        if self.config.popularity_boost {
            score * self.popularity_boost(product)
        } else {
            score
        }
    }
}
