//! Ranking and filtering knobs.
//!
//! Defaults reproduce the production ranking; tests build their own
//! [`EngineConfig`] when they need to isolate one stage.

use serde::{Deserialize, Serialize};

/// BM25 term frequency saturation.
pub const BM25_K1: f64 = 1.5;
/// BM25 length normalization.
pub const BM25_B: f64 = 0.75;

/// Result count used when the caller does not ask for one.
pub const DEFAULT_TOP_N: usize = 10;

/// Candidates pulled from the base BM25 scan per requested result.
pub const CANDIDATE_MULTIPLIER: usize = 2;

/// Terms that mark a product as sensitive. Matched as substrings of the
/// name, brand and every category segment.
pub const BLOCKED_TERMS: &[&str] = &[
    "bra",
    "brassiere",
    "lingerie",
    "bikini",
    "panty",
    "underwear",
    "intimate",
    "innerwear",
    "brief",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub k1: f64,
    pub b: f64,
    pub candidate_multiplier: usize,
    pub name_weight: f64,
    pub category_weight: f64,
    pub description_weight: f64,
    /// Scale applied to the summed match weights: `bm25 * (1 + boost * scale)`.
    pub match_boost_scale: f64,
    /// Multiply in the discount/rating boost after the match boost.
    pub popularity_boost: bool,
    pub discount_weight: f64,
    pub rating_weight: f64,
    pub blocked_terms: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            k1: BM25_K1,
            b: BM25_B,
            candidate_multiplier: CANDIDATE_MULTIPLIER,
            name_weight: 3.0,
            category_weight: 2.0,
            description_weight: 1.0,
            match_boost_scale: 0.1,
            popularity_boost: true,
            discount_weight: 0.01,
            rating_weight: 0.2,
            blocked_terms: BLOCKED_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl EngineConfig {
    pub fn without_popularity_boost(mut self) -> Self {
        self.popularity_boost = false;
        self
    }
}
