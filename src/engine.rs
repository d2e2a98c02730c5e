use crate::config::EngineConfig;
use crate::document::{DocId, Product};
use crate::error::{Result, SearchError};
use crate::filter::{passes_filters, ContentBlocker};
use crate::index::{IndexStats, InvertedIndex};
use crate::query::{ExtractedQuery, QueryExtractor, QueryFilters};
use crate::ranking::{sort_by_score, Ranker, ScoredDocument};
use crate::tokenizer::Tokenizer;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info};

/// Outcome of one query: what the extractor understood and the ranked ids.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub clean_query: String,
    pub filters: QueryFilters,
    pub results: Vec<ScoredDocument>,
}

impl QueryResult {
    fn from_extracted(extracted: ExtractedQuery, results: Vec<ScoredDocument>) -> Self {
        Self {
            clean_query: extracted.clean,
            filters: extracted.filters,
            results,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub total_products: usize,
    pub brands: usize,
    pub categories: usize,
    pub avg_rating: Option<f64>,
    pub index: IndexStats,
}

/// Product search over one immutable catalog snapshot.
///
/// Built once from the full catalog; every query method takes `&self`, so a
/// single engine can be shared across threads behind an `Arc`.
pub struct SearchEngine {
    products: Vec<Product>,
    index: InvertedIndex,
    tokenizer: Tokenizer,
    ranker: Ranker,
    extractor: QueryExtractor,
    blocker: ContentBlocker,
    config: EngineConfig,
}

impl SearchEngine {
    /// Index a catalog. Document ids are catalog positions.
    pub fn build(products: Vec<Product>, config: EngineConfig) -> Result<Self> {
        if products.is_empty() {
            return Err(SearchError::EmptyCatalog);
        }

        let tokenizer = Tokenizer::new();
        let index = InvertedIndex::build(&products, &tokenizer)?;
        let extractor = QueryExtractor::from_products(&products);

        info!(
            products = products.len(),
            terms = index.stats().total_terms,
            brands = extractor.known_brands().len(),
            categories = extractor.known_categories().len(),
            "search index built"
        );

        Ok(Self {
            ranker: Ranker::new(&config),
            blocker: ContentBlocker::new(&config.blocked_terms),
            products,
            index,
            tokenizer,
            extractor,
            config,
        })
    }

    /// Ranked `(doc id, score)` pairs for a query, at most `top_n` of them.
    pub fn search(&self, query: &str, top_n: usize) -> Vec<ScoredDocument> {
        self.execute(query, top_n).results
    }

    /// Like [`search`](Self::search) but also reports the extracted filters.
    ///
    /// Never fails: any fault inside the pipeline is logged and turned into
    /// an empty result.
    pub fn execute(&self, query: &str, top_n: usize) -> QueryResult {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run_pipeline(query, top_n))) {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                error!(query, error = %err, "search failed");
                QueryResult::default()
            }
            Err(_) => {
                error!(query, "search panicked");
                QueryResult::default()
            }
        }
    }

    fn run_pipeline(&self, query: &str, top_n: usize) -> Result<QueryResult> {
        // The whole query scores; extraction only decides the filters.
        let query_terms = self.tokenizer.analyze(query);
        if top_n == 0 || query_terms.is_empty() {
            return Ok(QueryResult::default());
        }

        let extracted = self.extractor.extract(query);

        let limit = top_n.saturating_mul(self.config.candidate_multiplier);
        let candidates = self.ranker.retrieve(&query_terms, &self.index, limit);
        let retrieved = candidates.len();

        let mut scored = Vec::with_capacity(retrieved);
        for candidate in candidates {
            let product = self
                .products
                .get(candidate.doc_id)
                .ok_or(SearchError::MissingDocument(candidate.doc_id))?;

            if self.blocker.is_blocked(product) || !passes_filters(product, &extracted.filters) {
                continue;
            }

            let score = self
                .ranker
                .combined_score(candidate.score, product, &query_terms);
            scored.push(ScoredDocument::new(candidate.doc_id, score));
        }
        let filtered = scored.len();

        sort_by_score(&mut scored);
        let mut results = self.deduplicate(scored);
        results.truncate(top_n);

        debug!(
            query,
            terms = query_terms.len(),
            retrieved,
            filtered,
            returned = results.len(),
            "search complete"
        );

        Ok(QueryResult::from_extracted(extracted, results))
    }

    /// Keep the first (best scored) listing per name and brand.
    fn deduplicate(&self, scored: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
        let mut seen = HashSet::new();
        scored
            .into_iter()
            .filter(|doc| {
                self.products
                    .get(doc.doc_id)
                    .map_or(false, |p| seen.insert(p.dedup_key()))
            })
            .collect()
    }

    /// Best rated products first; unrated products trail in catalog order.
    pub fn trending(&self, limit: usize) -> Vec<DocId> {
        let mut ids: Vec<DocId> = (0..self.products.len())
            .filter(|&id| !self.blocker.is_blocked(&self.products[id]))
            .collect();

        ids.sort_by(|&a, &b| {
            let ra = self.products[a].rating.unwrap_or(f64::NEG_INFINITY);
            let rb = self.products[b].rating.unwrap_or(f64::NEG_INFINITY);
            rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
        });
        ids.truncate(limit);
        ids
    }

    /// Run only the filter extractor.
    pub fn extract(&self, query: &str) -> ExtractedQuery {
        self.extractor.extract(query)
    }

    pub fn product(&self, doc_id: DocId) -> Option<&Product> {
        self.products.get(doc_id)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        let ratings: Vec<f64> = self.products.iter().filter_map(|p| p.rating).collect();
        let avg_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        };

        // Distinct full trees, so "Men >> Shoes" and "Women >> Shoes" count twice.
        let categories: BTreeSet<String> = self
            .products
            .iter()
            .filter(|p| !p.categories.is_empty())
            .map(|p| p.categories.join(" >> ").to_lowercase())
            .collect();

        EngineStats {
            total_products: self.products.len(),
            brands: self.extractor.known_brands().len(),
            categories: categories.len(),
            avg_rating,
            index: self.index.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn engine(products: Vec<Product>) -> Result<SearchEngine> {
        Ok(SearchEngine::build(products, EngineConfig::default())?)
    }

    fn ids(results: &[ScoredDocument]) -> Vec<DocId> {
        results.iter().map(|r| r.doc_id).collect()
    }

    fn audio_catalog() -> Vec<Product> {
        vec![
            Product::new("Noise Cancelling Headphones")
                .with_brand("Sony")
                .with_categories(["Electronics", "Audio"])
                .with_description("Wireless over-ear headphones")
                .with_price(1800.0),
            Product::new("Noise Cancelling Wired Earphones")
                .with_brand("Boat")
                .with_categories(["Electronics", "Audio"])
                .with_price(900.0),
            Product::new("Wireless Headphones Pro")
                .with_brand("Sony")
                .with_categories(["Electronics", "Audio"])
                .with_description("Premium wireless headphones")
                .with_price(4500.0),
            Product::new("Wireless Headphones Lite")
                .with_brand("Acme")
                .with_categories(["Electronics", "Audio"])
                .with_description("Budget wireless headphones"),
            Product::new("Basic Headphones")
                .with_brand("Acme")
                .with_categories(["Electronics", "Audio"])
                .with_price(300.0),
        ]
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let result = SearchEngine::build(Vec::new(), EngineConfig::default());
        assert!(matches!(result, Err(SearchError::EmptyCatalog)));
    }

    #[test]
    fn test_red_shoes_ranks_first() -> Result<()> {
        let engine = engine(vec![
            Product::new("Red Shoes"),
            Product::new("Blue Shoes"),
            Product::new("Red Shirt"),
        ])?;

        let results = engine.search("red shoes", 10);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].doc_id, 0);
        assert!(results[0].score > results[1].score);
        Ok(())
    }

    #[test]
    fn test_empty_queries_return_nothing() -> Result<()> {
        let engine = engine(audio_catalog())?;

        assert!(engine.search("", 10).is_empty());
        assert!(engine.search("   ", 10).is_empty());
        assert!(engine.search("a an", 10).is_empty());
        assert!(engine.search("?!", 10).is_empty());
        assert!(engine.search("headphones", 0).is_empty());
        Ok(())
    }

    #[test]
    fn test_filter_words_still_score() -> Result<()> {
        let engine = engine(vec![
            Product::new("Kids Cycle").with_description("Ride under the sun").with_price(450.0),
            Product::new("Adult Cycle").with_description("Ride under the rain").with_price(4500.0),
            Product::new("Water Bottle").with_price(150.0),
        ])?;

        let outcome = engine.execute("under 500", 10);
        assert_eq!(outcome.filters.max_price, Some(500.0));
        assert_eq!(outcome.clean_query, "");
        assert_eq!(ids(&outcome.results), vec![0]);

        assert!(engine.search("under 100", 10).is_empty());
        Ok(())
    }

    #[test]
    fn test_max_price_filter() -> Result<()> {
        let engine = engine(audio_catalog())?;
        let outcome = engine.execute("wireless headphones under 2000", 10);

        assert_eq!(outcome.filters.max_price, Some(2000.0));
        assert_eq!(outcome.clean_query, "wireless headphones");
        assert!(!outcome.results.is_empty());
        for result in &outcome.results {
            let product = engine.product(result.doc_id).unwrap();
            // unknown prices are dropped too
            assert!(product.effective_price() <= 2000.0, "{}", product.name);
        }
        assert!(!ids(&outcome.results).contains(&2));
        assert!(!ids(&outcome.results).contains(&3));
        Ok(())
    }

    #[test]
    fn test_must_include_and_exclude() -> Result<()> {
        let engine = engine(audio_catalog())?;
        let outcome = engine.execute(r#""noise cancelling" -wired"#, 10);

        assert_eq!(outcome.filters.must_include, vec!["noise cancelling"]);
        assert_eq!(outcome.filters.exclude, vec!["wired"]);
        assert_eq!(ids(&outcome.results), vec![0]);
        Ok(())
    }

    #[test]
    fn test_blocked_products_never_returned() -> Result<()> {
        let engine = engine(vec![
            Product::new("Cotton Bra").with_rating(5.0),
            Product::new("Cotton Shirt"),
            Product::new("Cotton Socks").with_categories(["Clothing", "Innerwear"]),
        ])?;

        for query in ["cotton bra", "cotton", "bra", "\"cotton\"", "cotton socks"] {
            let results = engine.search(query, 10);
            assert!(!ids(&results).contains(&0), "query {query}");
            assert!(!ids(&results).contains(&2), "query {query}");
        }
        assert_eq!(ids(&engine.search("cotton", 10)), vec![1]);
        Ok(())
    }

    #[test]
    fn test_duplicates_collapsed() -> Result<()> {
        let engine = engine(vec![
            Product::new("Steel Bottle").with_brand("Milton"),
            Product::new("steel bottle ").with_brand("MILTON"),
            Product::new("Steel Bottle").with_brand("Cello"),
        ])?;

        let results = engine.search("steel bottle", 10);
        assert_eq!(results.len(), 2);

        let keys: HashSet<_> = results
            .iter()
            .map(|r| engine.product(r.doc_id).unwrap().dedup_key())
            .collect();
        assert_eq!(keys.len(), 2);
        Ok(())
    }

    #[test]
    fn test_duplicate_with_higher_score_survives() -> Result<()> {
        let engine = engine(vec![
            Product::new("Steel Bottle").with_brand("Milton"),
            Product::new("Steel Bottle").with_brand("Milton").with_rating(4.0),
            Product::new("Steel Bottle").with_brand("Cello"),
        ])?;

        // Identical text; only the rating lifts the second listing.
        let results = engine.search("steel bottle", 10);
        assert_eq!(ids(&results), vec![1, 2]);
        assert!(results[0].score > results[1].score);
        Ok(())
    }

    #[test]
    fn test_equal_scores_keep_candidate_order() -> Result<()> {
        let engine = engine(vec![
            Product::new("Steel Bottle").with_brand("Milton"),
            Product::new("Steel Bottle").with_brand("Cello"),
            Product::new("Steel Bottle").with_brand("Borosil"),
            Product::new("Steel Bottle").with_brand("Prestige").with_rating(4.0),
        ])?;

        let results = engine.search("steel bottle", 10);
        assert_eq!(ids(&results), vec![3, 0, 1, 2]);
        assert_eq!(results[1].score, results[2].score);
        assert_eq!(results[2].score, results[3].score);

        assert_eq!(ids(&engine.search("steel bottle", 2)), vec![3, 0]);
        Ok(())
    }

    #[test]
    fn test_short_brand_inside_query_word() -> Result<()> {
        let engine = engine(vec![
            Product::new("Samsung Galaxy Phone").with_brand("Samsung"),
            Product::new("Cloudflyer Running Shoes").with_brand("On"),
        ])?;

        // "on" is cut out of "phone" for the brand filter but "phone" still scores
        let outcome = engine.execute("phone", 10);
        assert_eq!(outcome.filters.brands, vec!["on"]);
        assert_eq!(ids(&outcome.results), vec![0]);
        Ok(())
    }

    #[test]
    fn test_short_category_inside_query_word() -> Result<()> {
        let engine = engine(vec![
            Product::new("Steam Iron").with_categories(["Appliances", "Irons"]),
            Product::new("Green Leaf").with_categories(["Beverages", "Tea"]),
        ])?;

        let outcome = engine.execute("steam iron", 10);
        assert_eq!(outcome.filters.categories, vec!["tea"]);
        assert_eq!(ids(&outcome.results), vec![0]);
        Ok(())
    }

    #[test]
    fn test_results_bounded_and_sorted() -> Result<()> {
        let products: Vec<Product> = (0..40)
            .map(|i| {
                Product::new(format!("Cotton Shirt Model{i}"))
                    .with_brand(format!("Maker{}", i % 3))
                    .with_rating((i % 5) as f64)
            })
            .collect();
        let engine = engine(products)?;

        for top_n in [1, 3, 10, 25] {
            let results = engine.search("cotton shirt", top_n);
            assert!(results.len() <= top_n);
            assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        }
        Ok(())
    }

    #[test]
    fn test_brand_mention_scores_as_a_term() -> Result<()> {
        let engine = engine(audio_catalog())?;
        let outcome = engine.execute("sony headphones", 10);

        assert_eq!(outcome.filters.brands, vec!["sony"]);
        assert_eq!(outcome.clean_query, "headphones");
        let brand = &engine.product(outcome.results[0].doc_id).unwrap().brand;
        assert_eq!(brand, "Sony");
        Ok(())
    }

    #[test]
    fn test_deterministic_across_builds() -> Result<()> {
        let a = engine(audio_catalog())?;
        let b = engine(audio_catalog())?;

        for query in ["wireless headphones", "noise", "headphones under 5000"] {
            assert_eq!(a.search(query, 10), b.search(query, 10));
        }
        Ok(())
    }

    #[test]
    fn test_internal_fault_yields_empty_result() -> Result<()> {
        let mut engine = engine(audio_catalog())?;
        engine.products.truncate(1);

        assert!(engine.search("headphones", 10).is_empty());
        Ok(())
    }

    #[test]
    fn test_trending_orders_by_rating() -> Result<()> {
        let engine = engine(vec![
            Product::new("Mug").with_rating(3.5),
            Product::new("Lace Bra").with_rating(5.0),
            Product::new("Lamp"),
            Product::new("Desk").with_rating(4.8),
        ])?;

        assert_eq!(engine.trending(10), vec![3, 0, 2]);
        assert_eq!(engine.trending(1), vec![3]);
        Ok(())
    }

    #[test]
    fn test_stats() -> Result<()> {
        let engine = engine(audio_catalog())?;
        let stats = engine.stats();

        assert_eq!(stats.total_products, 5);
        assert_eq!(stats.brands, 3);
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.avg_rating, None);
        assert_eq!(stats.index.total_documents, 5);
        Ok(())
    }

    #[test]
    fn test_stats_count_full_category_trees() -> Result<()> {
        let engine = engine(vec![
            Product::new("Runner").with_categories(["Men", "Shoes"]),
            Product::new("Flat").with_categories(["Women", "Shoes"]),
            Product::new("Loafer").with_categories(["men", "shoes"]),
            Product::new("Gift Card"),
        ])?;

        assert_eq!(engine.stats().categories, 2);
        Ok(())
    }
}
