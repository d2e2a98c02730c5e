//! Per-candidate predicates applied between retrieval and re-scoring.

use crate::document::Product;
use crate::query::QueryFilters;

/// Drops products in sensitive categories, whatever the query.
#[derive(Debug, Clone)]
pub struct ContentBlocker {
    terms: Vec<String>,
}

impl ContentBlocker {
    pub fn new<I>(terms: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// True when any blocked term is a substring of the name, the brand or a
    /// single category segment.
    pub fn is_blocked(&self, product: &Product) -> bool {
        let name = product.name.to_lowercase();
        let brand = product.brand.to_lowercase();
        let categories: Vec<String> = product
            .categories
            .iter()
            .map(|c| c.to_lowercase())
            .collect();

        self.terms.iter().any(|term| {
            name.contains(term.as_str())
                || brand.contains(term.as_str())
                || categories.iter().any(|c| c.contains(term.as_str()))
        })
    }
}

/// Unknown prices count as infinite, so they fail any ceiling.
pub fn within_max_price(product: &Product, filters: &QueryFilters) -> bool {
    match filters.max_price {
        Some(max) => product.effective_price() <= max,
        None => true,
    }
}

/// Every quoted phrase must appear in the name or category path.
pub fn has_required_phrases(product: &Product, filters: &QueryFilters) -> bool {
    if filters.must_include.is_empty() {
        return true;
    }
    let text = format!("{} {}", product.name, product.category_text()).to_lowercase();
    filters
        .must_include
        .iter()
        .all(|phrase| text.contains(phrase.as_str()))
}

/// No excluded term may appear in the name or description.
pub fn free_of_excluded_terms(product: &Product, filters: &QueryFilters) -> bool {
    if filters.exclude.is_empty() {
        return true;
    }
    let text = format!("{} {}", product.name, product.description).to_lowercase();
    !filters
        .exclude
        .iter()
        .any(|term| text.contains(term.as_str()))
}

/// Query-dependent checks, in pipeline order.
pub fn passes_filters(product: &Product, filters: &QueryFilters) -> bool {
    within_max_price(product, filters)
        && has_required_phrases(product, filters)
        && free_of_excluded_terms(product, filters)
}
