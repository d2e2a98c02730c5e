//! Turns a free-text shopping query into search text plus structured filters.
//!
//! Stages run in a fixed order and each one cuts its matches out of the
//! working query, so an earlier stage wins over any later pattern it overlaps:
//! quoted phrases, price range, single price bounds, brands, categories and
//! finally `-term` exclusions.

use crate::document::Product;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeSet;

const NUMBER: &str = r"\d+(?:,\d{3})*(?:\.\d{1,2})?";

lazy_static::lazy_static! {
    static ref MUST_INCLUDE: Regex = Regex::new(r#""([^"]+)""#).expect("valid regex");
    static ref PRICE_RANGE: Regex = Regex::new(&format!(
        r"(?i)({NUMBER})\s*(?:to|-|and)\s*({NUMBER})"
    ))
    .expect("valid regex");
    static ref PRICE_BOUND: Regex = Regex::new(&format!(
        r"(?i)(\b(?:under|below|less\s*than|above|over|more\s*than|rs|inr)\b|₹)\s*({NUMBER})"
    ))
    .expect("valid regex");
}

/// Marker that turns a query word into an exclusion.
const EXCLUDE_MARKER: char = '-';

/// Structured filters pulled out of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryFilters {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub brands: Vec<String>,
    pub categories: Vec<String>,
    pub must_include: Vec<String>,
    pub exclude: Vec<String>,
}

impl QueryFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedQuery {
    pub original: String,
    /// Query text with every recognized filter removed, lowercase and
    /// whitespace-normalized.
    pub clean: String,
    pub filters: QueryFilters,
}

/// Filter extractor seeded with the catalog's brand and category vocabulary.
#[derive(Debug, Clone, Default)]
pub struct QueryExtractor {
    known_brands: Vec<String>,
    known_categories: Vec<String>,
}

impl QueryExtractor {
    pub fn new<B, C>(known_brands: B, known_categories: C) -> Self
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            known_brands: vocabulary(known_brands),
            known_categories: vocabulary(known_categories),
        }
    }

    /// Vocabulary taken from distinct brand values and category segments.
    pub fn from_products(products: &[Product]) -> Self {
        Self::new(
            products.iter().map(|p| p.brand.as_str()),
            products
                .iter()
                .flat_map(|p| p.categories.iter().map(String::as_str)),
        )
    }

    pub fn known_brands(&self) -> &[String] {
        &self.known_brands
    }

    pub fn known_categories(&self) -> &[String] {
        &self.known_categories
    }

    pub fn extract(&self, raw_query: &str) -> ExtractedQuery {
        let mut filters = QueryFilters::default();
        let working = raw_query.to_lowercase();

        let (must_include, working) = extract_must_include(&working);
        filters.must_include = must_include;

        let working = extract_price_range(&working, &mut filters);
        let working = extract_price_bounds(&working, &mut filters);

        let (brands, working) = extract_known(&working, &self.known_brands);
        filters.brands = brands;

        let (categories, working) = extract_known(&working, &self.known_categories);
        filters.categories = categories;

        let (exclude, clean) = extract_exclude(&working);
        filters.exclude = exclude;

        ExtractedQuery {
            original: raw_query.to_string(),
            clean,
            filters,
        }
    }
}

/// Case-folded, distinct, non-empty; longest first so a longer name is cut
/// out before a shorter name it contains.
fn vocabulary<I>(values: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let distinct: BTreeSet<String> = values
        .into_iter()
        .map(|v| v.as_ref().trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();

    let mut terms: Vec<String> = distinct.into_iter().collect();
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    terms
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn extract_must_include(query: &str) -> (Vec<String>, String) {
    let mut phrases = Vec::new();
    for caps in MUST_INCLUDE.captures_iter(query) {
        let phrase = caps[1].trim().to_lowercase();
        if !phrase.is_empty() {
            push_unique(&mut phrases, phrase);
        }
    }
    let remaining = MUST_INCLUDE.replace_all(query, " ").into_owned();
    (phrases, remaining)
}

/// First `A to B` range only; bounds are kept in the order written.
fn extract_price_range(query: &str, filters: &mut QueryFilters) -> String {
    let Some(caps) = PRICE_RANGE.captures(query) else {
        return query.to_string();
    };

    if let (Some(low), Some(high)) = (parse_number(&caps[1]), parse_number(&caps[2])) {
        filters.min_price = Some(low);
        filters.max_price = Some(high);
    }

    PRICE_RANGE.replace(query, " ").into_owned()
}

fn extract_price_bounds(query: &str, filters: &mut QueryFilters) -> String {
    PRICE_BOUND
        .replace_all(query, |caps: &Captures| {
            if let Some(price) = parse_number(&caps[2]) {
                let qualifier = caps[1].to_lowercase();
                if ["under", "below", "less"].iter().any(|q| qualifier.starts_with(q)) {
                    filters.max_price = Some(price);
                } else if ["above", "over", "more"].iter().any(|q| qualifier.starts_with(q)) {
                    filters.min_price = Some(price);
                } else {
                    filters.min_price = Some(price * 0.9);
                    filters.max_price = Some(price * 1.1);
                }
            }
            " ".to_string()
        })
        .into_owned()
}

/// Cut every known term that occurs in the (already lowercase) query.
fn extract_known(query: &str, known: &[String]) -> (Vec<String>, String) {
    let mut found = Vec::new();
    let mut remaining = query.to_string();

    for term in known {
        if remaining.contains(term.as_str()) {
            push_unique(&mut found, term.clone());
            remaining = remaining.replace(term.as_str(), " ");
        }
    }

    (found, remaining)
}

fn extract_exclude(query: &str) -> (Vec<String>, String) {
    let mut exclude = Vec::new();
    let mut kept = Vec::new();

    for word in query.split_whitespace() {
        match word.strip_prefix(EXCLUDE_MARKER) {
            Some(term) if !term.is_empty() => push_unique(&mut exclude, term.to_lowercase()),
            _ => kept.push(word),
        }
    }

    (exclude, kept.join(" "))
}
