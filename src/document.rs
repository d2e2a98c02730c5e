use serde::{Deserialize, Serialize};

/// Position of a product in the indexed catalog. Ids run `0..N` in catalog order.
pub type DocId = usize;

/// A catalog product, normalized at ingestion.
///
/// Every optional field is typed: an unknown price or rating is `None`, never
/// a sentinel string, so the scoring code has no ad hoc fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stable external identifier from the source catalog, if it has one.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    /// Category path, most general first.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub discounted_price: Option<f64>,
    #[serde(default)]
    pub retail_price: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.discounted_price = Some(price);
        self
    }

    pub fn with_retail_price(mut self, price: f64) -> Self {
        self.retail_price = Some(price);
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Get the full searchable text (name + brand + categories + description)
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.name,
            self.brand,
            self.category_text(),
            self.description
        )
    }

    /// Category path flattened with single spaces.
    pub fn category_text(&self) -> String {
        self.categories.join(" ")
    }

    /// Price used by filters; an unknown price never passes a ceiling.
    pub fn effective_price(&self) -> f64 {
        self.discounted_price.unwrap_or(f64::INFINITY)
    }

    /// Percentage off the retail price, when both prices are known and the
    /// product is actually discounted.
    pub fn discount_percentage(&self) -> Option<f64> {
        match (self.retail_price, self.discounted_price) {
            (Some(retail), Some(discounted)) if retail > 0.0 && retail > discounted => {
                Some((retail - discounted) / retail * 100.0)
            }
            _ => None,
        }
    }

    /// Identity used to collapse listings of the same item.
    pub fn dedup_key(&self) -> (String, String) {
        (
            self.name.trim().to_lowercase(),
            self.brand.trim().to_lowercase(),
        )
    }
}

/// Parse a price such as `"1299"`, `"1,299.50"` or `"₹1,299"`.
///
/// Anything that does not leave a finite, non-negative number is `None`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('₹')
        .trim_start_matches("Rs.")
        .trim_start_matches("Rs")
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p >= 0.0)
}

/// Parse a rating on the 0–5 scale. Values above 5 are capped.
pub fn parse_rating(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite() && *r >= 0.0)
        .map(|r| r.min(5.0))
}
