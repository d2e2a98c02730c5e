//! Catalog loading: raw export rows in, normalized [`Product`]s out.
//!
//! Exports are either a JSON array of objects or a CSV file with a header
//! row, both using the marketplace's column names. Prices and ratings may
//! arrive as numbers or as display strings such as `"₹1,299"` or
//! `"No rating available"`; anything unparsable becomes `None`.

use crate::document::{parse_price, parse_rating, Product};
use crate::error::{Result, SearchError};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Separator between levels of a category tree string.
const CATEGORY_SEPARATOR: &str = ">>";

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    fn price(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) if n.is_finite() && *n >= 0.0 => Some(*n),
            RawValue::Number(_) => None,
            RawValue::Text(s) => parse_price(s),
        }
    }

    fn rating(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => parse_rating(&n.to_string()),
            RawValue::Text(s) => parse_rating(s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCategories {
    Path(Vec<String>),
    Tree(String),
}

impl RawCategories {
    fn into_path(self) -> Vec<String> {
        let segments = match self {
            RawCategories::Path(path) => path,
            RawCategories::Tree(tree) => split_category_tree(&tree),
        };
        segments
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// One row of a catalog export, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProduct {
    #[serde(default, alias = "uniq_id")]
    pub id: Option<String>,
    #[serde(default, alias = "product_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default, alias = "product_category_tree", alias = "category_hierarchy")]
    pub categories: Option<RawCategories>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub discounted_price: Option<RawValue>,
    #[serde(default)]
    pub retail_price: Option<RawValue>,
    #[serde(default, alias = "product_rating")]
    pub rating: Option<RawValue>,
}

impl RawProduct {
    /// Fill defaults for anything missing or malformed.
    pub fn normalize(self) -> Product {
        Product {
            id: self.id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            name: self.name.unwrap_or_default().trim().to_string(),
            brand: self.brand.unwrap_or_default().trim().to_string(),
            categories: self
                .categories
                .map(RawCategories::into_path)
                .unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            discounted_price: self.discounted_price.as_ref().and_then(RawValue::price),
            retail_price: self.retail_price.as_ref().and_then(RawValue::price),
            rating: self.rating.as_ref().and_then(RawValue::rating),
        }
    }
}

/// Split `"A >> B >> C"`, also accepting the `["A >> B"]` form some exports
/// wrap the tree in.
pub fn split_category_tree(tree: &str) -> Vec<String> {
    tree.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .trim_matches('"')
        .split(CATEGORY_SEPARATOR)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// On-disk layout of a catalog export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Csv,
}

impl CatalogFormat {
    /// Pick the format from the file name, looking through a trailing `.gz`.
    /// Anything that is not `.csv` is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let name = name.strip_suffix(".gz").unwrap_or(&name);

        if name.ends_with(".csv") {
            CatalogFormat::Csv
        } else {
            CatalogFormat::Json
        }
    }
}

/// Parse and normalize a catalog from any JSON reader.
pub fn read_catalog<R: Read>(reader: R) -> Result<Vec<Product>> {
    let raw: Vec<RawProduct> = serde_json::from_reader(reader)?;
    normalize_rows(raw)
}

/// Parse and normalize a CSV catalog. Columns are matched by header name and
/// unknown columns are ignored; rows that fail to parse are skipped.
pub fn read_csv_catalog<R: Read>(reader: R) -> Result<Vec<Product>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    reader.headers()?;

    let mut raw = Vec::new();
    let mut skipped = 0usize;
    for row in reader.deserialize::<RawProduct>() {
        match row {
            Ok(row) => raw.push(row),
            Err(err) => {
                skipped += 1;
                debug!(error = %err, "unreadable catalog row");
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "catalog rows skipped");
    }

    normalize_rows(raw)
}

fn normalize_rows(raw: Vec<RawProduct>) -> Result<Vec<Product>> {
    if raw.is_empty() {
        return Err(SearchError::EmptyCatalog);
    }

    let products: Vec<Product> = raw.into_iter().map(RawProduct::normalize).collect();

    let unnamed = products.iter().filter(|p| p.name.is_empty()).count();
    if unnamed > 0 {
        warn!(unnamed, "catalog rows without a product name");
    }
    let unpriced = products
        .iter()
        .filter(|p| p.discounted_price.is_none())
        .count();
    if unpriced > 0 {
        warn!(unpriced, "catalog rows without a usable price");
    }

    Ok(products)
}

/// Load a catalog file. The format follows the extension (`.csv` or JSON)
/// and `.gz` files are decompressed on the fly.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Vec<Product>> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let reader: Box<dyn Read> = if path.extension().map_or(false, |ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let reader = BufReader::new(reader);

    let format = CatalogFormat::from_path(path);
    let products = match format {
        CatalogFormat::Json => read_catalog(reader)?,
        CatalogFormat::Csv => read_csv_catalog(reader)?,
    };

    info!(path = %path.display(), ?format, products = products.len(), "catalog loaded");
    Ok(products)
}
