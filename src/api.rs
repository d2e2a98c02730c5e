use crate::config::DEFAULT_TOP_N;
use crate::document::{DocId, Product};
use crate::engine::{EngineStats, SearchEngine};
use crate::query::QueryFilters;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// ========== Request/Response Types ==========

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingRequest {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub clean_query: String,
    pub filters: QueryFilters,
    pub total: usize,
    pub products: Vec<ProductResponse>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub doc_id: DocId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub name: String,
    pub brand: String,
    /// Most specific category segment, lowercase.
    pub category: String,
    pub categories: Vec<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retail_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl ProductResponse {
    fn new(doc_id: DocId, product: &Product, score: Option<f64>) -> Self {
        Self {
            doc_id,
            external_id: product.id.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product
                .categories
                .last()
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|| "general".to_string()),
            categories: product.categories.clone(),
            description: product.description.clone(),
            price: product.discounted_price,
            retail_price: product.retail_price,
            discount: product
                .discount_percentage()
                .map(|pct| format!("{:.0}% OFF", pct)),
            rating: product.rating,
            score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub products: usize,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn error_msg(message: String) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

// ========== Error Handling ==========

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = format!("{:#}", self.0);
        tracing::error!("API error: {}", message);

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error_msg(message)),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error_msg(message.to_string())),
    )
        .into_response()
}

// ========== Handlers ==========

async fn health_check(State(engine): State<Arc<SearchEngine>>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy",
        products: engine.products().len(),
    }))
}

async fn search_products(
    State(engine): State<Arc<SearchEngine>>,
    Json(req): Json<SearchRequest>,
) -> Result<Response, AppError> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Ok(bad_request("query must not be empty"));
    }

    let limit = req.limit.unwrap_or(DEFAULT_TOP_N);
    if limit == 0 {
        return Ok(bad_request("limit must be at least 1"));
    }

    // Scoring is CPU bound; keep it off the async workers.
    let outcome = {
        let engine = Arc::clone(&engine);
        let query = query.clone();
        tokio::task::spawn_blocking(move || engine.execute(&query, limit)).await?
    };

    let products: Vec<ProductResponse> = outcome
        .results
        .iter()
        .filter_map(|r| {
            engine
                .product(r.doc_id)
                .map(|p| ProductResponse::new(r.doc_id, p, Some(r.score)))
        })
        .collect();

    tracing::info!(query = %query, results = products.len(), "search served");

    let response = SearchResponse {
        query,
        clean_query: outcome.clean_query,
        filters: outcome.filters,
        total: products.len(),
        products,
    };

    Ok(Json(ApiResponse::success(response)).into_response())
}

async fn get_product(
    State(engine): State<Arc<SearchEngine>>,
    Path(id): Path<DocId>,
) -> impl IntoResponse {
    match engine.product(id) {
        Some(product) => Json(ApiResponse::success(ProductResponse::new(id, product, None))),
        None => Json(ApiResponse::error_msg(format!(
            "Product with id '{}' not found",
            id
        ))),
    }
}

async fn trending_products(
    State(engine): State<Arc<SearchEngine>>,
    Query(req): Query<TrendingRequest>,
) -> impl IntoResponse {
    let products: Vec<ProductResponse> = engine
        .trending(req.limit.unwrap_or(DEFAULT_TOP_N))
        .into_iter()
        .filter_map(|id| engine.product(id).map(|p| ProductResponse::new(id, p, None)))
        .collect();

    Json(ApiResponse::success(products))
}

async fn get_stats(State(engine): State<Arc<SearchEngine>>) -> Json<ApiResponse<EngineStats>> {
    Json(ApiResponse::success(engine.stats()))
}

// ========== Router ==========

pub fn create_router(engine: Arc<SearchEngine>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/search", post(search_products))
        .route("/products/:id", get(get_product))
        .route("/trending", get(trending_products))
        .route("/stats", get(get_stats))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let engine = SearchEngine::build(
            vec![
                Product::new("Wireless Headphones")
                    .with_brand("Sony")
                    .with_categories(["Electronics", "Headphones"])
                    .with_price(1500.0)
                    .with_retail_price(3000.0)
                    .with_rating(4.5),
                Product::new("Wireless Mouse")
                    .with_brand("Logitech")
                    .with_categories(["Electronics", "Accessories"])
                    .with_price(700.0),
                Product::new("Studio Headphones")
                    .with_brand("Audio-Technica")
                    .with_categories(["Electronics", "Headphones"])
                    .with_price(9000.0),
            ],
            EngineConfig::default(),
        )
        .unwrap();
        create_router(Arc::new(engine))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_search(body: &str) -> Request<Body> {
        Request::post("/search")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn search_returns_filtered_products() {
        let (status, json) = send(
            app(),
            post_search(r#"{"query": "wireless headphones under 2000", "limit": 5}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = &json["data"];
        assert_eq!(data["filters"]["max_price"], 2000.0);
        // "headphones" is a catalog category, so it moves into the filters
        assert_eq!(data["clean_query"], "wireless");
        assert_eq!(data["filters"]["categories"][0], "headphones");
        assert_eq!(data["total"], 2);
        let product = &data["products"][0];
        assert_eq!(product["name"], "Wireless Headphones");
        assert_eq!(product["category"], "headphones");
        assert_eq!(product["discount"], "50% OFF");
        assert!(product["score"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn search_rejects_empty_query_and_zero_limit() {
        let (status, json) = send(app(), post_search(r#"{"query": "  "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (status, _) = send(app(), post_search(r#"{"query": "mouse", "limit": 0}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn product_lookup_and_trending() {
        let req = Request::get("/products/1").body(Body::empty()).unwrap();
        let (status, json) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Wireless Mouse");
        assert_eq!(json["data"]["category"], "accessories");

        let req = Request::get("/products/42").body(Body::empty()).unwrap();
        let (_, json) = send(app(), req).await;
        assert_eq!(json["success"], false);

        let req = Request::get("/trending?limit=1").body(Body::empty()).unwrap();
        let (_, json) = send(app(), req).await;
        assert_eq!(json["data"][0]["name"], "Wireless Headphones");
    }

    #[tokio::test]
    async fn health_and_stats() {
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (_, json) = send(app(), req).await;
        assert_eq!(json["data"]["products"], 3);

        let req = Request::get("/stats").body(Body::empty()).unwrap();
        let (_, json) = send(app(), req).await;
        assert_eq!(json["data"]["total_products"], 3);
        assert_eq!(json["data"]["brands"], 3);
    }
}
