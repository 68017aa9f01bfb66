//! HTTP surface: `GET /api/reviews?product=<name>&source=amazon|flipkart|both`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::ApiError;
use crate::models::{ReviewReport, SourceSelector};
use crate::review_finder::ReviewFinder;

#[derive(Clone)]
pub struct AppState {
    finder: Arc<ReviewFinder>,
}

pub fn router(finder: Arc<ReviewFinder>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/reviews", get(get_reviews))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { finder })
}

#[derive(Debug, Deserialize)]
struct ReviewQuery {
    product: Option<String>,
    source: Option<String>,
}

impl ReviewQuery {
    fn validate(&self) -> Result<(String, SourceSelector), ApiError> {
        let product = self.product.as_deref().unwrap_or_default().trim();
        if product.is_empty() {
            return Err(ApiError::MissingProduct);
        }

        let source = self
            .source
            .as_deref()
            .unwrap_or("both")
            .trim()
            .to_lowercase();
        let selector = source
            .parse::<SourceSelector>()
            .map_err(|_| ApiError::InvalidSource)?;

        Ok((product.to_string(), selector))
    }
}

async fn get_reviews(
    State(state): State<AppState>,
    query: Result<Query<ReviewQuery>, QueryRejection>,
) -> Result<Json<ReviewReport>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidQuery(e.body_text()))?;
    let (product, selector) = query.validate()?;
    Ok(Json(state.finder.analyze(&product, selector).await))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!("rejected review request: {}", self);
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}
