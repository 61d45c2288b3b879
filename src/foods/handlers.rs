use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, instrument};

use crate::meals::model::Food;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/foods/search", get(search_foods))
        .route("/foods/barcode/:code", get(food_by_barcode))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[instrument(skip(state))]
async fn search_foods(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Food>>, (StatusCode, String)> {
    let foods = state.foods.search(&params.q).await.map_err(|e| {
        error!(error = %e, "food search failed");
        (
            StatusCode::BAD_GATEWAY,
            "food database unavailable".to_string(),
        )
    })?;
    Ok(Json(foods))
}

#[instrument(skip(state))]
async fn food_by_barcode(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Food>, (StatusCode, String)> {
    let food = state.foods.by_barcode(&code).await.map_err(|e| {
        error!(error = %e, %code, "barcode lookup failed");
        (
            StatusCode::BAD_GATEWAY,
            "food database unavailable".to_string(),
        )
    })?;
    match food {
        Some(food) => Ok(Json(food)),
        None => Err((StatusCode::NOT_FOUND, "Product not found".to_string())),
    }
}
