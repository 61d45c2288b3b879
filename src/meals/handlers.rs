use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{error, instrument};

use crate::auth::extractors::UserScope;
use crate::error::StoreError;
use crate::state::AppState;

use super::aggregate::{goal_progress, local_day, today_calories};
use super::dto::{
    CreateMealRequest, CreatedMealResponse, GoalResponse, MealDetails, MealListItem,
    PutGoalRequest, TodaySummary,
};
use super::model::Meal;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/:id", get(get_meal))
        .route("/goal", get(get_goal))
        .route("/summary/today", get(today_summary))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal).put(update_meal))
        .route("/meals/:id", delete(delete_meal))
        .route("/goal", put(put_goal))
}

#[instrument(skip(state))]
async fn list_meals(
    State(state): State<AppState>,
    UserScope(user): UserScope,
) -> Result<Json<Vec<MealListItem>>, (StatusCode, String)> {
    let meals = state
        .meals
        .load_meals(user.as_deref())
        .await
        .map_err(store_error)?;
    Ok(Json(meals.iter().map(MealListItem::from_meal).collect()))
}

#[instrument(skip(state))]
async fn get_meal(
    State(state): State<AppState>,
    UserScope(user): UserScope,
    Path(id): Path<String>,
) -> Result<Json<MealDetails>, (StatusCode, String)> {
    let meals = state
        .meals
        .load_meals(user.as_deref())
        .await
        .map_err(store_error)?;
    let meal = meals
        .into_iter()
        .find(|meal| meal.id == id)
        .ok_or((StatusCode::NOT_FOUND, "Meal not found".to_string()))?;
    Ok(Json(MealDetails::from_meal(meal)))
}

#[instrument(skip(state, body))]
async fn create_meal(
    State(state): State<AppState>,
    UserScope(user): UserScope,
    Json(body): Json<CreateMealRequest>,
) -> Result<(StatusCode, HeaderMap, Json<CreatedMealResponse>), (StatusCode, String)> {
    if body.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name must be non-empty".into()));
    }

    let meal = Meal::new(body.name, body.foods);
    let id = meal.id.clone();
    let date = meal.date.clone();
    let meals = state
        .meals
        .add_meal(meal, user.as_deref())
        .await
        .map_err(store_error)?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/meals/{id}").parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(CreatedMealResponse {
            id,
            date,
            meals: meals.iter().map(MealListItem::from_meal).collect(),
        }),
    ))
}

#[instrument(skip(state, body))]
async fn update_meal(
    State(state): State<AppState>,
    UserScope(user): UserScope,
    Json(body): Json<Meal>,
) -> Result<Json<Vec<MealListItem>>, (StatusCode, String)> {
    let meals = state
        .meals
        .update_meal(body, user.as_deref())
        .await
        .map_err(store_error)?;
    Ok(Json(meals.iter().map(MealListItem::from_meal).collect()))
}

#[instrument(skip(state))]
async fn delete_meal(
    State(state): State<AppState>,
    UserScope(user): UserScope,
    Path(id): Path<String>,
) -> Result<Json<Vec<MealListItem>>, (StatusCode, String)> {
    let meals = state
        .meals
        .delete_meal(&id, user.as_deref())
        .await
        .map_err(store_error)?;
    Ok(Json(meals.iter().map(MealListItem::from_meal).collect()))
}

#[instrument(skip(state))]
async fn get_goal(
    State(state): State<AppState>,
    UserScope(user): UserScope,
) -> Result<Json<GoalResponse>, (StatusCode, String)> {
    let goal = state
        .meals
        .load_calorie_goal(state.config.default_calorie_goal, user.as_deref())
        .await
        .map_err(store_error)?;
    Ok(Json(GoalResponse { goal }))
}

#[instrument(skip(state, body))]
async fn put_goal(
    State(state): State<AppState>,
    UserScope(user): UserScope,
    Json(body): Json<PutGoalRequest>,
) -> Result<Json<GoalResponse>, (StatusCode, String)> {
    let goal = state
        .meals
        .save_calorie_goal(body.goal, user.as_deref())
        .await
        .map_err(store_error)?;
    Ok(Json(GoalResponse { goal }))
}

#[instrument(skip(state))]
async fn today_summary(
    State(state): State<AppState>,
    UserScope(user): UserScope,
) -> Result<Json<TodaySummary>, (StatusCode, String)> {
    let meals = state
        .meals
        .load_meals(user.as_deref())
        .await
        .map_err(store_error)?;
    let goal = state
        .meals
        .load_calorie_goal(state.config.default_calorie_goal, user.as_deref())
        .await
        .map_err(store_error)?;

    let calories = today_calories(&meals);
    Ok(Json(TodaySummary {
        date: local_day(),
        calories,
        goal,
        progress: goal_progress(calories, goal),
    }))
}

fn store_error(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::InvalidUser => (StatusCode::UNAUTHORIZED, e.to_string()),
        StoreError::Persistence(_) => {
            error!(error = %e, "meal store write failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
