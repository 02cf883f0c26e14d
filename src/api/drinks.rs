//! Handlers for the drink menu routes.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::{authorize, Permission};
use crate::store::{Drink, DrinkPatch, DrinkStore, Ingredient, NewDrink, StoreError};

use super::{ApiError, AppState};

// ── Request types ─────────────────────────────────────────────────────────────

/// A recipe may be posted as a single ingredient or as a list.
#[derive(Deserialize)]
#[serde(untagged)]
pub(super) enum RecipeInput {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl From<RecipeInput> for Vec<Ingredient> {
    fn from(r: RecipeInput) -> Self {
        match r {
            RecipeInput::Many(v) => v,
            RecipeInput::One(i) => vec![i],
        }
    }
}

#[derive(Deserialize)]
pub(super) struct DrinkBody {
    title: Option<String>,
    recipe: Option<RecipeInput>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Run a store call off the async executor.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&DrinkStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
        .map_err(ApiError::from)
}

fn body_or_422(body: Result<Json<DrinkBody>, JsonRejection>) -> Result<DrinkBody, ApiError> {
    body.map(|Json(b)| b)
        .map_err(|e| ApiError::Unprocessable(e.body_text()))
}

/// Non-numeric ids never match a drink route, whoever is asking.
fn id_or_404(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    id.map(|Path(id)| id).map_err(|_| ApiError::NotFound)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /drinks: public menu, short representation.
pub(super) async fn list_short(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let drinks = with_store(&state, |s| s.list()).await?;
    if drinks.is_empty() {
        return Err(ApiError::NotFound);
    }
    let drinks: Vec<_> = drinks.iter().map(Drink::short).collect();
    Ok(Json(json!({ "success": true, "drinks": drinks })))
}

/// GET /drinks-detail: requires `get:drinks-detail`.
pub(super) async fn list_long(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    authorize(state.verifier.as_ref(), &headers, Permission::GetDrinksDetail).await?;

    let drinks = with_store(&state, |s| s.list()).await?;
    if drinks.is_empty() {
        return Err(ApiError::NotFound);
    }
    let drinks: Vec<_> = drinks.iter().map(Drink::long).collect();
    Ok(Json(json!({ "success": true, "drinks": drinks })))
}

/// POST /drinks: requires `post:drinks`.
pub(super) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<DrinkBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let claims = authorize(state.verifier.as_ref(), &headers, Permission::PostDrinks).await?;
    let body = body_or_422(body)?;

    let new = NewDrink {
        title: body.title.unwrap_or_default(),
        recipe: body.recipe.map(Vec::from).unwrap_or_default(),
    };
    let drink = with_store(&state, move |s| s.insert(new)).await?;
    info!(id = drink.id, title = %drink.title, sub = %claims.sub, "drink created");

    Ok(Json(json!({ "success": true, "drinks": [drink.long()] })))
}

/// PATCH /drinks/{id}: requires `patch:drinks`.
pub(super) async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<DrinkBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = id_or_404(id)?;
    let claims = authorize(state.verifier.as_ref(), &headers, Permission::PatchDrinks).await?;
    let body = body_or_422(body)?;

    let patch = DrinkPatch {
        title: body.title,
        recipe: body.recipe.map(Vec::from),
    };
    let drink = with_store(&state, move |s| s.update(id, patch))
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(id, sub = %claims.sub, "drink updated");

    Ok(Json(json!({ "success": true, "drinks": [drink.long()] })))
}

/// DELETE /drinks/{id}: requires `delete:drinks`.
pub(super) async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = id_or_404(id)?;
    let claims = authorize(state.verifier.as_ref(), &headers, Permission::DeleteDrinks).await?;

    if !with_store(&state, move |s| s.delete(id)).await? {
        return Err(ApiError::NotFound);
    }
    info!(id, sub = %claims.sub, "drink deleted");

    Ok(Json(json!({ "success": true, "deleted": id })))
}
