//! Axum index endpoints backed by a [`QueryRegistry`].
//!
//! ```rust,ignore
//! let state = AppState::new(db, registry);
//! let app = Router::new().nest("/users", router::<user::Entity>(state.clone()));
//! // GET /users?filter[login]=andre,fred&sort=-id
//! // GET /users/filters
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::Value as JsonValue;

use crate::core::fields::resource_name;
use crate::errors::{ApiError, QueryError};
use crate::params::IndexParams;
use crate::registry::QueryRegistry;
use crate::resource::QueryDescription;

/// Shared state of the index routes.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub registry: Arc<QueryRegistry>,
}

impl AppState {
    #[must_use]
    pub fn new(db: DatabaseConnection, registry: QueryRegistry) -> Self {
        Self {
            db,
            registry: Arc::new(registry),
        }
    }
}

/// `GET <resource>`: every record matching the filter parameter, in the
/// requested (or default) order.
///
/// # Errors
///
/// 400 for invalid parameters, 500 for an unconfigured resource or a database
/// failure.
pub async fn index_handler<E>(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<JsonValue>>, ApiError>
where
    E: EntityTrait + Send + Sync,
{
    let params = IndexParams::from_pairs(pairs)?;
    let select = state
        .registry
        .handle_index_request::<E>(&params, E::find())?;
    let records = select.into_json().all(&state.db).await?;
    tracing::debug!(count = records.len(), "index request served");
    Ok(Json(records))
}

/// `GET <resource>/filters`: the fields, custom filters and default ordering
/// the index endpoint accepts.
///
/// # Errors
///
/// 500 when the resource has no query configuration.
pub async fn describe_handler<E>(
    State(state): State<AppState>,
) -> Result<Json<QueryDescription>, ApiError>
where
    E: EntityTrait + Send + Sync,
{
    let query = state
        .registry
        .get::<E>()
        .ok_or_else(|| QueryError::NotConfigured(resource_name::<E>()))?;
    Ok(Json(query.describe()))
}

/// Index (`/`) and description (`/filters`) routes for `E`, meant to be
/// nested under the resource path.
pub fn router<E>(state: AppState) -> Router
where
    E: EntityTrait + Send + Sync,
{
    Router::new()
        .route("/", get(index_handler::<E>))
        .route("/filters", get(describe_handler::<E>))
        .with_state(state)
}
