use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::dispatcher::{Dispatcher, UpdateMode};
use crate::entity::Record;
use crate::error::Error;
use crate::services::{Credentials, Registered, TokenResponse};

type Shared<T> = State<Arc<Dispatcher<T>>>;

/// `?include_deleted=true` lists soft-deleted rows too; any other value,
/// or none, lists live rows only.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_deleted: Option<String>,
}

impl ListQuery {
    pub fn include_deleted(&self) -> bool {
        self.include_deleted.as_deref() == Some("true")
    }
}

/// Decode a request body, reporting malformed JSON as a 400 with the usual
/// error body.
fn parse_body<B: serde::de::DeserializeOwned>(body: &Bytes) -> Result<B, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| Error::InvalidInput(format!("invalid JSON body: {}", e)).into())
}

/// Routes for one record type, relative to its collection path.
///
/// `with_create` adds `POST /`; users are created through registration.
pub fn crud_routes<T: Record>(dispatcher: Arc<Dispatcher<T>>, with_create: bool) -> Router {
    let collection = if with_create {
        get(list::<T>).post(create::<T>)
    } else {
        get(list::<T>)
    };

    Router::new()
        .route("/", collection)
        .route(
            "/{id}",
            get(get_one::<T>)
                .put(replace::<T>)
                .patch(patch::<T>)
                .delete(remove::<T>),
        )
        .route("/{id}/restore", post(restore::<T>))
        .with_state(dispatcher)
}

#[tracing::instrument(skip_all, fields(table = T::table_name()))]
async fn create<T: Record>(
    State(dispatcher): Shared<T>,
    body: Bytes,
) -> Result<(StatusCode, Json<T>), ApiError> {
    let created = dispatcher.create(parse_body(&body)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[tracing::instrument(skip_all, fields(table = T::table_name(), id = %id))]
async fn get_one<T: Record>(
    State(dispatcher): Shared<T>,
    Path(id): Path<String>,
) -> Result<Json<T>, ApiError> {
    Ok(Json(dispatcher.get(&id).await?))
}

#[tracing::instrument(skip_all, fields(table = T::table_name(), include_deleted = query.include_deleted()))]
async fn list<T: Record>(
    State(dispatcher): Shared<T>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<T>>, ApiError> {
    Ok(Json(dispatcher.list(query.include_deleted()).await?))
}

#[tracing::instrument(skip_all, fields(table = T::table_name(), id = %id))]
async fn replace<T: Record>(
    State(dispatcher): Shared<T>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<T>, ApiError> {
    let updated = dispatcher
        .update(&id, parse_body(&body)?, UpdateMode::Full)
        .await?;
    Ok(Json(updated))
}

#[tracing::instrument(skip_all, fields(table = T::table_name(), id = %id))]
async fn patch<T: Record>(
    State(dispatcher): Shared<T>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<T>, ApiError> {
    let updated = dispatcher
        .update(&id, parse_body(&body)?, UpdateMode::Partial)
        .await?;
    Ok(Json(updated))
}

#[tracing::instrument(skip_all, fields(table = T::table_name(), id = %id))]
async fn remove<T: Record>(
    State(dispatcher): Shared<T>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    dispatcher.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip_all, fields(table = T::table_name(), id = %id))]
async fn restore<T: Record>(
    State(dispatcher): Shared<T>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    dispatcher.restore(&id).await?;
    Ok(StatusCode::OK)
}

#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Registered>), ApiError> {
    let registered = state.users.register(parse_body(&body)?).await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ApiError> {
    let credentials: Credentials = parse_body(&body)?;
    Ok(Json(state.users.login(&credentials).await?))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let cache = state.products.cache().health_check().await;
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "cache": cache,
    }))
}

pub async fn metrics(State(state): State<AppState>) -> String {
    state.prometheus.render()
}
