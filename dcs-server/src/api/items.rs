//! Data item deposit and browsing

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use dcs_common::model::{Collection, DataItem};
use serde::Serialize;
use uuid::Uuid;

use super::extract::ApiPath;
use super::session::Session;
use crate::pagination::{calculate_pagination, PageQuery, Pagination, PAGE_SIZE};
use crate::services::authorization;
use crate::services::deposit::{self, DepositReceipt, DepositRequest};
use crate::{db, ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ItemPage {
    pub collection_id: Uuid,
    #[serde(flatten)]
    pub pagination: Pagination,
    pub page_size: i64,
    pub items: Vec<DataItem>,
}

#[derive(Debug, Serialize)]
pub struct DepositedItem {
    pub item: DataItem,
    pub deposit: DepositReceipt,
}

/// GET /api/collections/:id/items?page=N (public)
pub async fn list_items(
    State(state): State<AppState>,
    ApiPath(collection_id): ApiPath<Uuid>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ItemPage>> {
    authorization::load_collection(&state.db, collection_id).await?;

    let total = db::items::count_items(&state.db, collection_id).await?;
    let pagination = calculate_pagination(total, query.page);
    let items =
        db::items::list_items(&state.db, collection_id, PAGE_SIZE, pagination.offset).await?;

    Ok(Json(ItemPage {
        collection_id,
        pagination,
        page_size: PAGE_SIZE,
        items,
    }))
}

/// POST /api/collections/:id/items
///
/// 202 Accepted with the item and its deposit id; archiving happens in the
/// background. 401 anonymous, 403 not a depositor, 404 unknown collection,
/// 400 no files or quota exceeded.
pub async fn deposit_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    ApiPath(collection_id): ApiPath<Uuid>,
    payload: Result<Json<DepositRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DepositedItem>)> {
    let person = session.require()?;
    let Json(request) = payload?;
    let (item, record) =
        deposit::deposit_item(&state.db, &state.staging_dir, person, collection_id, &request)
            .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DepositedItem {
            item,
            deposit: DepositReceipt::from(&record),
        }),
    ))
}

/// GET /api/items/:id (public)
pub async fn view_item(
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<Uuid>,
) -> ApiResult<Json<DataItem>> {
    db::items::load_item(&state.db, item_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Data item not found: {}", item_id)))
}

/// GET /api/depositable-collections
pub async fn depositable_collections(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<Vec<Collection>>> {
    let person = session.require()?;
    Ok(Json(
        authorization::depositable_collections(&state.db, person).await?,
    ))
}

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/collections/:id/items",
            get(list_items).post(deposit_item),
        )
        .route("/api/items/:id", get(view_item))
        .route("/api/depositable-collections", get(depositable_collections))
}
