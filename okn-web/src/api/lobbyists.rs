//! Lobbyist listing

use axum::{
    extract::{Query, State},
    Json,
};
use okn_common::db::lobbyists::{count_lobbyists, list_lobbyists as load_lobbyists, LobbyistSummary};
use serde::Serialize;

use crate::error::ApiResult;
use crate::pagination::{calculate_pagination, PageQuery, Pagination};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LobbyistListing {
    pub pagination: Pagination,
    pub lobbyists: Vec<LobbyistSummary>,
}

/// GET /api/lobbyists
///
/// Most mentioned in committee meetings first.
pub async fn list_lobbyists(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<LobbyistListing>> {
    let total = count_lobbyists(&state.db).await?;
    let pagination = calculate_pagination(total, page.requested());
    let lobbyists = load_lobbyists(&state.db, pagination.limit(), pagination.offset).await?;

    Ok(Json(LobbyistListing { pagination, lobbyists }))
}
