//! Bill listing and detail

use axum::{
    extract::{Path, Query, State},
    Json,
};
use okn_common::db::bills::{count_filtered, filter_and_order, joiner_ids, load_bill, proposer_ids, Bill};
use okn_common::db::knessets::load_knesset;
use okn_common::time;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::listing::{BillListingQuery, BillSelection};
use crate::pagination::{calculate_pagination, PageQuery, Pagination};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BillListing {
    pub pagination: Pagination,
    pub bills: Vec<Bill>,
}

/// GET /api/bills
pub async fn list_bills(
    State(state): State<AppState>,
    Query(query): Query<BillListingQuery>,
) -> ApiResult<Json<BillListing>> {
    let knesset = match query.knesset_number() {
        Some(number) => load_knesset(&state.db, number).await?,
        None => None,
    };
    let requested = PageQuery { page: query.page.clone() }.requested();

    let filter = match query.selection(knesset.as_ref(), state.bill_strategy(), time::today()) {
        BillSelection::Filter(filter) => filter,
        BillSelection::Empty => {
            return Ok(Json(BillListing {
                pagination: calculate_pagination(0, requested),
                bills: Vec::new(),
            }))
        }
    };

    let total = count_filtered(&state.db, &filter).await?;
    let pagination = calculate_pagination(total, requested);
    let bills = filter_and_order(&state.db, &filter, pagination.limit(), pagination.offset).await?;

    Ok(Json(BillListing { pagination, bills }))
}

#[derive(Debug, Serialize)]
pub struct BillDetail {
    #[serde(flatten)]
    pub bill: Bill,
    pub proposers: Vec<i64>,
    /// Members who joined after the bill was proposed
    pub joiners: Vec<i64>,
}

/// GET /api/bills/{id}
pub async fn bill_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BillDetail>> {
    let bill = load_bill(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("bill {} not found", id)))?;

    Ok(Json(BillDetail {
        proposers: proposer_ids(&state.db, id).await?,
        joiners: joiner_ids(&state.db, id).await?,
        bill,
    }))
}
