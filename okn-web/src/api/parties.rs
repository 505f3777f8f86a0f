//! Party endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use okn_common::db::knessets::current_knesset;
use okn_common::db::members::{party_current_members, party_past_members, Member};
use okn_common::db::parties::{
    coalition_memberships, list_parties_for_knesset, load_party, party_lineage, party_seats, CoalitionMembership, Party,
    PartySeats,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PartySummary {
    #[serde(flatten)]
    pub party: Party,
    pub affiliation: &'static str,
}

/// GET /api/parties
///
/// Parties of the current knesset, largest first; empty before any knesset exists.
pub async fn list_parties(State(state): State<AppState>) -> ApiResult<Json<Vec<PartySummary>>> {
    let Some(knesset) = current_knesset(&state.db).await? else {
        return Ok(Json(Vec::new()));
    };

    let parties = list_parties_for_knesset(&state.db, knesset.number).await?;
    Ok(Json(
        parties
            .into_iter()
            .map(|party| PartySummary {
                affiliation: party.affiliation(),
                party,
            })
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct PartyDetail {
    #[serde(flatten)]
    pub party: Party,
    pub display_name: String,
    pub affiliation: &'static str,
    pub members: Vec<Member>,
    pub past_members: Vec<Member>,
    pub coalition_memberships: Vec<CoalitionMembership>,
    /// Parties this one split from, nearest first
    pub lineage: Vec<Party>,
    pub seats: Vec<PartySeats>,
}

/// GET /api/parties/{id}
pub async fn party_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PartyDetail>> {
    let party = load_party(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("party {} not found", id)))?;
    let current = current_knesset(&state.db).await?.map(|k| k.number);

    Ok(Json(PartyDetail {
        display_name: party.display_name(current),
        affiliation: party.affiliation(),
        members: party_current_members(&state.db, &party, current).await?,
        past_members: party_past_members(&state.db, id).await?,
        coalition_memberships: coalition_memberships(&state.db, id).await?,
        lineage: party_lineage(&state.db, id).await?,
        seats: party_seats(&state.db, id).await?,
        party,
    }))
}
