//! Member endpoints
//!
//! Statistics come from the cached columns on the member row; nothing here
//! recomputes them.

use axum::{
    extract::{Path, State},
    Json,
};
use okn_common::db::awards::{member_awards, member_convictions, MemberAward};
use okn_common::db::committees::{committee_participation, CommitteeParticipation};
use okn_common::db::correlations::{highest_correlations, lowest_correlations, CorrelatedMember};
use okn_common::db::knessets::{current_knesset, first_knesset_start};
use okn_common::db::members::{get_member, list_current_members, member_names, memberships_for_member, Member, Membership};
use okn_common::db::parties::{load_party, Party};
use okn_common::stats::{age, service_time};
use okn_common::time;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MemberSummary {
    #[serde(flatten)]
    pub member: Member,
    pub party_name: Option<String>,
    pub role: String,
}

async fn current_party(
    pool: &SqlitePool,
    cache: &mut HashMap<i64, Option<Party>>,
    member: &Member,
) -> ApiResult<Option<Party>> {
    let Some(party_id) = member.current_party_id else {
        return Ok(None);
    };
    if let Some(party) = cache.get(&party_id) {
        return Ok(party.clone());
    }
    let party = load_party(pool, party_id).await?;
    cache.insert(party_id, party.clone());
    Ok(party)
}

/// GET /api/members
pub async fn list_members(State(state): State<AppState>) -> ApiResult<Json<Vec<MemberSummary>>> {
    let members = list_current_members(&state.db).await?;
    let mut parties = HashMap::new();

    let mut summaries = Vec::with_capacity(members.len());
    for member in members {
        let party = current_party(&state.db, &mut parties, &member).await?;
        summaries.push(MemberSummary {
            role: member.role(party.as_ref()),
            party_name: party.map(|p| p.name),
            member,
        });
    }

    Ok(Json(summaries))
}

#[derive(Debug, Serialize)]
pub struct MemberDetail {
    #[serde(flatten)]
    pub member: Member,
    pub party: Option<Party>,
    pub roles: Vec<String>,
    pub is_minister: bool,
    pub coalition_status: Option<bool>,
    pub names: Vec<String>,
    pub memberships: Vec<Membership>,
    pub service_days: Option<i64>,
    pub age: Option<i32>,
    pub awards: Vec<MemberAward>,
    pub convictions: Vec<MemberAward>,
    pub committees: Vec<CommitteeParticipation>,
    pub highest_correlations: Vec<String>,
    pub lowest_correlations: Vec<String>,
}

fn labels(correlations: Vec<CorrelatedMember>) -> Vec<String> {
    correlations.iter().map(CorrelatedMember::label).collect()
}

/// GET /api/members/{id}
pub async fn member_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MemberDetail>> {
    let member = get_member(&state.db, id).await?;
    let party = match member.current_party_id {
        Some(party_id) => load_party(&state.db, party_id).await?,
        None => None,
    };

    let knesset = current_knesset(&state.db).await?;
    let since = knesset
        .as_ref()
        .map(|k| k.effective_start())
        .unwrap_or_else(first_knesset_start);
    let service_days = knesset
        .as_ref()
        .and_then(|k| service_time(&member, k, time::today()));

    Ok(Json(MemberDetail {
        roles: member.roles(party.as_ref()),
        is_minister: member.is_minister(party.as_ref()),
        coalition_status: member.coalition_status(party.as_ref()),
        names: member_names(&state.db, &member).await?,
        memberships: memberships_for_member(&state.db, id).await?,
        service_days,
        age: age(&member, time::today()),
        awards: member_awards(&state.db, id).await?,
        convictions: member_convictions(&state.db, id).await?,
        committees: committee_participation(&state.db, id, since).await?,
        highest_correlations: labels(highest_correlations(&state.db, id).await?),
        lowest_correlations: labels(lowest_correlations(&state.db, id).await?),
        party,
        member,
    }))
}
