//! Committee meetings

use axum::{
    extract::{Path, Query, State},
    Json,
};
use okn_common::db::committees::{
    attendees_of_meeting, attending_member_ids, count_meetings_of_committee, load_committee, load_meeting,
    meetings_of_committee, protocol_parts, Committee, CommitteeMeeting, MeetingAttendee, ProtocolPart,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, PageQuery, Pagination};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CommitteeMeetings {
    pub committee: Committee,
    pub pagination: Pagination,
    pub meetings: Vec<CommitteeMeeting>,
}

/// GET /api/committees/{id}/meetings
pub async fn committee_meetings(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<CommitteeMeetings>> {
    let committee = load_committee(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("committee {} not found", id)))?;

    let total = count_meetings_of_committee(&state.db, id).await?;
    let pagination = calculate_pagination(total, page.requested());
    let meetings = meetings_of_committee(&state.db, id, pagination.limit(), pagination.offset).await?;

    Ok(Json(CommitteeMeetings {
        committee,
        pagination,
        meetings,
    }))
}

#[derive(Debug, Serialize)]
pub struct MeetingDetail {
    #[serde(flatten)]
    pub meeting: CommitteeMeeting,
    pub attending_members: Vec<i64>,
    pub attendees: Vec<MeetingAttendee>,
    pub protocol: Vec<ProtocolPart>,
}

/// GET /api/meetings/{id}
pub async fn meeting_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MeetingDetail>> {
    let meeting = load_meeting(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("meeting {} not found", id)))?;

    Ok(Json(MeetingDetail {
        attending_members: attending_member_ids(&state.db, id).await?,
        attendees: attendees_of_meeting(&state.db, id).await?,
        protocol: protocol_parts(&state.db, id).await?,
        meeting,
    }))
}
