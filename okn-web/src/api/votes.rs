//! Vote listing, vote detail and tag-filtered listing

use axum::{
    extract::{Path, Query, State},
    Json,
};
use okn_common::db::tags::{count_votes_tagged, vote_tags_with_scores, votes_tagged, TagScore};
use okn_common::db::votes::{actions_for_vote, count_filtered, filter_and_order, get_vote, Vote, VoteAction};
use okn_common::time;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiResult;
use crate::listing::{friend_pages, FriendPages, VoteListingQuery};
use crate::pagination::{calculate_pagination, PageQuery, Pagination};
use crate::AppState;

/// Active (normalized) listing parameters
#[derive(Debug, Serialize)]
pub struct ActiveFilter {
    pub vote_type: &'static str,
    pub time: &'static str,
    pub order: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VoteListing {
    pub filter: ActiveFilter,
    pub friend_pages: FriendPages,
    pub show_stands: Vec<String>,
    pub pagination: Pagination,
    pub votes: Vec<Vote>,
}

/// GET /vote/
pub async fn list_votes(
    State(state): State<AppState>,
    Query(query): Query<VoteListingQuery>,
) -> ApiResult<Json<VoteListing>> {
    let filter = query.filter();
    let now = time::now();
    debug!("Vote listing with {:?}", filter);

    let total = count_filtered(&state.db, &filter, now).await?;
    let page = PageQuery { page: query.page.clone() }.requested();
    let pagination = calculate_pagination(total, page);
    let votes = filter_and_order(&state.db, &filter, now, pagination.limit(), pagination.offset).await?;

    Ok(Json(VoteListing {
        filter: ActiveFilter {
            vote_type: filter.vote_type.map_or("all", |t| t.as_str()),
            time: filter.time.as_str(),
            order: filter.order.as_str(),
        },
        friend_pages: friend_pages(&filter),
        show_stands: query.show_stands(),
        pagination,
        votes,
    }))
}

#[derive(Debug, Serialize)]
pub struct VoteDetail {
    pub vote: Vote,
    pub passed: bool,
    pub actions: Vec<VoteAction>,
    pub tags: Vec<TagScore>,
}

/// GET /vote/{id}
pub async fn vote_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<VoteDetail>> {
    let vote = get_vote(&state.db, id).await?;
    let actions = actions_for_vote(&state.db, id).await?;
    let tags = vote_tags_with_scores(&state.db, id).await?;

    Ok(Json(VoteDetail {
        passed: vote.passed(),
        vote,
        actions,
        tags,
    }))
}

#[derive(Debug, Serialize)]
pub struct TaggedVotes {
    pub title: String,
    pub tag: String,
    pub pagination: Pagination,
    pub votes: Vec<Vote>,
}

/// GET /vote/tagged/{tag}
///
/// An unknown tag is an empty listing, not a missing page.
pub async fn tagged_votes(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<TaggedVotes>> {
    let total = count_votes_tagged(&state.db, &tag).await?;
    let pagination = calculate_pagination(total, page.requested());
    let votes = votes_tagged(&state.db, &tag, pagination.limit(), pagination.offset).await?;

    Ok(Json(TaggedVotes {
        title: format!("Votes tagged {}", tag),
        tag,
        pagination,
        votes,
    }))
}
