//! Tagging votes and voting on tag assignments
//!
//! Both endpoints need a logged-in user; anonymous requests are sent to the
//! login page and change nothing.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use okn_common::db::tags::{parse_tag_input, set_vote_tags, vote_on_tag as store_tag_vote};
use okn_common::db::votes::get_vote;
use serde::Deserialize;
use tracing::info;

use super::auth::{login_redirect, CurrentUser};
use super::extract::FormOrJson;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TagsForm {
    #[serde(default)]
    pub tags: String,
}

fn back_to_vote(vote_id: i64) -> Response {
    Redirect::to(&format!("/vote/{}", vote_id)).into_response()
}

/// POST /vote/{id}/tags
pub async fn submit_tags(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    CurrentUser(user): CurrentUser,
    body: Option<FormOrJson<TagsForm>>,
) -> ApiResult<Response> {
    let Some(user) = user else {
        return Ok(login_redirect(id));
    };
    let FormOrJson(form) = body.ok_or_else(|| ApiError::BadRequest("Missing tags".to_string()))?;

    get_vote(&state.db, id).await?;
    let tags = parse_tag_input(&form.tags);
    set_vote_tags(&state.db, id, &tags).await?;
    info!("User '{}' set {} tags on vote {}", user.username, tags.len(), id);

    Ok(back_to_vote(id))
}

/// POST /vote/{id}/tags/{tag_id}/vote/{value}
pub async fn vote_on_tag(
    State(state): State<AppState>,
    Path((id, tag_id, value)): Path<(i64, i64, i64)>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Response> {
    let Some(user) = user else {
        return Ok(login_redirect(id));
    };

    store_tag_vote(&state.db, id, tag_id, user.id, value).await?;
    info!("User '{}' voted {} on tag {} of vote {}", user.username, value, tag_id, id);

    Ok(back_to_vote(id))
}
