//! Login sessions
//!
//! A session token travels either in the `okn_session` cookie set by
//! `POST /login` or as an `Authorization: Bearer` header.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use okn_common::db::users::{authenticate, create_session, delete_session, session_user, User};
use okn_common::time;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::extract::FormOrJson;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const SESSION_COOKIE: &str = "okn_session";

/// Session token from the bearer header or the session cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    bearer
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(SESSION_COOKIE)
                .map(|c| c.value().to_string())
        })
        .filter(|t| !t.is_empty())
}

pub fn session_cookie(token: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(::time::Duration::seconds(max_age_secs))
        .build()
}

/// Redirect to the login page, returning to the vote afterwards
pub fn login_redirect(vote_id: i64) -> Response {
    Redirect::to(&format!("/login?next=/vote/{}", vote_id)).into_response()
}

/// The logged-in user, if the request carries a live session
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(CurrentUser(None));
        };
        let user = session_user(&state.db, &token, time::now()).await?;
        Ok(CurrentUser(user))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequired {
    pub login_required: bool,
    pub next: Option<String>,
}

/// GET /login
///
/// Target of the login redirects; tells the client to POST credentials
/// here, passing `next` back along.
pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Json<LoginRequired> {
    Json(LoginRequired {
        login_required: true,
        next: query.next.filter(|next| is_local_path(next)),
    })
}

/// Only same-site absolute paths are followed after login
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    FormOrJson(form): FormOrJson<LoginForm>,
) -> ApiResult<Response> {
    let Some(user) = authenticate(&state.db, &form.username, &form.password).await? else {
        warn!("Failed login for '{}'", form.username);
        return Err(ApiError::Unauthorized("Invalid username or password".to_string()));
    };

    let ttl = state.session_ttl();
    let token = create_session(&state.db, user.id, time::now(), ttl).await?;
    info!("User '{}' logged in", user.username);

    let jar = jar.add(session_cookie(token.clone(), ttl.num_seconds()));
    let response = match form.next.filter(|next| is_local_path(next)) {
        Some(next) => (jar, Redirect::to(&next)).into_response(),
        None => (
            jar,
            Json(LoginResponse {
                user,
                token,
                expires_in: ttl.num_seconds(),
            }),
        )
            .into_response(),
    };

    Ok(response)
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiResult<(CookieJar, StatusCode)> {
    if let Some(token) = session_token(&headers) {
        delete_session(&state.db, &token).await?;
    }

    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"));
    Ok((jar, StatusCode::NO_CONTENT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_preferred_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("okn_session=from-cookie"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("okn_session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".to_string(), 3600);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(::time::Duration::hours(1)));
    }

    #[test]
    fn test_only_local_next_paths() {
        assert!(is_local_path("/vote/3"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("https://evil.example"));
    }
}
