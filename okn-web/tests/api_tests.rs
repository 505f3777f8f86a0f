//! Integration tests for the okn-web router
//!
//! Each test drives the full router with `oneshot` against a private
//! in-memory database seeded through `okn_common::db`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate};
use okn_common::auth::hash_password_with_cost;
use okn_common::config::TomlConfig;
use okn_common::db::awards::{save_award, save_award_type, Award, AwardType};
use okn_common::db::bills::{add_joiner, add_proposer, save_bill, Bill};
use okn_common::db::init_memory_database;
use okn_common::db::knessets::{save_knesset, Knesset};
use okn_common::db::members::{save_member, update_cached_stats, CachedStats, Member};
use okn_common::db::parties::{add_party_seats, save_party, Party, PartySeats};
use okn_common::db::tags::{add_vote_tag, vote_tags_with_scores};
use okn_common::db::users::{create_session, create_user};
use okn_common::db::votes::{save_vote, Vote};
use okn_common::time;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::util::ServiceExt;
use okn_web::{build_router, AppState};

async fn setup_db() -> SqlitePool {
    init_memory_database().await.expect("Should open in-memory database")
}

fn setup_app(db: SqlitePool) -> Router {
    build_router(AppState::new(db, TomlConfig::default()))
}

async fn seed_vote(db: &SqlitePool, title: &str, days_ago: i64, for_votes: i64, against: i64) -> i64 {
    let mut vote = Vote::new(title, time::now() - Duration::days(days_ago));
    vote.for_votes_count = Some(for_votes);
    vote.against_votes_count = Some(against);
    vote.votes_count = Some(for_votes + against);
    vote.controversy = Some(for_votes.min(against));
    save_vote(db, &vote).await.expect("Should save vote")
}

async fn seed_votes(db: &SqlitePool) -> (i64, i64, i64) {
    let recent = seed_vote(db, "אישור החוק לתיקון פקודת המסים", 2, 60, 10).await;
    let older = seed_vote(db, "הצעת אי-אמון בממשלה", 60, 50, 50).await;
    let oldest = seed_vote(db, "הסתייגות לסעיף 3", 400, 20, 30).await;
    (recent, older, oldest)
}

/// Session token for a freshly created user
async fn login_token(db: &SqlitePool) -> String {
    let hash = hash_password_with_cost("secret", 4).unwrap();
    let user = create_user(db, "dana", &hash).await.unwrap();
    create_session(db, user.id, time::now(), Duration::hours(1)).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app.oneshot(get(uri)).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn vote_ids(listing: &Value) -> Vec<i64> {
    listing["votes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_i64().unwrap())
        .collect()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = get_json(setup_app(setup_db().await), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "okn-web");
    assert!(body["version"].is_string());
}

// =============================================================================
// Vote listing
// =============================================================================

#[tokio::test]
async fn test_vote_listing_defaults_equal_explicit_defaults() {
    let db = setup_db().await;
    let (recent, older, oldest) = seed_votes(&db).await;
    let app = setup_app(db);

    let (status, implicit) = get_json(app.clone(), "/vote/").await;
    assert_eq!(status, StatusCode::OK);
    let (_, explicit) = get_json(app, "/vote/?vote_type=all&time=all&order=time").await;

    assert_eq!(vote_ids(&implicit), vec![recent, older, oldest]);
    assert_eq!(implicit["votes"], explicit["votes"]);
    assert_eq!(implicit["filter"], explicit["filter"]);
    assert_eq!(implicit["friend_pages"], explicit["friend_pages"]);
}

#[tokio::test]
async fn test_vote_listing_unknown_values_fall_back() {
    let db = setup_db().await;
    seed_votes(&db).await;
    let app = setup_app(db);

    let (status, body) = get_json(app, "/vote/?vote_type=nonsense&time=12&order=random&page=x").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filter"]["vote_type"], "all");
    assert_eq!(body["filter"]["time"], "all");
    assert_eq!(body["filter"]["order"], "time");
    assert_eq!(body["votes"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_vote_listing_filters_and_orders() {
    let db = setup_db().await;
    let (recent, older, _) = seed_votes(&db).await;
    let app = setup_app(db);

    let (_, week) = get_json(app.clone(), "/vote/?time=7").await;
    assert_eq!(vote_ids(&week), vec![recent]);

    let (_, no_confidence) = get_json(app.clone(), "/vote/?vote_type=no-confidence").await;
    assert_eq!(vote_ids(&no_confidence), vec![older]);

    let (_, controversial) = get_json(app, "/vote/?order=controversy").await;
    assert_eq!(vote_ids(&controversial)[0], older);
}

#[tokio::test]
async fn test_friend_pages_mark_one_current_option() {
    let app = setup_app(setup_db().await);

    let (_, body) = get_json(app, "/vote/?vote_type=demurrer&time=30&order=votes&show_stands=3,7").await;

    for dimension in ["vote_type", "time", "order"] {
        let pages = body["friend_pages"][dimension].as_array().unwrap();
        let current: Vec<_> = pages.iter().filter(|p| p["current"] == true).collect();
        assert_eq!(current.len(), 1, "dimension {}", dimension);
        assert_eq!(current[0]["url"], "./?vote_type=demurrer&time=30&order=votes");
    }
    assert_eq!(body["show_stands"], serde_json::json!(["3", "7"]));
}

// =============================================================================
// Vote detail and tagging
// =============================================================================

#[tokio::test]
async fn test_missing_vote_is_json_404() {
    let (status, body) = get_json(setup_app(setup_db().await), "/vote/999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(body["error"]["message"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_unauthenticated_tag_submission_is_redirected_and_not_applied() {
    let db = setup_db().await;
    let (vote, _, _) = seed_votes(&db).await;
    let app = setup_app(db.clone());

    let response = app
        .oneshot(post_form(&format!("/vote/{}/tags", vote), "tags=economy", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/login?next=/vote/{}", vote));
    assert!(vote_tags_with_scores(&db, vote).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_or_unknown_session_is_anonymous() {
    let db = setup_db().await;
    let (vote, _, _) = seed_votes(&db).await;
    let app = setup_app(db.clone());

    let response = app
        .oneshot(post_form(&format!("/vote/{}/tags", vote), "tags=economy", Some("bogus")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(vote_tags_with_scores(&db, vote).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_authenticated_tag_submission() {
    let db = setup_db().await;
    let (vote, _, _) = seed_votes(&db).await;
    let token = login_token(&db).await;
    let app = setup_app(db);

    let response = app
        .clone()
        .oneshot(post_form(
            &format!("/vote/{}/tags", vote),
            "tags=economy%2C+%D7%A6%D7%94%22%D7%9C",
            Some(&token),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/vote/{}", vote));

    let (_, detail) = get_json(app, &format!("/vote/{}", vote)).await;
    let names: Vec<_> = detail["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["economy".to_string(), "צה”ל".to_string()]);
    assert_eq!(detail["passed"], true);
}

#[tokio::test]
async fn test_tag_vote_flow() {
    let db = setup_db().await;
    let (vote, _, _) = seed_votes(&db).await;
    let tag = add_vote_tag(&db, vote, "economy").await.unwrap();
    let token = login_token(&db).await;
    let app = setup_app(db.clone());

    let uri = format!("/vote/{}/tags/{}/vote/1", vote, tag);
    let anonymous = app.clone().oneshot(post_form(&uri, "", None)).await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::SEE_OTHER);
    assert_eq!(vote_tags_with_scores(&db, vote).await.unwrap()[0].score, 0);

    let response = app.clone().oneshot(post_form(&uri, "", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/vote/{}", vote));

    // Voting again replaces the user's earlier vote
    let uri = format!("/vote/{}/tags/{}/vote/-1", vote, tag);
    app.clone().oneshot(post_form(&uri, "", Some(&token))).await.unwrap();
    assert_eq!(vote_tags_with_scores(&db, vote).await.unwrap()[0].score, -1);

    let uri = format!("/vote/{}/tags/{}/vote/4", vote, tag);
    let response = app.oneshot(post_form(&uri, "", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tagged_listing() {
    let db = setup_db().await;
    let (recent, older, _) = seed_votes(&db).await;
    add_vote_tag(&db, recent, "economy").await.unwrap();
    add_vote_tag(&db, older, "economy").await.unwrap();
    let app = setup_app(db);

    let (status, body) = get_json(app.clone(), "/vote/tagged/economy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vote_ids(&body), vec![recent, older]);

    let (status, body) = get_json(app, "/vote/tagged/unknown").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Votes tagged unknown");
    assert!(body["votes"].as_array().unwrap().is_empty());
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let db = setup_db().await;
    let hash = hash_password_with_cost("secret", 4).unwrap();
    create_user(&db, "dana", &hash).await.unwrap();
    let app = setup_app(db);

    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username": "dana", "password": "secret"}"#))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("okn_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age="));
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["user"]["username"], "dana");

    let response = app
        .oneshot(post_form("/login", "username=dana&password=wrong", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_login_redirects_to_next() {
    let db = setup_db().await;
    let hash = hash_password_with_cost("secret", 4).unwrap();
    create_user(&db, "dana", &hash).await.unwrap();
    let app = setup_app(db);

    let response = app
        .oneshot(post_form("/login", "username=dana&password=secret&next=%2Fvote%2F3", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/vote/3");
}

#[tokio::test]
async fn test_login_redirect_target_is_routed() {
    let db = setup_db().await;
    let (vote, _, _) = seed_votes(&db).await;
    let app = setup_app(db);

    let response = app
        .clone()
        .oneshot(post_form(&format!("/vote/{}/tags", vote), "tags=economy", None))
        .await
        .unwrap();
    let target = location(&response).to_string();

    let (status, body) = get_json(app.clone(), &target).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["login_required"], true);
    assert_eq!(body["next"], format!("/vote/{}", vote));

    let (status, body) = get_json(app, "/login?next=https://evil.example").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["next"].is_null());
}

#[tokio::test]
async fn test_logout_ends_session() {
    let db = setup_db().await;
    let (vote, _, _) = seed_votes(&db).await;
    let token = login_token(&db).await;
    let app = setup_app(db);

    let response = app.clone().oneshot(post_form("/logout", "", Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(post_form(&format!("/vote/{}/tags", vote), "tags=economy", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login"));
}

// =============================================================================
// Records
// =============================================================================

#[tokio::test]
async fn test_members_expose_cached_statistics() {
    let db = setup_db().await;
    let id = save_member(&db, &Member::new(None, "Dana Levi")).await.unwrap();
    let stats = CachedStats {
        bills_stats_proposed: 4,
        bills_stats_approved: 1,
        average_weekly_presence_hours: Some(12.5),
        ..Default::default()
    };
    update_cached_stats(&db, id, &stats).await.unwrap();
    let app = setup_app(db);

    let (status, body) = get_json(app.clone(), "/api/members").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Dana Levi");
    assert_eq!(body[0]["bills_stats_proposed"], 4);
    assert_eq!(body[0]["average_weekly_presence_hours"], 12.5);
    assert_eq!(body[0]["role"], "Opposition Member (male)");

    let (status, detail) = get_json(app.clone(), &format!("/api/members/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["bills_stats_approved"], 1);
    assert!(detail["highest_correlations"].as_array().unwrap().is_empty());

    let (status, body) = get_json(app, "/api/members/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_member_detail_lists_awards_and_convictions() {
    let db = setup_db().await;
    let mut member = Member::new(Some(30), "Dana Levi");
    member.date_of_birth = NaiveDate::from_ymd_opt(1960, 1, 1);
    save_member(&db, &member).await.unwrap();

    let prize = save_award_type(&db, &AwardType::new("Israel Prize", 1.0)).await.unwrap();
    let bribery = save_award_type(&db, &AwardType::new("Bribery", -1.0)).await.unwrap();
    for award_type_id in [prize, bribery] {
        save_award(
            &db,
            &Award {
                id: None,
                award_type_id,
                member_id: 30,
                date_given: NaiveDate::from_ymd_opt(2012, 5, 1).unwrap(),
                reference: String::new(),
            },
        )
        .await
        .unwrap();
    }
    let app = setup_app(db);

    let (status, detail) = get_json(app, "/api/members/30").await;
    assert_eq!(status, StatusCode::OK);
    assert!(detail["age"].as_i64().unwrap() >= 66);
    assert_eq!(detail["awards"][0]["award_type"], "Israel Prize");
    assert_eq!(detail["convictions"][0]["award_type"], "Bribery");
    assert_eq!(detail["convictions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_party_detail_includes_seat_history() {
    let db = setup_db().await;
    save_knesset(&db, &Knesset::new(19, None, None)).await.unwrap();
    let party_id = save_party(&db, &Party::new("Hatnua", Some(19))).await.unwrap();
    add_party_seats(
        &db,
        &PartySeats {
            party_id,
            start_date: NaiveDate::from_ymd_opt(2013, 2, 5).unwrap(),
            end_date: None,
            number_of_seats: Some(6),
        },
    )
    .await
    .unwrap();
    let app = setup_app(db);

    let (status, detail) = get_json(app, &format!("/api/parties/{}", party_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["seats"][0]["number_of_seats"], 6);
}

#[tokio::test]
async fn test_parties_without_knesset_are_empty() {
    let (status, body) = get_json(setup_app(setup_db().await), "/api/parties").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bill_listing_with_unknown_knesset_is_empty() {
    let db = setup_db().await;
    save_knesset(&db, &Knesset::new(19, None, None)).await.unwrap();
    let app = setup_app(db);

    let (status, body) = get_json(app.clone(), "/api/bills?knesset_id=42").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["bills"].as_array().unwrap().is_empty());

    let (status, body) = get_json(app, "/api/bills?stage=bogus&bill_type=weird").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_results"], 0);
}

#[tokio::test]
async fn test_bill_detail_separates_joiners() {
    let db = setup_db().await;
    save_member(&db, &Member::new(Some(1), "Proposer")).await.unwrap();
    save_member(&db, &Member::new(Some(2), "Joiner")).await.unwrap();
    let bill_id = save_bill(&db, &Bill::new("Open data bill")).await.unwrap();
    add_proposer(&db, bill_id, 1).await.unwrap();
    add_joiner(&db, bill_id, 2).await.unwrap();
    let app = setup_app(db);

    let (status, detail) = get_json(app.clone(), &format!("/api/bills/{}", bill_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["title"], "Open data bill");
    assert_eq!(detail["proposers"], serde_json::json!([1]));
    assert_eq!(detail["joiners"], serde_json::json!([2]));

    let (status, body) = get_json(app, "/api/bills/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_bill_listing_by_booklet() {
    let db = setup_db().await;
    let mut bill = Bill::new("Budget arrangements bill");
    bill.gov_booklet = Some(780);
    save_bill(&db, &bill).await.unwrap();
    save_bill(&db, &Bill::new("Other bill")).await.unwrap();
    let app = setup_app(db);

    let (status, body) = get_json(app.clone(), "/api/bills?gov_booklet=780").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_results"], 1);
    assert_eq!(body["bills"][0]["gov_booklet"], 780);

    let (_, body) = get_json(app.clone(), "/api/bills?knesset_booklet=780").await;
    assert_eq!(body["pagination"]["total_results"], 0);

    let (_, body) = get_json(app, "/api/bills?gov_booklet=latest").await;
    assert!(body["bills"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_committee_and_meeting() {
    let app = setup_app(setup_db().await);

    let (status, _) = get_json(app.clone(), "/api/committees/5/meetings").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get_json(app.clone(), "/api/meetings/5").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = get_json(app, "/api/lobbyists").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["lobbyists"].as_array().unwrap().is_empty());
}
