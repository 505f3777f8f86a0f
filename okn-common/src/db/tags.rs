//! Vote tags and user votes on tag assignments

use crate::db::votes::{vote_columns, vote_from_row, Vote};
use crate::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagScore {
    pub tag_id: i64,
    pub name: String,
    /// Sum of user votes on this tag assignment
    pub score: i64,
}

/// Split a comma-separated tag list
///
/// Straight double quotes become `”` so Hebrew acronyms survive, names are
/// trimmed, empties dropped and duplicates removed keeping first occurrence.
pub fn parse_tag_input(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for name in input.replace('"', "”").split(',') {
        let name = name.trim();
        if !name.is_empty() && !tags.iter().any(|t| t == name) {
            tags.push(name.to_string());
        }
    }
    tags
}

async fn ensure_tag(pool: &SqlitePool, name: &str) -> Result<i64> {
    sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    let id: i64 = sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

pub async fn tag_id_by_name(pool: &SqlitePool, name: &str) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// Replace the tag set of a vote
///
/// Assignments that survive keep their user votes.
pub async fn set_vote_tags(pool: &SqlitePool, vote_id: i64, names: &[String]) -> Result<()> {
    let mut tx = pool.begin().await?;

    let mut keep = Vec::with_capacity(names.len());
    for name in names {
        sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        let tag_id: i64 = sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;
        sqlx::query("INSERT OR IGNORE INTO tagged_votes (tag_id, vote_id) VALUES (?, ?)")
            .bind(tag_id)
            .bind(vote_id)
            .execute(&mut *tx)
            .await?;
        keep.push(tag_id);
    }

    let current: Vec<i64> = sqlx::query_scalar("SELECT tag_id FROM tagged_votes WHERE vote_id = ?")
        .bind(vote_id)
        .fetch_all(&mut *tx)
        .await?;
    for tag_id in current.into_iter().filter(|id| !keep.contains(id)) {
        sqlx::query("DELETE FROM tagged_votes WHERE tag_id = ? AND vote_id = ?")
            .bind(tag_id)
            .bind(vote_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Add a single tag to a vote
pub async fn add_vote_tag(pool: &SqlitePool, vote_id: i64, name: &str) -> Result<i64> {
    let tag_id = ensure_tag(pool, name).await?;
    sqlx::query("INSERT OR IGNORE INTO tagged_votes (tag_id, vote_id) VALUES (?, ?)")
        .bind(tag_id)
        .bind(vote_id)
        .execute(pool)
        .await?;
    Ok(tag_id)
}

/// Set the user's vote on a tag assignment, creating it on first use
pub async fn vote_on_tag(
    pool: &SqlitePool,
    vote_id: i64,
    tag_id: i64,
    user_id: i64,
    value: i64,
) -> Result<()> {
    if !(-1..=1).contains(&value) {
        return Err(Error::InvalidInput(format!("tag vote must be -1, 0 or 1, got {}", value)));
    }

    let tagged_item: i64 = sqlx::query_scalar("SELECT id FROM tagged_votes WHERE tag_id = ? AND vote_id = ?")
        .bind(tag_id)
        .bind(vote_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("tag {} on vote {}", tag_id, vote_id)))?;

    sqlx::query(
        r#"
        INSERT INTO tag_votes (tagged_item_id, user_id, vote) VALUES (?, ?, ?)
        ON CONFLICT(tagged_item_id, user_id) DO UPDATE SET vote = excluded.vote
        "#,
    )
    .bind(tagged_item)
    .bind(user_id)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Tags of a vote with their summed user votes, by name
pub async fn vote_tags_with_scores(pool: &SqlitePool, vote_id: i64) -> Result<Vec<TagScore>> {
    let rows: Vec<(i64, String, i64)> = sqlx::query_as(
        r#"
        SELECT t.id, t.name, COALESCE(SUM(tv.vote), 0) AS score
        FROM tagged_votes ti
        JOIN tags t ON t.id = ti.tag_id
        LEFT JOIN tag_votes tv ON tv.tagged_item_id = ti.id
        WHERE ti.vote_id = ?
        GROUP BY t.id, t.name
        ORDER BY t.name
        "#,
    )
    .bind(vote_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(tag_id, name, score)| TagScore { tag_id, name, score })
        .collect())
}

/// Votes carrying the named tag, newest first; empty for an unknown tag
pub async fn votes_tagged(pool: &SqlitePool, tag: &str, limit: i64, offset: i64) -> Result<Vec<Vote>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM votes v \
         JOIN tagged_votes ti ON ti.vote_id = v.id \
         JOIN tags t ON t.id = ti.tag_id \
         WHERE t.name = ? ORDER BY v.time DESC, v.id DESC LIMIT ? OFFSET ?",
        vote_columns("v")
    ))
    .bind(tag)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(vote_from_row).collect())
}

pub async fn count_votes_tagged(pool: &SqlitePool, tag: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tagged_votes ti JOIN tags t ON t.id = ti.tag_id WHERE t.name = ?",
    )
    .bind(tag)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::users::create_user;
    use crate::db::votes::save_vote;
    use chrono::NaiveDate;

    async fn seed_vote(pool: &SqlitePool, day: u32) -> i64 {
        let time = NaiveDate::from_ymd_opt(2014, 1, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        save_vote(pool, &Vote::new("אישור החוק", time)).await.unwrap()
    }

    #[test]
    fn test_parse_tag_input() {
        assert_eq!(
            parse_tag_input(" economy, צה\"ל ,economy,, "),
            vec!["economy".to_string(), "צה”ל".to_string()]
        );
        assert!(parse_tag_input(" , ").is_empty());
    }

    #[tokio::test]
    async fn test_set_vote_tags_replaces_set() {
        let pool = init_memory_database().await.unwrap();
        let vote = seed_vote(&pool, 1).await;

        set_vote_tags(&pool, vote, &parse_tag_input("economy,health")).await.unwrap();
        set_vote_tags(&pool, vote, &parse_tag_input("health,security")).await.unwrap();

        let names: Vec<_> = vote_tags_with_scores(&pool, vote)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["health", "security"]);
        assert!(tag_id_by_name(&pool, "economy").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_vote_on_tag_is_get_or_create() {
        let pool = init_memory_database().await.unwrap();
        let vote = seed_vote(&pool, 1).await;
        let tag = add_vote_tag(&pool, vote, "economy").await.unwrap();
        let alice = create_user(&pool, "alice", "x").await.unwrap();
        let bob = create_user(&pool, "bob", "x").await.unwrap();

        vote_on_tag(&pool, vote, tag, alice.id, 1).await.unwrap();
        vote_on_tag(&pool, vote, tag, alice.id, -1).await.unwrap();
        vote_on_tag(&pool, vote, tag, bob.id, -1).await.unwrap();

        let scores = vote_tags_with_scores(&pool, vote).await.unwrap();
        assert_eq!(scores[0].score, -2);

        assert!(vote_on_tag(&pool, vote, 999, alice.id, 1).await.unwrap_err().is_not_found());
        assert!(matches!(
            vote_on_tag(&pool, vote, tag, alice.id, 5).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_votes_tagged() {
        let pool = init_memory_database().await.unwrap();
        let older = seed_vote(&pool, 1).await;
        let newer = seed_vote(&pool, 2).await;
        seed_vote(&pool, 3).await;
        add_vote_tag(&pool, older, "economy").await.unwrap();
        add_vote_tag(&pool, newer, "economy").await.unwrap();

        let votes = votes_tagged(&pool, "economy", 50, 0).await.unwrap();
        let ids: Vec<_> = votes.iter().filter_map(|v| v.id).collect();
        assert_eq!(ids, vec![newer, older]);
        assert_eq!(count_votes_tagged(&pool, "economy").await.unwrap(), 2);

        assert!(votes_tagged(&pool, "missing", 50, 0).await.unwrap().is_empty());
    }
}
