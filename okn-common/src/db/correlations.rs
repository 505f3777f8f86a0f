//! Voting correlations between pairs of members

use crate::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// Number of correlations shown in each direction
pub const CORRELATION_LIMIT: i64 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub m1_id: i64,
    pub m2_id: i64,
    pub score: i64,
    pub normalized_score: Option<f64>,
    pub not_same_party: Option<bool>,
}

/// A correlation joined with the other member's name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedMember {
    pub member_id: i64,
    pub name: String,
    pub normalized_score: f64,
}

impl CorrelatedMember {
    /// `"<name> (<score as percent>)"`
    pub fn label(&self) -> String {
        format!("{} ({:.0})", self.name, 100.0 * self.normalized_score)
    }
}

pub async fn save_correlation(pool: &SqlitePool, correlation: &Correlation) -> Result<()> {
    sqlx::query(
        "INSERT INTO correlations (m1_id, m2_id, score, normalized_score, not_same_party) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(correlation.m1_id)
    .bind(correlation.m2_id)
    .bind(correlation.score)
    .bind(correlation.normalized_score)
    .bind(correlation.not_same_party)
    .execute(pool)
    .await?;

    Ok(())
}

async fn correlated(pool: &SqlitePool, member_id: i64, descending: bool) -> Result<Vec<CorrelatedMember>> {
    let direction = if descending { "DESC" } else { "ASC" };
    let rows: Vec<(i64, String, f64)> = sqlx::query_as(&format!(
        "SELECT c.m2_id, m.name, c.normalized_score FROM correlations c \
         JOIN members m ON m.id = c.m2_id \
         WHERE c.m1_id = ? AND c.normalized_score IS NOT NULL \
         ORDER BY c.normalized_score {} LIMIT ?",
        direction
    ))
    .bind(member_id)
    .bind(CORRELATION_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(member_id, name, normalized_score)| CorrelatedMember {
            member_id,
            name,
            normalized_score,
        })
        .collect())
}

/// Members voting most like this one
pub async fn highest_correlations(pool: &SqlitePool, member_id: i64) -> Result<Vec<CorrelatedMember>> {
    correlated(pool, member_id, true).await
}

/// Members voting least like this one
pub async fn lowest_correlations(pool: &SqlitePool, member_id: i64) -> Result<Vec<CorrelatedMember>> {
    correlated(pool, member_id, false).await
}
