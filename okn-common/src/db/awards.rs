//! Awards and convictions of members
//!
//! Both are stored as awards; the sign of the award type's valence tells
//! them apart. Neutral types (valence 0) are neither.

use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AwardType {
    pub id: Option<i64>,
    pub name: String,
    pub valence: f64,
    pub description: String,
}

impl AwardType {
    pub fn new(name: &str, valence: f64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            valence,
            description: String::new(),
        }
    }
}

/// An award (or conviction) given to a member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Award {
    pub id: Option<i64>,
    pub award_type_id: i64,
    pub member_id: i64,
    pub date_given: NaiveDate,
    pub reference: String,
}

/// Award joined with its type, as listed on a member page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberAward {
    pub id: i64,
    pub award_type: String,
    pub valence: f64,
    pub date_given: NaiveDate,
    pub reference: String,
}

pub async fn save_award_type(pool: &SqlitePool, award_type: &AwardType) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO award_types (id, name, valence, description) VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            valence = excluded.valence,
            description = excluded.description
        "#,
    )
    .bind(award_type.id)
    .bind(&award_type.name)
    .bind(award_type.valence)
    .bind(&award_type.description)
    .execute(pool)
    .await?;

    Ok(award_type.id.unwrap_or_else(|| result.last_insert_rowid()))
}

pub async fn save_award(pool: &SqlitePool, award: &Award) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO awards (id, award_type_id, member_id, date_given, reference) VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            award_type_id = excluded.award_type_id,
            member_id = excluded.member_id,
            date_given = excluded.date_given,
            reference = excluded.reference
        "#,
    )
    .bind(award.id)
    .bind(award.award_type_id)
    .bind(award.member_id)
    .bind(award.date_given)
    .bind(&award.reference)
    .execute(pool)
    .await?;

    Ok(award.id.unwrap_or_else(|| result.last_insert_rowid()))
}

fn member_award_from_row(row: &sqlx::sqlite::SqliteRow) -> MemberAward {
    MemberAward {
        id: row.get("id"),
        award_type: row.get("name"),
        valence: row.get("valence"),
        date_given: row.get("date_given"),
        reference: row.get("reference"),
    }
}

async fn member_awards_where(pool: &SqlitePool, member_id: i64, valence: &str) -> Result<Vec<MemberAward>> {
    let rows = sqlx::query(&format!(
        "SELECT a.id, t.name, t.valence, a.date_given, a.reference FROM awards a \
         JOIN award_types t ON t.id = a.award_type_id \
         WHERE a.member_id = ? AND t.valence {} \
         ORDER BY a.date_given DESC, a.id DESC",
        valence
    ))
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(member_award_from_row).collect())
}

/// Awards with a positive valence, most recent first
pub async fn member_awards(pool: &SqlitePool, member_id: i64) -> Result<Vec<MemberAward>> {
    member_awards_where(pool, member_id, "> 0").await
}

/// Awards with a negative valence, most recent first
pub async fn member_convictions(pool: &SqlitePool, member_id: i64) -> Result<Vec<MemberAward>> {
    member_awards_where(pool, member_id, "< 0").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::members::{save_member, Member};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn award(award_type_id: i64, date_given: NaiveDate) -> Award {
        Award {
            id: None,
            award_type_id,
            member_id: 1,
            date_given,
            reference: String::new(),
        }
    }

    #[tokio::test]
    async fn test_awards_and_convictions_split_by_valence() {
        let pool = init_memory_database().await.unwrap();
        save_member(&pool, &Member::new(Some(1), "MK")).await.unwrap();

        let prize = save_award_type(&pool, &AwardType::new("Israel Prize", 1.0)).await.unwrap();
        let fraud = save_award_type(&pool, &AwardType::new("Fraud", -1.0)).await.unwrap();
        let mention = save_award_type(&pool, &AwardType::new("Mention", 0.0)).await.unwrap();

        save_award(&pool, &award(prize, date(2001, 4, 26))).await.unwrap();
        save_award(&pool, &award(prize, date(2010, 4, 20))).await.unwrap();
        save_award(&pool, &award(fraud, date(2012, 9, 1))).await.unwrap();
        save_award(&pool, &award(mention, date(2013, 1, 1))).await.unwrap();

        let awards = member_awards(&pool, 1).await.unwrap();
        assert_eq!(awards.len(), 2);
        assert_eq!(awards[0].date_given, date(2010, 4, 20));
        assert_eq!(awards[0].award_type, "Israel Prize");

        let convictions = member_convictions(&pool, 1).await.unwrap();
        assert_eq!(convictions.len(), 1);
        assert_eq!(convictions[0].award_type, "Fraud");

        assert!(member_awards(&pool, 2).await.unwrap().is_empty());
    }
}
