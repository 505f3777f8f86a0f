//! Persons, titles and lobbyists

use crate::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Anyone appearing in protocols, optionally a member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub member_id: Option<i64>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub img_url: String,
}

impl Person {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            member_id: None,
            gender: None,
            email: None,
            img_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lobbyist {
    pub id: Option<i64>,
    pub person_id: Option<i64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub large_image_url: Option<String>,
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LobbyistCorporation {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub source_id: Option<String>,
}

/// A lobbyist with display name and the number of meetings mentioning them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LobbyistSummary {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub mentions: i64,
}

pub async fn save_person(pool: &SqlitePool, person: &Person) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO persons (id, name, member_id, gender, email, img_url) VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            member_id = excluded.member_id,
            gender = excluded.gender,
            email = excluded.email,
            img_url = excluded.img_url
        "#,
    )
    .bind(person.id)
    .bind(&person.name)
    .bind(person.member_id)
    .bind(&person.gender)
    .bind(&person.email)
    .bind(&person.img_url)
    .execute(pool)
    .await?;

    Ok(person.id.unwrap_or_else(|| result.last_insert_rowid()))
}

pub async fn load_person(pool: &SqlitePool, id: i64) -> Result<Option<Person>> {
    let row = sqlx::query("SELECT id, name, member_id, gender, email, img_url FROM persons WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Person {
        id: row.get("id"),
        name: row.get("name"),
        member_id: row.get("member_id"),
        gender: row.get("gender"),
        email: row.get("email"),
        img_url: row.get("img_url"),
    }))
}

/// Attach a title to a person, creating the title on first use
pub async fn add_person_title(pool: &SqlitePool, person_id: i64, title: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO titles (name) VALUES (?)")
        .bind(title)
        .execute(pool)
        .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO person_titles (person_id, title_id) \
         SELECT ?, id FROM titles WHERE name = ?",
    )
    .bind(person_id)
    .bind(title)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn person_titles(pool: &SqlitePool, person_id: i64) -> Result<Vec<String>> {
    let titles: Vec<String> = sqlx::query_scalar(
        "SELECT t.name FROM titles t JOIN person_titles pt ON pt.title_id = t.id \
         WHERE pt.person_id = ? ORDER BY t.name",
    )
    .bind(person_id)
    .fetch_all(pool)
    .await?;

    Ok(titles)
}

pub async fn save_lobbyist(pool: &SqlitePool, lobbyist: &Lobbyist) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO lobbyists (id, person_id, description, image_url, large_image_url, source_id)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            person_id = excluded.person_id,
            description = excluded.description,
            image_url = excluded.image_url,
            large_image_url = excluded.large_image_url,
            source_id = excluded.source_id
        "#,
    )
    .bind(lobbyist.id)
    .bind(lobbyist.person_id)
    .bind(&lobbyist.description)
    .bind(&lobbyist.image_url)
    .bind(&lobbyist.large_image_url)
    .bind(&lobbyist.source_id)
    .execute(pool)
    .await?;

    Ok(lobbyist.id.unwrap_or_else(|| result.last_insert_rowid()))
}

pub async fn save_corporation(pool: &SqlitePool, corporation: &LobbyistCorporation) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO lobbyist_corporations (name, description, source_id) VALUES (?, ?, ?)",
    )
    .bind(&corporation.name)
    .bind(&corporation.description)
    .bind(&corporation.source_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Lobbyists ordered by how often committee meetings mention them
pub async fn list_lobbyists(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<LobbyistSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT l.id, p.name, l.description, l.image_url, COUNT(cml.meeting_id) AS mentions
        FROM lobbyists l
        LEFT JOIN persons p ON p.id = l.person_id
        LEFT JOIN committee_meeting_lobbyists cml ON cml.lobbyist_id = l.id
        GROUP BY l.id
        ORDER BY mentions DESC, p.name, l.id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| LobbyistSummary {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            image_url: row.get("image_url"),
            mentions: row.get("mentions"),
        })
        .collect())
}

pub async fn count_lobbyists(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lobbyists")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::committees::{add_mentioned_lobbyist, save_committee, save_meeting, Committee, CommitteeMeeting};
    use crate::db::init::init_memory_database;
    use chrono::NaiveDate;

    fn lobbyist(person_id: i64) -> Lobbyist {
        Lobbyist {
            id: None,
            person_id: Some(person_id),
            description: None,
            image_url: None,
            large_image_url: None,
            source_id: None,
        }
    }

    #[tokio::test]
    async fn test_lobbyists_by_mentions() {
        let pool = init_memory_database().await.unwrap();
        let quiet = save_person(&pool, &Person::new("Quiet")).await.unwrap();
        let busy = save_person(&pool, &Person::new("Busy")).await.unwrap();
        let quiet = save_lobbyist(&pool, &lobbyist(quiet)).await.unwrap();
        let busy = save_lobbyist(&pool, &lobbyist(busy)).await.unwrap();

        let committee = save_committee(&pool, &Committee::new("Finance")).await.unwrap();
        for day in 1..=2 {
            let date = NaiveDate::from_ymd_opt(2013, 5, day).unwrap();
            let meeting = save_meeting(&pool, &CommitteeMeeting::new(committee, date))
                .await
                .unwrap();
            add_mentioned_lobbyist(&pool, meeting, busy).await.unwrap();
        }

        let lobbyists = list_lobbyists(&pool, 50, 0).await.unwrap();
        assert_eq!(lobbyists.len(), 2);
        assert_eq!(lobbyists[0].id, busy);
        assert_eq!(lobbyists[0].mentions, 2);
        assert_eq!(lobbyists[1].id, quiet);
        assert_eq!(lobbyists[1].mentions, 0);
        assert_eq!(count_lobbyists(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_titles_are_shared() {
        let pool = init_memory_database().await.unwrap();
        let first = save_person(&pool, &Person::new("First")).await.unwrap();
        let second = save_person(&pool, &Person::new("Second")).await.unwrap();

        add_person_title(&pool, first, "Adv.").await.unwrap();
        add_person_title(&pool, second, "Adv.").await.unwrap();
        add_person_title(&pool, second, "Dr.").await.unwrap();

        assert_eq!(person_titles(&pool, second).await.unwrap(), vec!["Adv.", "Dr."]);
        let titles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM titles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(titles, 2);
        assert_eq!(load_person(&pool, first).await.unwrap().unwrap().name, "First");
    }
}
