//! Database repository for verses.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::verses::{VerseCreateDBRequest, VerseDBResponse, VerseUpdateDBRequest},
};
use crate::types::{SongId, VerseId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;

const VERSE_COLUMNS: &str = r#"id, song_id, text, "order", created_at, updated_at"#;

/// Filter for listing the verses of one song, in display order
#[derive(Debug, Clone)]
pub struct VerseFilter {
    pub song_id: SongId,
    pub skip: i64,
    pub limit: i64,
}

impl VerseFilter {
    pub fn new(song_id: SongId, skip: i64, limit: i64) -> Self {
        Self { song_id, skip, limit }
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Verse {
    pub id: VerseId,
    pub song_id: SongId,
    pub text: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Verse> for VerseDBResponse {
    fn from(verse: Verse) -> Self {
        Self {
            id: verse.id,
            song_id: verse.song_id,
            text: verse.text,
            order: verse.order,
            created_at: verse.created_at,
            updated_at: verse.updated_at,
        }
    }
}

pub struct Verses<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Verses<'c> {
    type CreateRequest = VerseCreateDBRequest;
    type UpdateRequest = VerseUpdateDBRequest;
    type Response = VerseDBResponse;
    type Id = VerseId;
    type Filter = VerseFilter;

    #[instrument(skip(self, request), fields(song_id = request.song_id, order = request.order), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let verse = sqlx::query_as::<_, Verse>(&format!(
            r#"INSERT INTO verses (song_id, text, "order") VALUES ($1, $2, $3) RETURNING {VERSE_COLUMNS}"#
        ))
        .bind(request.song_id)
        .bind(&request.text)
        .bind(request.order)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(VerseDBResponse::from(verse))
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let verse = sqlx::query_as::<_, Verse>(&format!(
            "SELECT {VERSE_COLUMNS} FROM verses WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(verse.map(VerseDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(song_id = filter.song_id, limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let verses = sqlx::query_as::<_, Verse>(&format!(
            r#"
            SELECT {VERSE_COLUMNS} FROM verses
            WHERE song_id = $1 AND deleted_at IS NULL
            ORDER BY "order", id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(filter.song_id)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(verses.into_iter().map(VerseDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(order = request.order), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let verse = sqlx::query_as::<_, Verse>(&format!(
            r#"
            UPDATE verses SET text = $2, "order" = $3
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {VERSE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.text)
        .bind(request.order)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(VerseDBResponse::from(verse))
    }
}

impl<'c> Verses<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert many verses with a single statement
    #[instrument(skip(self, requests), fields(count = requests.len()), err)]
    pub async fn create_bulk(&mut self, requests: &[VerseCreateDBRequest]) -> Result<Vec<VerseDBResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::new(r#"INSERT INTO verses (song_id, text, "order") "#);
        query.push_values(requests, |mut row, request| {
            row.push_bind(request.song_id).push_bind(request.text.clone()).push_bind(request.order);
        });
        query.push(format!(" RETURNING {VERSE_COLUMNS}"));

        let mut verses = query.build_query_as::<Verse>().fetch_all(&mut *self.db).await?;
        verses.sort_by_key(|v| (v.song_id, v.order));

        Ok(verses.into_iter().map(VerseDBResponse::from).collect())
    }

    /// Fetch a verse only if it belongs to `song_id`
    #[instrument(skip(self), err)]
    pub async fn get_for_song(&mut self, song_id: SongId, id: VerseId) -> Result<Option<VerseDBResponse>> {
        let verse = sqlx::query_as::<_, Verse>(&format!(
            "SELECT {VERSE_COLUMNS} FROM verses WHERE id = $1 AND song_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(song_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(verse.map(VerseDBResponse::from))
    }

    /// All live verses of the given songs, keyed by song id and sorted by order.
    /// Songs without verses are absent from the map.
    #[instrument(skip(self, song_ids), fields(count = song_ids.len()), err)]
    pub async fn list_for_songs_bulk(&mut self, song_ids: &[SongId]) -> Result<HashMap<SongId, Vec<VerseDBResponse>>> {
        if song_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let verses = sqlx::query_as::<_, Verse>(&format!(
            r#"
            SELECT {VERSE_COLUMNS} FROM verses
            WHERE song_id = ANY($1) AND deleted_at IS NULL
            ORDER BY song_id, "order", id
            "#
        ))
        .bind(song_ids)
        .fetch_all(&mut *self.db)
        .await?;

        let mut result: HashMap<SongId, Vec<VerseDBResponse>> = HashMap::new();
        for verse in verses {
            result.entry(verse.song_id).or_default().push(VerseDBResponse::from(verse));
        }

        Ok(result)
    }

    /// Soft-delete every verse of a song, returning how many were removed
    #[instrument(skip(self), err)]
    pub async fn delete_for_song(&mut self, song_id: SongId) -> Result<u64> {
        let result = sqlx::query("UPDATE verses SET deleted_at = NOW() WHERE song_id = $1 AND deleted_at IS NULL")
            .bind(song_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
