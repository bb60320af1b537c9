//! Database repository for songs.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::songs::{SongCreateDBRequest, SongDBResponse, SongUpdateDBRequest},
};
use crate::types::{GroupId, SongId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

/// Columns selected for every song read. Requires `songs s` joined with `groups g`.
const SONG_COLUMNS: &str = "s.id, s.group_id, g.name AS group_name, s.title, s.release_date, s.link, s.created_at, s.updated_at";

/// Filter for listing songs
///
/// String filters are case-insensitive substring matches; `release_date` is matched exactly.
/// All present filters are combined with AND.
#[derive(Debug, Clone, Default)]
pub struct SongFilter {
    pub skip: i64,
    pub limit: i64,
    pub group_name: Option<String>,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub link: Option<String>,
    /// Substring that must appear in at least one live verse of the song
    pub lyrics: Option<String>,
}

impl SongFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_group_name(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_release_date(mut self, release_date: impl Into<String>) -> Self {
        self.release_date = Some(release_date.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_lyrics(mut self, lyrics: impl Into<String>) -> Self {
        self.lyrics = Some(lyrics.into());
        self
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Song {
    pub id: SongId,
    pub group_id: GroupId,
    pub group_name: String,
    pub title: String,
    pub release_date: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Song> for SongDBResponse {
    fn from(song: Song) -> Self {
        Self {
            id: song.id,
            group_id: song.group_id,
            group_name: song.group_name,
            title: song.title,
            release_date: song.release_date,
            link: song.link,
            created_at: song.created_at,
            updated_at: song.updated_at,
        }
    }
}

pub struct Songs<'c> {
    db: &'c mut PgConnection,
}

/// Escape LIKE wildcards so user input only ever matches literally
fn like_pattern(value: &str) -> String {
    let escaped = value.to_lowercase().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

/// Append the WHERE conditions of `filter` to a query selecting from `songs s JOIN groups g`.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &SongFilter) {
    if let Some(group_name) = filter.group_name.as_deref() {
        query.push(" AND LOWER(g.name) LIKE ");
        query.push_bind(like_pattern(group_name));
    }
    if let Some(title) = filter.title.as_deref() {
        query.push(" AND LOWER(s.title) LIKE ");
        query.push_bind(like_pattern(title));
    }
    if let Some(release_date) = filter.release_date.as_deref() {
        query.push(" AND s.release_date = ");
        query.push_bind(release_date.to_string());
    }
    if let Some(link) = filter.link.as_deref() {
        query.push(" AND LOWER(s.link) LIKE ");
        query.push_bind(like_pattern(link));
    }
    if let Some(lyrics) = filter.lyrics.as_deref() {
        query.push(" AND EXISTS (SELECT 1 FROM verses v WHERE v.song_id = s.id AND v.deleted_at IS NULL AND LOWER(v.text) LIKE ");
        query.push_bind(like_pattern(lyrics));
        query.push(")");
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Songs<'c> {
    type CreateRequest = SongCreateDBRequest;
    type UpdateRequest = SongUpdateDBRequest;
    type Response = SongDBResponse;
    type Id = SongId;
    type Filter = SongFilter;

    #[instrument(skip(self, request), fields(group_id = request.group_id, title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let song = sqlx::query_as::<_, Song>(&format!(
            r#"
            WITH s AS (
                INSERT INTO songs (group_id, title, release_date, link)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT {SONG_COLUMNS} FROM s JOIN groups g ON g.id = s.group_id
            "#
        ))
        .bind(request.group_id)
        .bind(&request.title)
        .bind(&request.release_date)
        .bind(&request.link)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(SongDBResponse::from(song))
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let song = sqlx::query_as::<_, Song>(&format!(
            "SELECT {SONG_COLUMNS} FROM songs s JOIN groups g ON g.id = s.group_id WHERE s.id = $1 AND s.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(song.map(SongDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::new(format!(
            "SELECT {SONG_COLUMNS} FROM songs s JOIN groups g ON g.id = s.group_id WHERE s.deleted_at IS NULL"
        ));
        push_filters(&mut query, filter);

        query.push(" ORDER BY s.id LIMIT ");
        query.push_bind(filter.limit);
        query.push(" OFFSET ");
        query.push_bind(filter.skip);

        tracing::debug!("Executing SQL: {}", query.sql());

        let songs = query.build_query_as::<Song>().fetch_all(&mut *self.db).await?;

        tracing::debug!("Retrieved {} songs", songs.len());

        Ok(songs.into_iter().map(SongDBResponse::from).collect())
    }

    #[instrument(skip(self, request), fields(group_id = request.group_id, title = %request.title), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let song = sqlx::query_as::<_, Song>(&format!(
            r#"
            WITH s AS (
                UPDATE songs SET
                    group_id = $2,
                    title = $3,
                    release_date = $4,
                    link = $5
                WHERE id = $1 AND deleted_at IS NULL
                RETURNING *
            )
            SELECT {SONG_COLUMNS} FROM s JOIN groups g ON g.id = s.group_id
            "#
        ))
        .bind(id)
        .bind(request.group_id)
        .bind(&request.title)
        .bind(&request.release_date)
        .bind(&request.link)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(SongDBResponse::from(song))
    }
}

impl<'c> Songs<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Total number of songs matching `filter`, ignoring its skip and limit
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &SongFilter) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM songs s JOIN groups g ON g.id = s.group_id WHERE s.deleted_at IS NULL");
        push_filters(&mut query, filter);

        let count: i64 = query.build_query_scalar().fetch_one(&mut *self.db).await?;

        Ok(count)
    }

    /// Find the live song with exactly this title in the given group
    #[instrument(skip(self), err)]
    pub async fn get_by_title(&mut self, group_id: GroupId, title: &str) -> Result<Option<SongDBResponse>> {
        let song = sqlx::query_as::<_, Song>(&format!(
            "SELECT {SONG_COLUMNS} FROM songs s JOIN groups g ON g.id = s.group_id \
             WHERE s.group_id = $1 AND s.title = $2 AND s.deleted_at IS NULL"
        ))
        .bind(group_id)
        .bind(title)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(song.map(SongDBResponse::from))
    }

    /// Soft-delete a song. Returns false when no live song has this id.
    #[instrument(skip(self), err)]
    pub async fn delete(&mut self, id: SongId) -> Result<bool> {
        let result = sqlx::query("UPDATE songs SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Groups;
    use crate::db::models::groups::GroupCreateDBRequest;
    use sqlx::PgPool;

    async fn create_group(pool: &PgPool, name: &str) -> GroupId {
        let mut conn = pool.acquire().await.unwrap();
        Groups::new(&mut conn).create(&GroupCreateDBRequest::new(name)).await.unwrap().id
    }

    fn song_request(group_id: GroupId, title: &str) -> SongCreateDBRequest {
        SongCreateDBRequest {
            group_id,
            title: title.to_string(),
            release_date: "16.07.2006".to_string(),
            link: format!("https://www.youtube.com/watch?v={}", title.replace(' ', "_")),
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Numb"), "%numb%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_get_song(pool: PgPool) {
        let group_id = create_group(&pool, "Linkin Park").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Songs::new(&mut conn);

        let created = repo.create(&song_request(group_id, "Numb")).await.unwrap();
        assert_eq!(created.group_id, group_id);
        assert_eq!(created.group_name, "Linkin Park");
        assert_eq!(created.title, "Numb");
        assert_eq!(created.release_date, "16.07.2006");

        let fetched = repo.get_by_id(created.id).await.unwrap().expect("song should exist");
        assert_eq!(fetched, created);

        let by_title = repo.get_by_title(group_id, "Numb").await.unwrap().expect("song should exist");
        assert_eq!(by_title.id, created.id);
        assert!(repo.get_by_title(group_id, "numb").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_title_in_group_is_rejected(pool: PgPool) {
        let group_id = create_group(&pool, "Linkin Park").await;
        let other_group = create_group(&pool, "Numb Tribute Band").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Songs::new(&mut conn);

        repo.create(&song_request(group_id, "Numb")).await.unwrap();
        let err = repo.create(&song_request(group_id, "Numb")).await.unwrap_err();
        assert!(err.is_unique_violation());

        // Same title in a different group is fine
        repo.create(&song_request(other_group, "Numb")).await.unwrap();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_group_is_foreign_key_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Songs::new(&mut conn);

        let err = repo.create(&song_request(9999, "Orphan")).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_song(pool: PgPool) {
        let group_id = create_group(&pool, "Linkin Park").await;
        let new_group = create_group(&pool, "Fort Minor").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Songs::new(&mut conn);

        let created = repo.create(&song_request(group_id, "Numb")).await.unwrap();
        let updated = repo
            .update(
                created.id,
                &SongUpdateDBRequest {
                    group_id: new_group,
                    title: "Remember the Name".to_string(),
                    release_date: "01.01.2005".to_string(),
                    link: "https://example.com/remember".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.group_id, new_group);
        assert_eq!(updated.group_name, "Fort Minor");
        assert_eq!(updated.title, "Remember the Name");
        assert_eq!(updated.release_date, "01.01.2005");
        assert!(updated.updated_at >= created.updated_at);

        let missing = repo
            .update(
                9999,
                &SongUpdateDBRequest {
                    group_id,
                    title: "Nope".to_string(),
                    release_date: String::new(),
                    link: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(missing, DbError::NotFound));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_soft_delete_hides_song_and_frees_title(pool: PgPool) {
        let group_id = create_group(&pool, "Linkin Park").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Songs::new(&mut conn);

        let created = repo.create(&song_request(group_id, "Numb")).await.unwrap();
        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());

        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert_eq!(repo.count(&SongFilter::new(0, 10)).await.unwrap(), 0);

        // The unique index only covers live songs
        let recreated = repo.create(&song_request(group_id, "Numb")).await.unwrap();
        assert_ne!(recreated.id, created.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_pagination_and_count(pool: PgPool) {
        let group_id = create_group(&pool, "Linkin Park").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Songs::new(&mut conn);

        let mut ids = Vec::new();
        for i in 1..=12 {
            ids.push(repo.create(&song_request(group_id, &format!("Song {i:02}"))).await.unwrap().id);
        }

        let page = repo.list(&SongFilter::new(5, 5)).await.unwrap();
        let page_ids: Vec<_> = page.iter().map(|s| s.id).collect();
        assert_eq!(page_ids, ids[5..10].to_vec());
        assert_eq!(repo.count(&SongFilter::new(5, 5)).await.unwrap(), 12);

        let last = repo.list(&SongFilter::new(10, 5)).await.unwrap();
        assert_eq!(last.len(), 2);

        let beyond = repo.list(&SongFilter::new(100, 5)).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters(pool: PgPool) {
        let linkin = create_group(&pool, "Linkin Park").await;
        let muse = create_group(&pool, "Muse").await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Songs::new(&mut conn);

        let numb = repo.create(&song_request(linkin, "Numb")).await.unwrap();
        repo.create(&song_request(linkin, "In the End")).await.unwrap();
        let mut hysteria = song_request(muse, "Hysteria");
        hysteria.release_date = "01.12.2003".to_string();
        let hysteria = repo.create(&hysteria).await.unwrap();

        let by_group = repo.list(&SongFilter::new(0, 10).with_group_name("LINKIN")).await.unwrap();
        assert_eq!(by_group.len(), 2);

        let by_title = repo.list(&SongFilter::new(0, 10).with_title("nUm")).await.unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].id, numb.id);

        let by_date = repo.list(&SongFilter::new(0, 10).with_release_date("01.12.2003")).await.unwrap();
        assert_eq!(by_date.len(), 1);
        assert_eq!(by_date[0].id, hysteria.id);

        let by_link = repo.list(&SongFilter::new(0, 10).with_link("watch?v=in_the")).await.unwrap();
        assert_eq!(by_link.len(), 1);

        let combined = SongFilter::new(0, 10).with_group_name("linkin").with_release_date("01.12.2003");
        assert!(repo.list(&combined).await.unwrap().is_empty());
        assert_eq!(repo.count(&combined).await.unwrap(), 0);

        // Wildcards in user input match literally
        assert!(repo.list(&SongFilter::new(0, 10).with_title("%")).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_lyrics_filter_does_not_duplicate_songs(pool: PgPool) {
        let group_id = create_group(&pool, "Linkin Park").await;
        let mut conn = pool.acquire().await.unwrap();
        let song_id = Songs::new(&mut conn).create(&song_request(group_id, "Numb")).await.unwrap().id;

        for (order, text) in [(1, "I'm tired of being what you want me to be"), (2, "Tired of feeling so faithless")] {
            sqlx::query("INSERT INTO verses (song_id, text, \"order\") VALUES ($1, $2, $3)")
                .bind(song_id)
                .bind(text)
                .bind(order)
                .execute(&mut *conn)
                .await
                .unwrap();
        }

        let mut repo = Songs::new(&mut conn);
        let filter = SongFilter::new(0, 10).with_lyrics("TIRED");
        let songs = repo.list(&filter).await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(repo.count(&filter).await.unwrap(), 1);

        assert!(repo.list(&SongFilter::new(0, 10).with_lyrics("faithful")).await.unwrap().is_empty());
    }
}
