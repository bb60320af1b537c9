//! Editing a song and its verses.

use super::{Library, MAX_GROUP_NAME_CHARS, MAX_TITLE_CHARS, check_length, check_release_date};
use crate::api::models::songs::{SongEdit, SongResponse};
use crate::db::errors::DbError;
use crate::db::handlers::{Groups, Repository, Songs, Verses};
use crate::db::models::{songs::SongUpdateDBRequest, verses::VerseUpdateDBRequest};
use crate::errors::{Error, Result};
use crate::types::SongId;
use tracing::instrument;

impl SongEdit {
    pub fn validate(&self) -> Result<()> {
        check_length("title", &self.title, MAX_TITLE_CHARS)?;
        check_length("group_name", &self.group_name, MAX_GROUP_NAME_CHARS)?;
        if !self.release_date.is_empty() {
            check_release_date("release_date", &self.release_date)?;
        }

        for verse in &self.lyrics {
            if verse.verse.is_empty() {
                return Err(Error::validation(format!("verse {} must not be empty", verse.id)));
            }
            if verse.order < 1 {
                return Err(Error::validation(format!(
                    "verse {} order must be at least 1, got {}",
                    verse.id, verse.order
                )));
            }
        }
        Ok(())
    }
}

impl Library {
    /// Replace a song's fields and group, and rewrite the listed verses in place.
    ///
    /// Everything happens in one transaction: an unknown verse id, or any other failure, leaves
    /// the song exactly as it was.
    #[instrument(skip(self, edit), fields(title = %edit.title, group = %edit.group_name, verses = edit.lyrics.len()), err)]
    pub async fn edit(&self, song_id: SongId, edit: &SongEdit) -> Result<SongResponse> {
        edit.validate()?;

        let mut tx = self.db.begin().await.map_err(|e| Error::Database(e.into()))?;

        if Songs::new(&mut tx).get_by_id(song_id).await?.is_none() {
            return Err(Error::song_not_found(song_id));
        }

        let group = Groups::new(&mut tx).resolve(&edit.group_name).await?;

        let song = Songs::new(&mut tx)
            .update(
                song_id,
                &SongUpdateDBRequest {
                    group_id: group.id,
                    title: edit.title.clone(),
                    release_date: edit.release_date.clone(),
                    link: edit.link.clone(),
                },
            )
            .await?;

        for verse in &edit.lyrics {
            let mut verses = Verses::new(&mut tx);
            if verses.get_for_song(song_id, verse.id).await?.is_none() {
                return Err(Error::NotFound {
                    resource: "Verse".to_string(),
                    id: verse.id.to_string(),
                });
            }
            verses
                .update(
                    verse.id,
                    &VerseUpdateDBRequest {
                        text: verse.verse.clone(),
                        order: verse.order,
                    },
                )
                .await?;
        }

        let verses = Verses::new(&mut tx)
            .list_for_songs_bulk(&[song_id])
            .await?
            .remove(&song_id)
            .unwrap_or_default();

        // verse order uniqueness is checked here, at commit
        tx.commit().await.map_err(|e| Error::Transaction(DbError::from(e)))?;

        tracing::info!(song_id, group_id = group.id, "Song updated");
        Ok(SongResponse::from_db(song, verses))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::models::songs::{SongEdit, SongQuery, SongResponse, VerseEdit};
    use crate::errors::Error;
    use crate::library::Library;
    use crate::test_utils::{StaticLookup, create_test_library, new_song};
    use axum::http::StatusCode;
    use sqlx::PgPool;
    use std::sync::Arc;

    async fn setup(pool: &PgPool) -> (Library, SongResponse) {
        let lookup = Arc::new(
            StaticLookup::new()
                .with_song("Linkin Park", "Numb", "Verse one\n\nVerse two")
                .with_song("Linkin Park", "Faint", "Faint verse"),
        );
        let library = create_test_library(pool.clone(), lookup);
        let song = library.ingest(&new_song("Linkin Park", "Numb")).await.unwrap();
        (library, song)
    }

    fn edit_of(song: &SongResponse) -> SongEdit {
        SongEdit {
            title: song.title.clone(),
            release_date: song.release_date.clone(),
            link: song.link.clone(),
            group_name: song.group_name.clone(),
            lyrics: Vec::new(),
        }
    }

    async fn stored(library: &Library, id: i64) -> SongResponse {
        let page = library.list(&SongQuery::default()).await.unwrap();
        page.data.into_iter().find(|s| s.id == id).expect("song should be listed")
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_edit_fields_and_verses(pool: PgPool) {
        let (library, song) = setup(&pool).await;

        let mut edit = edit_of(&song);
        edit.title = "Numb (Live)".to_string();
        edit.release_date = "25.03.2003".to_string();
        edit.link = "https://example.com/numb".to_string();
        edit.lyrics = vec![VerseEdit {
            id: song.lyrics[1].id,
            verse: "Second verse, rewritten".to_string(),
            order: 2,
        }];

        let updated = library.edit(song.id, &edit).await.unwrap();

        assert_eq!(updated.id, song.id);
        assert_eq!(updated.title, "Numb (Live)");
        assert_eq!(updated.release_date, "25.03.2003");
        assert_eq!(updated.link, "https://example.com/numb");
        assert_eq!(updated.group_id, song.group_id);
        assert_eq!(updated.lyrics.len(), 2);
        assert_eq!(updated.lyrics[0].verse, "Verse one");
        assert_eq!(updated.lyrics[1].verse, "Second verse, rewritten");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_edit_to_new_group_creates_it(pool: PgPool) {
        let (library, song) = setup(&pool).await;

        let mut edit = edit_of(&song);
        edit.group_name = "Linkin Park & Jay-Z".to_string();

        let updated = library.edit(song.id, &edit).await.unwrap();
        assert_ne!(updated.group_id, song.group_id);
        assert_eq!(updated.group_name, "Linkin Park & Jay-Z");

        let groups: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups").fetch_one(&pool).await.unwrap();
        assert_eq!(groups, 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_verse_rolls_back_everything(pool: PgPool) {
        let (library, song) = setup(&pool).await;

        let mut edit = edit_of(&song);
        edit.title = "Renamed".to_string();
        edit.group_name = "Brand New Group".to_string();
        edit.lyrics = vec![
            VerseEdit {
                id: song.lyrics[0].id,
                verse: "changed".to_string(),
                order: 1,
            },
            VerseEdit {
                id: 987_654,
                verse: "ghost".to_string(),
                order: 3,
            },
        ];

        let err = library.edit(song.id, &edit).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref resource, .. } if resource == "Verse"), "got {err:?}");

        let after = stored(&library, song.id).await;
        assert_eq!(after.title, "Numb");
        assert_eq!(after.group_id, song.group_id);
        assert_eq!(after.lyrics[0].verse, "Verse one");

        let groups: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups").fetch_one(&pool).await.unwrap();
        assert_eq!(groups, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_verse_of_another_song_is_rejected(pool: PgPool) {
        let (library, numb) = setup(&pool).await;
        let faint = library.ingest(&new_song("Linkin Park", "Faint")).await.unwrap();

        let mut edit = edit_of(&numb);
        edit.lyrics = vec![VerseEdit {
            id: faint.lyrics[0].id,
            verse: "stolen".to_string(),
            order: 1,
        }];

        let err = library.edit(numb.id, &edit).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "got {err:?}");

        let faint_after = stored(&library, faint.id).await;
        assert_eq!(faint_after.lyrics[0].verse, "Faint verse");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_swapping_verse_orders(pool: PgPool) {
        let (library, song) = setup(&pool).await;

        let mut edit = edit_of(&song);
        edit.lyrics = vec![
            VerseEdit {
                id: song.lyrics[0].id,
                verse: "Verse one".to_string(),
                order: 2,
            },
            VerseEdit {
                id: song.lyrics[1].id,
                verse: "Verse two".to_string(),
                order: 1,
            },
        ];

        let updated = library.edit(song.id, &edit).await.unwrap();
        let texts: Vec<&str> = updated.lyrics.iter().map(|v| v.verse.as_str()).collect();
        assert_eq!(texts, vec!["Verse two", "Verse one"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_verse_order_fails_at_commit(pool: PgPool) {
        let (library, song) = setup(&pool).await;

        let mut edit = edit_of(&song);
        edit.title = "Renamed".to_string();
        edit.lyrics = vec![VerseEdit {
            id: song.lyrics[1].id,
            verse: "Verse two".to_string(),
            order: 1,
        }];

        let err = library.edit(song.id, &edit).await.unwrap_err();
        assert!(matches!(err, Error::Transaction(_)), "got {err:?}");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        assert_eq!(stored(&library, song.id).await.title, "Numb");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_edit_validation_and_missing_song(pool: PgPool) {
        let (library, song) = setup(&pool).await;

        let mut edit = edit_of(&song);
        edit.release_date = "2003/03/25".to_string();
        assert!(matches!(library.edit(song.id, &edit).await, Err(Error::Validation { .. })));

        let mut edit = edit_of(&song);
        edit.lyrics = vec![VerseEdit {
            id: song.lyrics[0].id,
            verse: String::new(),
            order: 1,
        }];
        assert!(matches!(library.edit(song.id, &edit).await, Err(Error::Validation { .. })));

        let mut edit = edit_of(&song);
        edit.group_name = String::new();
        assert!(matches!(library.edit(song.id, &edit).await, Err(Error::Validation { .. })));

        let err = library.edit(song.id + 1000, &edit_of(&song)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "got {err:?}");
    }
}
