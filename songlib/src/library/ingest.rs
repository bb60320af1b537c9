//! Adding a song to the library.

use super::{Library, MAX_GROUP_NAME_CHARS, MAX_TITLE_CHARS, check_length, check_release_date};
use crate::api::models::songs::{NewSong, SongResponse};
use crate::db::errors::DbError;
use crate::db::handlers::{Groups, Repository, Songs, Verses};
use crate::db::models::{songs::SongCreateDBRequest, verses::VerseCreateDBRequest};
use crate::errors::{Error, Result};
use crate::types::abbrev_text;
use crate::verses::split_into_verses;
use tracing::instrument;

impl NewSong {
    pub fn validate(&self) -> Result<()> {
        check_length("group", &self.group, MAX_GROUP_NAME_CHARS)?;
        check_length("song", &self.song, MAX_TITLE_CHARS)?;
        Ok(())
    }
}

fn song_exists() -> Error {
    Error::Conflict {
        message: "song already exists".to_string(),
    }
}

impl Library {
    /// Add a song: resolve its group, refuse duplicates, fetch details from the lookup service and
    /// store the song with one verse per blank-line separated segment of the lyrics.
    ///
    /// The group is committed on its own, before the lookup call. The song and its verses are
    /// written in one transaction.
    #[instrument(skip(self, request), fields(group = %request.group, song = %request.song), err)]
    pub async fn ingest(&self, request: &NewSong) -> Result<SongResponse> {
        request.validate()?;

        let mut conn = self.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let group = Groups::new(&mut conn).resolve(&request.group).await.map_err(|e| match e {
            // another request created the same group between our lookup and insert
            DbError::UniqueViolation { .. } => Error::Conflict {
                message: format!("group {:?} was created concurrently, retry the request", request.group),
            },
            other => Error::Database(other),
        })?;

        if Songs::new(&mut conn).get_by_title(group.id, &request.song).await?.is_some() {
            return Err(song_exists());
        }
        drop(conn);

        let detail = self.lookup.fetch(&request.group, &request.song).await?;
        tracing::debug!(
            release_date = %detail.release_date,
            text = %abbrev_text(&detail.text),
            "Fetched song details"
        );
        check_release_date("lookup releaseDate", &detail.release_date).map_err(|e| Error::Validation {
            message: format!("Lookup service returned an unexpected response: {e}"),
        })?;

        let segments = split_into_verses(&detail.text);

        let mut tx = self.db.begin().await.map_err(|e| Error::Transaction(e.into()))?;

        let song = Songs::new(&mut tx)
            .create(&SongCreateDBRequest {
                group_id: group.id,
                title: request.song.clone(),
                release_date: detail.release_date.clone(),
                link: detail.link.clone(),
            })
            .await
            .map_err(|e| if e.is_unique_violation() { song_exists() } else { Error::Transaction(e) })?;

        let verse_requests = segments
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let order = i32::try_from(i + 1).map_err(|_| Error::validation("lyrics have too many verses"))?;
                Ok(VerseCreateDBRequest {
                    song_id: song.id,
                    text: text.to_string(),
                    order,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let verses = Verses::new(&mut tx).create_bulk(&verse_requests).await.map_err(Error::Transaction)?;

        tx.commit().await.map_err(|e| {
            let e = DbError::from(e);
            if e.is_unique_violation() { song_exists() } else { Error::Transaction(e) }
        })?;

        tracing::info!(song_id = song.id, verses = verses.len(), "Song added");
        Ok(SongResponse::from_db(song, verses))
    }
}
