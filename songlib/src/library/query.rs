//! Filtered, paginated song listing.

use super::{Library, check_release_date};
use crate::api::models::pagination::{PageRequest, PaginatedResponse};
use crate::api::models::songs::{SongPage, SongQuery, SongResponse};
use crate::db::handlers::{Repository, Songs, Verses, songs::SongFilter};
use crate::errors::{Error, Result};
use tracing::instrument;

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}

impl SongQuery {
    /// Turn the raw query into a repository filter and a page.
    ///
    /// Empty filters are ignored. A non-empty `releaseDate` must be a `dd.MM.yyyy` date.
    pub fn resolve(&self) -> Result<(SongFilter, PageRequest)> {
        let page = self.pagination.lenient();

        let release_date = non_empty(&self.release_date);
        if let Some(date) = &release_date {
            check_release_date("releaseDate", date)?;
        }

        let filter = SongFilter {
            skip: page.skip(),
            limit: page.limit,
            group_name: non_empty(&self.group_name),
            title: non_empty(&self.song_title),
            release_date,
            link: non_empty(&self.link),
            lyrics: non_empty(&self.lyrics_fragment),
        };

        Ok((filter, page))
    }
}

impl Library {
    /// One page of songs matching every given filter, ordered by id, each with its verses.
    #[instrument(skip(self, query), err)]
    pub async fn list(&self, query: &SongQuery) -> Result<SongPage> {
        let (filter, page) = query.resolve()?;

        let mut conn = self.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

        let total_count = Songs::new(&mut conn).count(&filter).await?;
        let songs = Songs::new(&mut conn).list(&filter).await?;

        let song_ids: Vec<_> = songs.iter().map(|s| s.id).collect();
        let mut verses = Verses::new(&mut conn).list_for_songs_bulk(&song_ids).await?;

        let data = songs
            .into_iter()
            .map(|song| {
                let song_verses = verses.remove(&song.id).unwrap_or_default();
                SongResponse::from_db(song, song_verses)
            })
            .collect();

        Ok(PaginatedResponse::new(data, total_count, page))
    }
}
