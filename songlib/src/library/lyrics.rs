//! Paginated verses of one song.

use super::Library;
use crate::api::models::pagination::PageRequest;
use crate::api::models::songs::{LyricsQuery, VerseResponse};
use crate::db::handlers::{Repository, Songs, Verses, verses::VerseFilter};
use crate::errors::{Error, Result};
use crate::types::SongId;
use tracing::instrument;

/// Verses per page when the client asks for `limit=0`
pub const DEFAULT_LYRICS_LIMIT: i64 = 5;

fn required_integer(name: &str, raw: Option<&str>) -> Result<i64> {
    let raw = raw.ok_or_else(|| Error::validation(format!("{name} is required")))?;
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::validation(format!("{name} must be an integer, got {raw:?}")))
}

impl LyricsQuery {
    /// Both parameters are required integers; `limit=0` means [`DEFAULT_LYRICS_LIMIT`].
    pub fn resolve(&self) -> Result<PageRequest> {
        let page = required_integer("page", self.page.as_deref())?;
        let limit = required_integer("limit", self.limit.as_deref())?;

        if page < 1 {
            return Err(Error::validation(format!("page must be at least 1, got {page}")));
        }
        if limit < 0 {
            return Err(Error::validation(format!("limit must not be negative, got {limit}")));
        }

        let limit = if limit == 0 { DEFAULT_LYRICS_LIMIT } else { limit };
        Ok(PageRequest { page, limit })
    }
}

impl Library {
    /// Verses of a song in display order, one page at a time
    #[instrument(skip(self, query), err)]
    pub async fn lyrics_page(&self, song_id: SongId, query: &LyricsQuery) -> Result<Vec<VerseResponse>> {
        let page = query.resolve()?;

        let mut conn = self.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

        if Songs::new(&mut conn).get_by_id(song_id).await?.is_none() {
            return Err(Error::song_not_found(song_id));
        }

        let verses = Verses::new(&mut conn)
            .list(&VerseFilter::new(song_id, page.skip(), page.limit))
            .await?;

        Ok(verses.into_iter().map(VerseResponse::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StaticLookup, create_test_library, new_song};
    use sqlx::PgPool;
    use std::sync::Arc;

    fn query(page: Option<&str>, limit: Option<&str>) -> LyricsQuery {
        LyricsQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn test_resolve() {
        assert_eq!(query(Some("2"), Some("3")).resolve().unwrap(), PageRequest { page: 2, limit: 3 });
        assert_eq!(
            query(Some("1"), Some("0")).resolve().unwrap(),
            PageRequest {
                page: 1,
                limit: DEFAULT_LYRICS_LIMIT
            }
        );
    }

    #[test]
    fn test_resolve_rejects_missing_or_malformed() {
        for q in [
            query(None, Some("5")),
            query(Some("1"), None),
            query(Some("one"), Some("5")),
            query(Some("1"), Some("5.5")),
            query(Some("0"), Some("5")),
            query(Some("1"), Some("-1")),
        ] {
            assert!(matches!(q.resolve(), Err(Error::Validation { .. })), "accepted {q:?}");
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_lyrics_pages(pool: PgPool) {
        let text = (1..=7).map(|i| format!("verse {i}")).collect::<Vec<_>>().join("\n\n");
        let lookup = Arc::new(StaticLookup::new().with_song("Muse", "Uprising", &text));
        let library = create_test_library(pool, lookup);
        let song = library.ingest(&new_song("Muse", "Uprising")).await.unwrap();

        let first = library.lyrics_page(song.id, &query(Some("1"), Some("0"))).await.unwrap();
        assert_eq!(first.iter().map(|v| v.order).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);

        let second = library.lyrics_page(song.id, &query(Some("2"), Some("5"))).await.unwrap();
        assert_eq!(second.iter().map(|v| v.verse.as_str()).collect::<Vec<_>>(), vec!["verse 6", "verse 7"]);

        let beyond = library.lyrics_page(song.id, &query(Some("4"), Some("5"))).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_song_is_not_found(pool: PgPool) {
        let library = create_test_library(pool, Arc::new(StaticLookup::new()));

        let err = library.lyrics_page(404, &query(Some("1"), Some("5"))).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "got {err:?}");

        // validation runs first
        let err = library.lyrics_page(404, &query(None, Some("5"))).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }), "got {err:?}");
    }
}
