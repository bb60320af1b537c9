//! Removing a song.

use super::Library;
use crate::db::handlers::{Repository, Songs, Verses};
use crate::errors::{Error, Result};
use crate::types::SongId;
use tracing::instrument;

impl Library {
    /// Soft-delete a song and all of its verses in one transaction. The group is kept.
    #[instrument(skip(self), err)]
    pub async fn delete(&self, song_id: SongId) -> Result<()> {
        let mut tx = self.db.begin().await.map_err(|e| Error::Transaction(e.into()))?;

        if Songs::new(&mut tx).get_by_id(song_id).await?.is_none() {
            return Err(Error::song_not_found(song_id));
        }

        let verses = Verses::new(&mut tx).delete_for_song(song_id).await.map_err(Error::Transaction)?;
        if !Songs::new(&mut tx).delete(song_id).await.map_err(Error::Transaction)? {
            // deleted by a concurrent request since the check above
            return Err(Error::song_not_found(song_id));
        }

        tx.commit().await.map_err(|e| Error::Transaction(e.into()))?;

        tracing::info!(song_id, verses, "Song deleted");
        Ok(())
    }
}
