//! Song library workflows.
//!
//! [`Library`] owns the database pool and the song-info lookup client and exposes one method per
//! workflow:
//!
//! - [`Library::ingest`]: add a song, fetching its details from the lookup service
//! - [`Library::list`]: filtered, paginated song listing
//! - [`Library::lyrics_page`]: paginated verses of one song
//! - [`Library::edit`]: rewrite a song and some of its verses
//! - [`Library::delete`]: remove a song with its verses
//!
//! Every request struct is validated before any database or network access. Workflows that write
//! open a single transaction and commit it once at the end; returning early drops the transaction,
//! which rolls it back.

mod edit;
mod ingest;
mod lyrics;
mod query;
mod remove;

use crate::errors::{Error, Result};
use crate::lookup::SongInfoLookup;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Arc;

/// Longest accepted group name, in characters
pub const MAX_GROUP_NAME_CHARS: usize = 60;

/// Longest accepted song title, in characters
pub const MAX_TITLE_CHARS: usize = 100;

/// Release dates are stored and compared as `dd.MM.yyyy` text
pub const RELEASE_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Clone)]
pub struct Library {
    db: PgPool,
    lookup: Arc<dyn SongInfoLookup>,
}

impl Library {
    pub fn new(db: PgPool, lookup: Arc<dyn SongInfoLookup>) -> Self {
        Self { db, lookup }
    }
}

/// Non-empty and at most `max` characters
fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len == 0 {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    if len > max {
        return Err(Error::validation(format!("{field} must be at most {max} characters, got {len}")));
    }
    Ok(())
}

/// Exactly ten characters in `dd.MM.yyyy` form, naming a real calendar day
fn check_release_date(field: &str, value: &str) -> Result<()> {
    let well_formed = value.len() == 10 && NaiveDate::parse_from_str(value, RELEASE_DATE_FORMAT).is_ok();
    if !well_formed {
        return Err(Error::validation(format!("{field} must be a date in dd.MM.yyyy format, got {value:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_length_counts_characters() {
        assert!(check_length("group", "Muse", MAX_GROUP_NAME_CHARS).is_ok());
        assert!(check_length("group", "", MAX_GROUP_NAME_CHARS).is_err());

        // 60 two-byte characters fit, 61 do not
        assert!(check_length("group", &"Ж".repeat(60), MAX_GROUP_NAME_CHARS).is_ok());
        assert!(check_length("group", &"Ж".repeat(61), MAX_GROUP_NAME_CHARS).is_err());
    }

    #[test]
    fn test_check_release_date() {
        assert!(check_release_date("release_date", "16.07.2006").is_ok());
        assert!(check_release_date("release_date", "29.02.2024").is_ok());

        assert!(check_release_date("release_date", "2006-07-16").is_err());
        assert!(check_release_date("release_date", "16.7.2006").is_err());
        assert!(check_release_date("release_date", "31.02.2006").is_err());
        assert!(check_release_date("release_date", "").is_err());
    }
}
