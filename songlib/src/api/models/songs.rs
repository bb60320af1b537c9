//! API request/response models for the song library.

use super::pagination::{PageParams, PaginatedResponse};
use crate::db::models::{songs::SongDBResponse, verses::VerseDBResponse};
use crate::types::{GroupId, SongId, VerseId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Request body for adding a song to the library.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewSong {
    /// Group (artist or band) name, 1-60 characters
    #[schema(example = "Fall Out Boy")]
    pub group: String,
    /// Song title, 1-100 characters
    #[schema(example = "Centuries")]
    pub song: String,
}

/// One verse of a song.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct VerseResponse {
    pub id: VerseId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub song_id: SongId,
    /// Verse text
    #[schema(example = "Some legends are told")]
    pub verse: String,
    /// Position of the verse in the song, starting at 1
    #[schema(example = 1)]
    pub order: i32,
}

impl From<VerseDBResponse> for VerseResponse {
    fn from(db: VerseDBResponse) -> Self {
        Self {
            id: db.id,
            created_at: db.created_at,
            updated_at: db.updated_at,
            song_id: db.song_id,
            verse: db.text,
            order: db.order,
        }
    }
}

/// Full song details, with verses in display order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SongResponse {
    pub id: SongId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub group_id: GroupId,
    #[schema(example = "Fall Out Boy")]
    pub group_name: String,
    #[schema(example = "Centuries")]
    pub title: String,
    /// `dd.MM.yyyy`
    #[schema(example = "01.01.2019")]
    pub release_date: String,
    #[schema(example = "https://www.youtube.com/watch?v=LBr7kECsjcQ")]
    pub link: String,
    pub lyrics: Vec<VerseResponse>,
}

impl SongResponse {
    pub fn from_db(song: SongDBResponse, verses: Vec<VerseDBResponse>) -> Self {
        Self {
            id: song.id,
            created_at: song.created_at,
            updated_at: song.updated_at,
            group_id: song.group_id,
            group_name: song.group_name,
            title: song.title,
            release_date: song.release_date,
            link: song.link,
            lyrics: verses.into_iter().map(VerseResponse::from).collect(),
        }
    }
}

/// A page of songs
pub type SongPage = PaginatedResponse<SongResponse>;

/// Query parameters for listing songs.
///
/// The camelCase names are canonical; the snake_case names (`group_name`, `song_title`,
/// `release_date`, `lyrics`) are accepted too.
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SongQuery {
    /// Case-insensitive substring of the group name
    #[serde(rename = "groupName", alias = "group_name")]
    pub group_name: Option<String>,
    /// Case-insensitive substring of the song title
    #[serde(rename = "songTitle", alias = "song_title")]
    pub song_title: Option<String>,
    /// Exact release date, `dd.MM.yyyy`
    #[serde(rename = "releaseDate", alias = "release_date")]
    #[param(example = "16.07.2006")]
    pub release_date: Option<String>,
    /// Case-insensitive substring of the link
    pub link: Option<String>,
    /// Case-insensitive substring of any verse
    #[serde(rename = "lyricsFragment", alias = "lyrics")]
    pub lyrics_fragment: Option<String>,

    #[serde(flatten)]
    #[param(inline)]
    pub pagination: PageParams,
}

/// Query parameters for reading a song's verses. Both are required.
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LyricsQuery {
    /// Page number, starting at 1
    #[param(value_type = i64, minimum = 1, example = 1)]
    #[schema(value_type = i64)]
    pub page: Option<String>,
    /// Verses per page; 0 means 5
    #[param(value_type = i64, minimum = 0, example = 5)]
    #[schema(value_type = i64)]
    pub limit: Option<String>,
}

/// Replacement for one existing verse.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerseEdit {
    /// Id of a verse that belongs to the edited song
    pub id: VerseId,
    /// New text, must not be empty
    pub verse: String,
    /// New position, starting at 1
    pub order: i32,
}

/// Request body for editing a song.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SongEdit {
    #[schema(example = "Centuries")]
    pub title: String,
    /// `dd.MM.yyyy`, or empty
    #[serde(default)]
    #[schema(example = "01.01.2019")]
    pub release_date: String,
    #[serde(default)]
    pub link: String,
    /// Target group; created when it does not exist yet
    #[schema(example = "Fall Out Boy")]
    pub group_name: String,
    /// Existing verses to rewrite. Verses not listed are left unchanged.
    #[serde(default)]
    pub lyrics: Vec<VerseEdit>,
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Song added")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
