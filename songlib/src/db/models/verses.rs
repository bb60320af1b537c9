//! Database models for verses.

use crate::types::{SongId, VerseId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database request for creating a verse
#[derive(Debug, Clone)]
pub struct VerseCreateDBRequest {
    pub song_id: SongId,
    pub text: String,
    pub order: i32,
}

/// Database request for rewriting a verse in place
#[derive(Debug, Clone)]
pub struct VerseUpdateDBRequest {
    pub text: String,
    pub order: i32,
}

/// Database response for a verse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerseDBResponse {
    pub id: VerseId,
    pub song_id: SongId,
    pub text: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
