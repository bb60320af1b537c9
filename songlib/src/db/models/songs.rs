//! Database models for songs.

use crate::types::{GroupId, SongId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database request for creating a new song
#[derive(Debug, Clone)]
pub struct SongCreateDBRequest {
    pub group_id: GroupId,
    pub title: String,
    pub release_date: String,
    pub link: String,
}

/// Database request for replacing the scalar fields of a song
#[derive(Debug, Clone)]
pub struct SongUpdateDBRequest {
    pub group_id: GroupId,
    pub title: String,
    pub release_date: String,
    pub link: String,
}

/// Database response for a song. Verses are fetched separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SongDBResponse {
    pub id: SongId,
    pub group_id: GroupId,
    pub group_name: String,
    pub title: String,
    pub release_date: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
