use crate::AppState;
use crate::api::models::pagination::PaginatedResponse;
use crate::api::models::songs::{LyricsQuery, MessageResponse, NewSong, SongEdit, SongPage, SongQuery, SongResponse, VerseResponse};
use crate::errors::{Error, Result};
use crate::problem_details::ProblemDetails;
use crate::types::SongId;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};

/// Song ids arrive as raw path segments so a malformed id becomes a validation problem.
fn parse_song_id(raw: &str) -> Result<SongId> {
    match raw.parse::<SongId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::validation(format!("song id must be a positive integer, got {raw:?}"))),
    }
}

fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Error::validation(rejection.body_text()))
}

#[utoipa::path(
    post,
    path = "/songs/add",
    tag = "songs",
    summary = "Add a song",
    description = "Looks the song up in the external song-info service, then stores it with one verse per blank-line separated segment of its lyrics. The group is created when it does not exist yet.",
    request_body = NewSong,
    responses(
        (status = 200, description = "Song added", body = MessageResponse),
        (status = 400, description = "Invalid request, or the lookup service rejected it", body = ProblemDetails),
        (status = 409, description = "The group already has a song with this title", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn add_song(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewSong>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let request = json_body(payload)?;
    state.library.ingest(&request).await?;
    Ok(Json(MessageResponse::new("Song added")))
}

#[utoipa::path(
    get,
    path = "/songs",
    tag = "songs",
    summary = "List songs",
    description = "Songs matching every given filter, ordered by id. Text filters are case-insensitive substring matches; empty filters are ignored. Malformed page parameters fall back to page 1 and 10 songs per page.",
    params(SongQuery),
    responses(
        (status = 200, description = "Page of songs with their verses", body = PaginatedResponse<SongResponse>),
        (status = 400, description = "Malformed release date", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_songs(State(state): State<AppState>, Query(query): Query<SongQuery>) -> Result<Json<SongPage>> {
    Ok(Json(state.library.list(&query).await?))
}

#[utoipa::path(
    get,
    path = "/songs/{id}/lyrics",
    tag = "songs",
    summary = "Get song lyrics",
    description = "One page of a song's verses in display order.",
    params(
        ("id" = i64, Path, description = "Song ID"),
        LyricsQuery,
    ),
    responses(
        (status = 200, description = "Verses of the requested page", body = Vec<VerseResponse>),
        (status = 400, description = "Missing or malformed page parameters", body = ProblemDetails),
        (status = 404, description = "Song not found", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails),
    )
)]
#[tracing::instrument(skip_all, fields(song_id = %id))]
pub async fn get_lyrics(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LyricsQuery>,
) -> Result<Json<Vec<VerseResponse>>> {
    let song_id = parse_song_id(&id)?;
    Ok(Json(state.library.lyrics_page(song_id, &query).await?))
}

#[utoipa::path(
    put,
    path = "/songs/edit/{id}",
    tag = "songs",
    summary = "Edit a song",
    description = "Replaces the song's title, release date, link and group, and rewrites the listed verses. Either everything is applied or nothing is.",
    params(
        ("id" = i64, Path, description = "Song ID"),
    ),
    request_body = SongEdit,
    responses(
        (status = 200, description = "Updated song", body = SongResponse),
        (status = 400, description = "Invalid request", body = ProblemDetails),
        (status = 404, description = "Song or verse not found", body = ProblemDetails),
        (status = 409, description = "Two verses would share an order", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails),
    )
)]
#[tracing::instrument(skip_all, fields(song_id = %id))]
pub async fn edit_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<SongEdit>, JsonRejection>,
) -> Result<Json<SongResponse>> {
    let song_id = parse_song_id(&id)?;
    let edit = json_body(payload)?;
    Ok(Json(state.library.edit(song_id, &edit).await?))
}

#[utoipa::path(
    delete,
    path = "/songs/delete/{id}",
    tag = "songs",
    summary = "Delete a song",
    description = "Removes the song and all of its verses. The group is kept.",
    params(
        ("id" = i64, Path, description = "Song ID"),
    ),
    responses(
        (status = 200, description = "Song deleted", body = MessageResponse),
        (status = 400, description = "Malformed song id", body = ProblemDetails),
        (status = 404, description = "Song not found", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails),
    )
)]
#[tracing::instrument(skip_all, fields(song_id = %id))]
pub async fn delete_song(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<MessageResponse>> {
    let song_id = parse_song_id(&id)?;
    state.library.delete(song_id).await?;
    Ok(Json(MessageResponse::new("Song and lyrics deleted")))
}
