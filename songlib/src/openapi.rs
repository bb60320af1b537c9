//! OpenAPI documentation for the library API (`/api/v1/library/*`).
//!
//! The document is served as JSON at `/api/v1/openapi.json` and rendered with Scalar at
//! `/api/v1/docs`.

use utoipa::OpenApi;
use utoipa::openapi::server::Server;

use crate::Config;
use crate::api;
use crate::lookup::SongDetail;
use crate::problem_details::ProblemDetails;

pub const LIBRARY_PREFIX: &str = "/api/v1/library";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Song Library API",
        description = "A catalog of songs grouped by performer. Songs are added by name; release date, link and lyrics come from an external song-info service. Lyrics are stored as ordered verses that can be paged through and edited individually.",
    ),
    servers(
        (url = "/api/v1/library", description = "Library API server")
    ),
    paths(
        api::handlers::songs::add_song,
        api::handlers::songs::list_songs,
        api::handlers::songs::get_lyrics,
        api::handlers::songs::edit_song,
        api::handlers::songs::delete_song,
    ),
    components(
        schemas(
            api::models::songs::NewSong,
            api::models::songs::SongResponse,
            api::models::songs::VerseResponse,
            api::models::songs::SongEdit,
            api::models::songs::VerseEdit,
            api::models::songs::MessageResponse,
            ProblemDetails,
            SongDetail,
        )
    ),
    tags(
        (name = "songs", description = "Add, find, page through, edit and remove songs.

Every failed request answers with a problem body:

```json
{\"status_code\": 404, \"method\": \"GET\", \"time\": \"2024-11-23 18:04:11\", \"type\": \"/api/v1/library/songs/17/lyrics\", \"title\": \"Not found\", \"detail\": \"Song with ID 17 not found\"}
```"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// The document with an extra absolute server entry for the configured public host
    pub fn for_config(config: &Config) -> utoipa::openapi::OpenApi {
        let mut openapi = Self::openapi();
        let public = Server::builder()
            .url(format!("http://{}:{}{LIBRARY_PREFIX}", config.domain, config.port))
            .description(Some("Public address"))
            .build();
        openapi.servers.get_or_insert_with(Vec::new).push(public);
        openapi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = json["paths"].as_object().unwrap();

        for (path, method) in [
            ("/songs/add", "post"),
            ("/songs", "get"),
            ("/songs/{id}/lyrics", "get"),
            ("/songs/edit/{id}", "put"),
            ("/songs/delete/{id}", "delete"),
        ] {
            assert!(paths.get(path).and_then(|p| p.get(method)).is_some(), "missing {method} {path}");
        }
        assert!(json["components"]["schemas"].get("ProblemDetails").is_some());
    }

    #[test]
    fn test_public_server_uses_domain() {
        let config = Config {
            domain: "songs.example.com".to_string(),
            port: 9000,
            ..Default::default()
        };

        let servers = ApiDoc::for_config(&config).servers.unwrap();
        let urls: Vec<&str> = servers.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["/api/v1/library", "http://songs.example.com:9000/api/v1/library"]);
    }
}
