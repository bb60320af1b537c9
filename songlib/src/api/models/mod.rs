//! API request and response data models.
//!
//! These are distinct from the database models in [`crate::db::models`], so the wire format can
//! evolve independently of storage.
//!
//! - [`songs`]: songs, verses and the requests that create, filter and edit them
//! - [`pagination`]: page parameters and the paginated envelope

pub mod pagination;
pub mod songs;
