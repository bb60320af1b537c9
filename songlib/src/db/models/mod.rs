//! Database record models matching table schemas.
//!
//! Request structs carry what a repository needs to write a row; `*DBResponse` structs are what
//! it hands back. They are kept separate from the API models in [`crate::api::models`] so storage
//! and wire representations can change independently.

pub mod groups;
pub mod songs;
pub mod verses;
