//! Repository implementations for database access.
//!
//! Each repository wraps a borrowed [`sqlx::PgConnection`], so the same type works on a pooled
//! connection or inside a transaction:
//!
//! ```ignore
//! use songlib::db::handlers::{songs::SongFilter, Groups, Repository, Songs};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!
//!     let group = Groups::new(&mut tx).resolve("Muse").await?;
//!     let songs = Songs::new(&mut tx).list(&SongFilter::new(0, 10).with_group_name("muse")).await?;
//!
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```
//!
//! - [`Groups`]: group lookup and get-or-create
//! - [`Songs`]: song CRUD, filtered listing and soft delete
//! - [`Verses`]: ordered verse storage per song

pub mod groups;
pub mod repository;
pub mod songs;
pub mod verses;

pub use groups::Groups;
pub use repository::Repository;
pub use songs::Songs;
pub use verses::Verses;
