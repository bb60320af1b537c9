//! Database layer for data persistence and access.
//!
//! ```text
//! ┌─────────────┐
//! │  Workflows  │  (crate::library)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models)
//! └──────┬──────┘
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! Multi-step writes (ingesting a song with its verses, editing, deleting) open a transaction
//! and build every repository from it, so either all rows change or none do.
//!
//! Migrations live in `migrations/` and are applied through [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
