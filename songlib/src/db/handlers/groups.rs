//! Database repository for groups.

use crate::db::{
    errors::Result,
    models::groups::{GroupCreateDBRequest, GroupDBResponse},
};
use crate::types::GroupId;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Group {
    pub id: GroupId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Group> for GroupDBResponse {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

pub struct Groups<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Groups<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert a new group. A concurrent insert of the same name fails with
    /// [`DbError::UniqueViolation`](crate::db::errors::DbError::UniqueViolation).
    #[instrument(skip(self, request), fields(name = %request.name), err)]
    pub async fn create(&mut self, request: &GroupCreateDBRequest) -> Result<GroupDBResponse> {
        // created_at and updated_at use database DEFAULT NOW() for consistency
        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(&request.name)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(GroupDBResponse::from(group))
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: GroupId) -> Result<Option<GroupDBResponse>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, name, created_at, updated_at FROM groups WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(group.map(GroupDBResponse::from))
    }

    /// Exact, case-sensitive name match
    #[instrument(skip(self), err)]
    pub async fn get_by_name(&mut self, name: &str) -> Result<Option<GroupDBResponse>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, name, created_at, updated_at FROM groups WHERE name = $1 AND deleted_at IS NULL",
        )
        .bind(name)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(group.map(GroupDBResponse::from))
    }

    /// Look a group up by exact name and create it when absent.
    ///
    /// The insert is not guarded beyond the unique constraint on `groups.name`: when another
    /// transaction creates the same name first, the unique violation is returned to the caller.
    #[instrument(skip(self), err)]
    pub async fn resolve(&mut self, name: &str) -> Result<GroupDBResponse> {
        if let Some(group) = self.get_by_name(name).await? {
            tracing::debug!(group_id = group.id, "Group found");
            return Ok(group);
        }

        tracing::info!("Group not found, creating it");
        self.create(&GroupCreateDBRequest::new(name)).await
    }
}
