//! Repository for group settings data access operations.

use crate::entities::{CreateGroupRequest, Group, UpdateGroupRequest};
use crate::types::{StoreError, StoreResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for group settings database operations
pub struct GroupRepository {
    pool: SqlitePool,
}

impl GroupRepository {
    /// Create a new group repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> StoreResult<Group> {
        Ok(Group {
            id: row
                .try_get("id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            conversation_id: row
                .try_get("conversation_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            name: row
                .try_get("name")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            description: row
                .try_get("description")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            avatar_url: row
                .try_get("avatar_url")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            updated_at: row
                .try_get("updated_at")
                .map_err(|e| StoreError::Database(e.to_string()))?,
        })
    }

    /// Create the settings row for a group conversation
    pub async fn create(
        &self,
        conversation_id: i64,
        request: &CreateGroupRequest,
    ) -> StoreResult<Group> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO groups (conversation_id, name, description, avatar_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.avatar_url)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let group_id = result.last_insert_rowid();

        info!(
            group_id = group_id,
            conversation_id = conversation_id,
            name = %request.name,
            "created group settings"
        );

        Ok(Group {
            id: group_id,
            conversation_id,
            name: request.name.clone(),
            description: request.description.clone(),
            avatar_url: request.avatar_url.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Find the settings row for a conversation
    pub async fn find_by_conversation(&self, conversation_id: i64) -> StoreResult<Option<Group>> {
        let row = sqlx::query(
            "SELECT id, conversation_id, name, description, avatar_url, created_at, updated_at
             FROM groups WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Update group settings fields that are present in the request
    pub async fn update(
        &self,
        conversation_id: i64,
        request: &UpdateGroupRequest,
    ) -> StoreResult<Group> {
        let existing = self.find_by_conversation(conversation_id).await?;
        if existing.is_none() {
            return Err(StoreError::GroupNotFound);
        }

        let mut update_fields = Vec::new();
        let mut values = Vec::new();

        if let Some(name) = &request.name {
            update_fields.push("name = ?");
            values.push(name.clone());
        }

        if let Some(description) = &request.description {
            update_fields.push("description = ?");
            values.push(description.clone());
        }

        if let Some(avatar_url) = &request.avatar_url {
            update_fields.push("avatar_url = ?");
            values.push(avatar_url.clone());
        }

        if update_fields.is_empty() {
            return Ok(existing.unwrap());
        }

        let now = chrono::Utc::now().to_rfc3339();
        update_fields.push("updated_at = ?");
        values.push(now);

        let query = format!(
            "UPDATE groups SET {} WHERE conversation_id = ?",
            update_fields.join(", ")
        );

        let mut query_builder = sqlx::query(&query);
        for value in &values {
            query_builder = query_builder.bind(value);
        }
        query_builder = query_builder.bind(conversation_id);

        query_builder
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(conversation_id = conversation_id, "updated group settings");

        let updated = self.find_by_conversation(conversation_id).await?;
        updated.ok_or(StoreError::GroupNotFound)
    }
}
