//! SQLite-Implementierung des RoleRepository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row as _;

use turnstile_core::{Permission, RoleId};

use crate::error::{DbError, DbResult};
use crate::models::{NeueRolle, RolleRecord};
use crate::repository::RoleRepository;
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{uuid_parsen, zeit_parsen, zeit_text};

#[async_trait]
impl RoleRepository for SqliteDb {
    async fn create(&self, data: NeueRolle<'_>) -> DbResult<RolleRecord> {
        let id = RoleId::new();
        let now = Utc::now();
        let permissions_json = serde_json::to_string(&data.permissions)?;

        sqlx::query(
            "INSERT INTO roles (id, name, description, permissions, is_active, created_at)
             VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(id.to_string())
        .bind(data.name)
        .bind(data.description)
        .bind(&permissions_json)
        .bind(zeit_text(now))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE") || msg.contains("unique") {
                DbError::Eindeutigkeit(format!("Rolle '{}' existiert bereits", data.name))
            } else {
                DbError::Sqlx(e)
            }
        })?;

        Ok(RolleRecord {
            id,
            name: data.name.to_string(),
            description: data.description.map(str::to_string),
            permissions: data.permissions,
            is_active: true,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: RoleId) -> DbResult<Option<RolleRecord>> {
        let row = sqlx::query(
            "SELECT id, name, description, permissions, is_active, created_at
             FROM roles WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_rolle(&r)).transpose()
    }

    async fn get_by_name(&self, name: &str) -> DbResult<Option<RolleRecord>> {
        let row = sqlx::query(
            "SELECT id, name, description, permissions, is_active, created_at
             FROM roles WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_rolle(&r)).transpose()
    }
}

fn row_to_rolle(row: &sqlx::sqlite::SqliteRow) -> DbResult<RolleRecord> {
    let id: String = row.try_get("id")?;
    let permissions: String = row.try_get("permissions")?;
    let created_at: String = row.try_get("created_at")?;
    let is_active: i64 = row.try_get("is_active")?;

    let permissions: Vec<Permission> = serde_json::from_str(&permissions)?;

    Ok(RolleRecord {
        id: RoleId(uuid_parsen(&id)?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        permissions,
        is_active: is_active != 0,
        created_at: zeit_parsen("created_at", &created_at)?,
    })
}
