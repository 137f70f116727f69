//! SQLite-Implementierung des SessionRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row as _;

use turnstile_core::{SessionId, UserId};

use crate::error::{DbError, DbResult};
use crate::models::SessionRecord;
use crate::repository::SessionRepository;
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{uuid_parsen, zeit_parsen, zeit_text};

const SPALTEN: &str = "id, user_id, refresh_identifier, device_info, ip_address, user_agent,
     expires_at, is_active, created_at, last_activity";

#[async_trait]
impl SessionRepository for SqliteDb {
    async fn insert(&self, session: &SessionRecord) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO sessions
               (id, user_id, refresh_identifier, device_info, ip_address, user_agent,
                expires_at, is_active, created_at, last_activity)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(&session.refresh_identifier)
        .bind(&session.device_info)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(zeit_text(session.expires_at))
        .bind(session.is_active as i64)
        .bind(zeit_text(session.created_at))
        .bind(zeit_text(session.last_activity))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE") || msg.contains("unique") {
                DbError::Eindeutigkeit(format!("Session {} existiert bereits", session.id.kurz()))
            } else {
                DbError::Sqlx(e)
            }
        })?;
        Ok(())
    }

    async fn get(&self, id: SessionId) -> DbResult<Option<SessionRecord>> {
        let sql = format!("SELECT {SPALTEN} FROM sessions WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn find_by_refresh_identifier(
        &self,
        refresh_identifier: &str,
    ) -> DbResult<Option<SessionRecord>> {
        let sql = format!("SELECT {SPALTEN} FROM sessions WHERE refresh_identifier = ?");
        let row = sqlx::query(&sql)
            .bind(refresh_identifier)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn list_active_by_user(&self, user_id: UserId) -> DbResult<Vec<SessionRecord>> {
        let sql = format!(
            "SELECT {SPALTEN} FROM sessions
             WHERE user_id = ? AND is_active = 1
             ORDER BY last_activity DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_session).collect()
    }

    async fn update_last_activity(&self, id: SessionId, zeitpunkt: DateTime<Utc>) -> DbResult<()> {
        let zeit = zeit_text(zeitpunkt);
        sqlx::query(
            "UPDATE sessions SET last_activity = ?
             WHERE id = ? AND last_activity < ?",
        )
        .bind(&zeit)
        .bind(id.to_string())
        .bind(&zeit)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke(&self, id: SessionId) -> DbResult<bool> {
        let affected = sqlx::query("UPDATE sessions SET is_active = 0 WHERE id = ? AND is_active = 1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> DbResult<u64> {
        let affected =
            sqlx::query("UPDATE sessions SET is_active = 0 WHERE user_id = ? AND is_active = 1")
                .bind(user_id.to_string())
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok(affected)
    }

    async fn delete_expired(&self, jetzt: DateTime<Utc>) -> DbResult<u64> {
        let affected = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(zeit_text(jetzt))
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> DbResult<SessionRecord> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let expires_at: String = row.try_get("expires_at")?;
    let created_at: String = row.try_get("created_at")?;
    let last_activity: String = row.try_get("last_activity")?;
    let is_active: i64 = row.try_get("is_active")?;

    Ok(SessionRecord {
        id: SessionId(uuid_parsen(&id)?),
        user_id: UserId(uuid_parsen(&user_id)?),
        refresh_identifier: row.try_get("refresh_identifier")?,
        device_info: row.try_get("device_info")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        expires_at: zeit_parsen("expires_at", &expires_at)?,
        is_active: is_active != 0,
        created_at: zeit_parsen("created_at", &created_at)?,
        last_activity: zeit_parsen("last_activity", &last_activity)?,
    })
}
