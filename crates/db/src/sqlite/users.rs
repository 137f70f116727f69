//! SQLite-Implementierung des UserRepository

use async_trait::async_trait;
use chrono::Utc;

use turnstile_core::{RoleId, UserId};

use crate::error::{DbError, DbResult};
use crate::models::{BenutzerRecord, BenutzerUpdate, NeuerBenutzer};
use crate::repository::UserRepository;
use crate::sqlite::pool::SqliteDb;
use crate::sqlite::{uuid_parsen, zeit_parsen, zeit_text};

const SPALTEN: &str =
    "id, username, email, full_name, password_hash, role_id, is_active, created_at";

#[async_trait]
impl UserRepository for SqliteDb {
    async fn create(&self, data: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord> {
        let id = UserId::new();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, password_hash, role_id, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(id.to_string())
        .bind(data.username)
        .bind(data.email)
        .bind(data.full_name)
        .bind(data.password_hash)
        .bind(data.role_id.to_string())
        .bind(zeit_text(now))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("UNIQUE") || msg.contains("unique") {
                DbError::Eindeutigkeit(format!(
                    "Benutzername '{}' oder E-Mail '{}' bereits vergeben",
                    data.username, data.email
                ))
            } else {
                DbError::Sqlx(e)
            }
        })?;

        Ok(BenutzerRecord {
            id,
            username: data.username.to_string(),
            email: data.email.to_string(),
            full_name: data.full_name.map(str::to_string),
            password_hash: data.password_hash.to_string(),
            role_id: data.role_id,
            is_active: true,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: UserId) -> DbResult<Option<BenutzerRecord>> {
        let sql = format!("SELECT {SPALTEN} FROM users WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_benutzer(&r)).transpose()
    }

    async fn find_by_login(&self, kennung: &str) -> DbResult<Option<BenutzerRecord>> {
        let sql = format!("SELECT {SPALTEN} FROM users WHERE username = ? OR email = ? LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(kennung)
            .bind(kennung)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_benutzer(&r)).transpose()
    }

    async fn update(&self, id: UserId, data: BenutzerUpdate) -> DbResult<BenutzerRecord> {
        // Dynamisches UPDATE – nur gesetzte Felder aendern
        if data.ist_leer() {
            return self
                .get_by_id(id)
                .await?
                .ok_or_else(|| DbError::nicht_gefunden(format!("User {id}")));
        }

        let mut sets: Vec<&str> = Vec::new();
        if data.username.is_some() {
            sets.push("username = ?");
        }
        if data.email.is_some() {
            sets.push("email = ?");
        }
        if data.full_name.is_some() {
            sets.push("full_name = ?");
        }
        if data.password_hash.is_some() {
            sets.push("password_hash = ?");
        }
        if data.role_id.is_some() {
            sets.push("role_id = ?");
        }
        if data.is_active.is_some() {
            sets.push("is_active = ?");
        }

        let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
        let mut q = sqlx::query(&sql);

        if let Some(ref v) = data.username {
            q = q.bind(v);
        }
        if let Some(ref v) = data.email {
            q = q.bind(v);
        }
        if let Some(ref v) = data.full_name {
            q = q.bind(v.clone());
        }
        if let Some(ref v) = data.password_hash {
            q = q.bind(v);
        }
        if let Some(v) = data.role_id {
            q = q.bind(v.to_string());
        }
        if let Some(v) = data.is_active {
            q = q.bind(v as i64);
        }
        q = q.bind(id.to_string());

        let affected = q
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("UNIQUE") || msg.contains("unique") {
                    DbError::Eindeutigkeit("Benutzername oder E-Mail bereits vergeben".into())
                } else {
                    DbError::Sqlx(e)
                }
            })?
            .rows_affected();
        if affected == 0 {
            return Err(DbError::nicht_gefunden(format!("User {id}")));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::intern("User nach Update nicht gefunden"))
    }

    async fn list(&self, offset: u64, limit: u64) -> DbResult<Vec<BenutzerRecord>> {
        let sql = format!(
            "SELECT {SPALTEN} FROM users ORDER BY created_at, username LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_benutzer).collect()
    }

    async fn count(&self) -> DbResult<u64> {
        let anzahl: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(anzahl.max(0) as u64)
    }
}

fn row_to_benutzer(row: &sqlx::sqlite::SqliteRow) -> DbResult<BenutzerRecord> {
    use sqlx::Row as _;

    let id: String = row.try_get("id")?;
    let role_id: String = row.try_get("role_id")?;
    let created_at: String = row.try_get("created_at")?;
    let is_active: i64 = row.try_get("is_active")?;

    Ok(BenutzerRecord {
        id: UserId(uuid_parsen(&id)?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        password_hash: row.try_get("password_hash")?,
        role_id: RoleId(uuid_parsen(&role_id)?),
        is_active: is_active != 0,
        created_at: zeit_parsen("created_at", &created_at)?,
    })
}
