//! Repository-Trait-Definitionen
//!
//! Das Repository-Pattern entkoppelt die Geschaeftslogik von der konkreten
//! Datenbank-Implementierung. Die Traits sind objektsicher (`async-trait`),
//! damit die Services sie als `Arc<dyn …>` halten koennen.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use turnstile_core::{RoleId, SessionId, UserId};

use crate::error::DbResult;
use crate::models::{
    BenutzerRecord, BenutzerUpdate, NeueRolle, NeuerBenutzer, RolleRecord, SessionRecord,
};

/// Konfiguration fuer die Datenbankverbindung
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://turnstile.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob WAL-Modus bei SQLite aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://turnstile.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Persistenz fuer Session-Datensaetze
///
/// Einzelne Datensaetze muessen Read-after-Write-konsistent sein: ein
/// sichtbarer Widerruf wird von jeder folgenden Abfrage gesehen.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Legt eine Session an.
    ///
    /// Schlaegt mit `DbError::Eindeutigkeit` fehl wenn `refresh_identifier`
    /// (oder `id`) bereits existiert.
    async fn insert(&self, session: &SessionRecord) -> DbResult<()>;

    /// Laedt eine Session anhand ihrer ID
    async fn get(&self, id: SessionId) -> DbResult<Option<SessionRecord>>;

    /// Laedt eine Session anhand ihres Refresh-Identifiers, unabhaengig von
    /// Aktiv- oder Ablaufstatus
    async fn find_by_refresh_identifier(
        &self,
        refresh_identifier: &str,
    ) -> DbResult<Option<SessionRecord>>;

    /// Alle aktiven (nicht widerrufenen) Sessions eines Benutzers
    async fn list_active_by_user(&self, user_id: UserId) -> DbResult<Vec<SessionRecord>>;

    /// Setzt `last_activity`, aber nie auf einen frueheren Zeitpunkt
    async fn update_last_activity(&self, id: SessionId, zeitpunkt: DateTime<Utc>) -> DbResult<()>;

    /// Widerruft eine Session. Idempotent; gibt `true` zurueck wenn die
    /// Session durch diesen Aufruf deaktiviert wurde.
    async fn revoke(&self, id: SessionId) -> DbResult<bool>;

    /// Widerruft alle aktiven Sessions eines Benutzers und gibt deren Anzahl zurueck
    async fn revoke_all_for_user(&self, user_id: UserId) -> DbResult<u64>;

    /// Loescht alle Sessions mit `expires_at < jetzt`, unabhaengig von `is_active`
    async fn delete_expired(&self, jetzt: DateTime<Utc>) -> DbResult<u64>;
}

/// Repository fuer Benutzer-Datenzugriffe
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Legt einen Benutzer an; doppelter Username oder E-Mail ergibt
    /// `DbError::Eindeutigkeit`
    async fn create(&self, data: NeuerBenutzer<'_>) -> DbResult<BenutzerRecord>;

    async fn get_by_id(&self, id: UserId) -> DbResult<Option<BenutzerRecord>>;

    /// Sucht einen Benutzer ueber Username oder E-Mail
    async fn find_by_login(&self, kennung: &str) -> DbResult<Option<BenutzerRecord>>;

    /// Aktualisiert nur die gesetzten Felder
    async fn update(&self, id: UserId, data: BenutzerUpdate) -> DbResult<BenutzerRecord>;

    /// Seitenweise Auflistung, sortiert nach Erstellungszeitpunkt
    async fn list(&self, offset: u64, limit: u64) -> DbResult<Vec<BenutzerRecord>>;

    async fn count(&self) -> DbResult<u64>;
}

/// Repository fuer Rollen
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, data: NeueRolle<'_>) -> DbResult<RolleRecord>;

    async fn get_by_id(&self, id: RoleId) -> DbResult<Option<RolleRecord>>;

    async fn get_by_name(&self, name: &str) -> DbResult<Option<RolleRecord>>;
}
