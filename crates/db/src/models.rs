//! Datenbankmodelle fuer Turnstile
//!
//! Diese Typen repraesentieren Datensaetze aus der Datenbank. Sie sind reine
//! Daten ohne Persistenzlogik; gespeichert wird ausschliesslich ueber die
//! Repository-Traits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use turnstile_core::{Permission, RoleId, SessionId, UserId};

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Session-Datensatz: bindet einen Benutzer an einen einzelnen Login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: UserId,
    /// Eindeutiger, nicht erratbarer Schluessel fuer Refresh-Versuche
    pub refresh_identifier: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionRecord {
    /// Maximale Laenge von `device_info`
    pub const MAX_GERAET: usize = 255;
    /// Maximale Laenge von `ip_address` (IPv6 inkl. Zone)
    pub const MAX_IP: usize = 45;
    /// Maximale Laenge von `user_agent`
    pub const MAX_USER_AGENT: usize = 500;

    /// Gibt `true` zurueck wenn `jetzt` nach dem Ablaufzeitpunkt liegt
    pub fn ist_abgelaufen(&self, jetzt: DateTime<Utc>) -> bool {
        jetzt > self.expires_at
    }

    /// Gueltig = aktiv und nicht abgelaufen
    pub fn ist_gueltig(&self, jetzt: DateTime<Utc>) -> bool {
        self.is_active && !self.ist_abgelaufen(jetzt)
    }
}

// ---------------------------------------------------------------------------
// Benutzer
// ---------------------------------------------------------------------------

/// Benutzer-Datensatz aus der Datenbank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenutzerRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: RoleId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen eines neuen Benutzers
#[derive(Debug, Clone)]
pub struct NeuerBenutzer<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: Option<&'a str>,
    pub password_hash: &'a str,
    pub role_id: RoleId,
}

/// Daten zum Aktualisieren eines Benutzers
#[derive(Debug, Clone, Default)]
pub struct BenutzerUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub role_id: Option<RoleId>,
    pub is_active: Option<bool>,
}

impl BenutzerUpdate {
    pub fn ist_leer(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.full_name.is_none()
            && self.password_hash.is_none()
            && self.role_id.is_none()
            && self.is_active.is_none()
    }
}

// ---------------------------------------------------------------------------
// Rollen
// ---------------------------------------------------------------------------

/// Rollen-Datensatz mit den gewaehrten Berechtigungen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolleRecord {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<Permission>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Daten zum Erstellen einer neuen Rolle
#[derive(Debug, Clone)]
pub struct NeueRolle<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub permissions: Vec<Permission>,
}
