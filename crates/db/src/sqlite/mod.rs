//! SQLite-Backend-Implementierungen fuer alle Repository-Traits

pub mod pool;
pub mod roles;
pub mod sessions;
pub mod users;

pub use pool::SqliteDb;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Zeitstempel im Speicherformat (feste Breite, lexikografisch sortierbar)
pub(crate) fn zeit_text(zeit: DateTime<Utc>) -> String {
    zeit.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn zeit_parsen(feld: &str, wert: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(wert)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::intern(format!("Ungueltiger Zeitstempel {feld} '{wert}': {e}")))
}

pub(crate) fn uuid_parsen(wert: &str) -> DbResult<Uuid> {
    Uuid::parse_str(wert).map_err(|e| DbError::intern(format!("Ungueltige UUID '{wert}': {e}")))
}
