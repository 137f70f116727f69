//! turnstile-db – Datenbank-Abstraktion
//!
//! Dieses Crate stellt das Repository-Pattern bereit. Die Geschaeftslogik in
//! `turnstile-auth` kennt nur die Traits aus [`repository`]; die SQLite-
//! Implementierung liegt in [`sqlite`].

pub mod error;
pub mod models;
pub mod repository;
pub mod sqlite;

pub use error::{DbError, DbResult};
pub use models::{
    BenutzerRecord, BenutzerUpdate, NeueRolle, NeuerBenutzer, RolleRecord, SessionRecord,
};
pub use repository::{
    DatabaseConfig, RoleRepository, SessionRepository, UserRepository,
};
pub use sqlite::SqliteDb;
