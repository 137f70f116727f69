//! turnstile-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Turnstile-Crates gemeinsam genutzt werden: typisierte IDs und
//! der Berechtigungs-Wert `Permission`.

pub mod permission;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use permission::Permission;
pub use types::{RoleId, SessionId, UserId};
