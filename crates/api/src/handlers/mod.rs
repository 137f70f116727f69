//! REST-Handler Module

pub mod admin;
pub mod auth;
pub mod user;

use serde::Serialize;

/// Antwortdaten fuer Vorgaenge, die Sessions widerrufen
#[derive(Debug, Serialize)]
pub struct Widerrufen {
    pub revoked_sessions: u64,
}
