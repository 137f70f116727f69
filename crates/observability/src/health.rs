//! Health-Check-Endpunkte fuer Turnstile
//!
//! - `GET /health`: Lebenszeichen mit Version, Uptime und Zeitstempel
//! - `GET /ready`: Bereitschaft, prueft die Datenbankverbindung (503 wenn nicht erreichbar)

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use turnstile_db::SqliteDb;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Ready,
    Unavailable,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Geteilter Zustand fuer die Health-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    db: Option<SqliteDb>,
}

impl HealthState {
    pub fn neu(db: Option<SqliteDb>) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            db,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// `true` wenn keine Datenbank konfiguriert ist oder sie antwortet
    pub async fn db_bereit(&self) -> bool {
        match &self.db {
            Some(db) => match db.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(fehler = %e, "Datenbank nicht erreichbar");
                    false
                }
            },
            None => true,
        }
    }
}

/// Axum-Router fuer `/health` und `/ready`
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}

/// `GET /health` – Prozess laeuft
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    };
    (StatusCode::OK, Json(response))
}

/// `GET /ready` – Datenbank erreichbar
async fn ready_handler(State(state): State<HealthState>) -> impl IntoResponse {
    if state.db_bereit().await {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "status": HealthStatus::Ready })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": HealthStatus::Unavailable,
                "message": "Datenbank nicht bereit"
            })),
        )
    }
}
