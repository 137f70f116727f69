//! turnstile-server – Bibliotheks-Root
//!
//! Verdrahtet Datenbank, Auth-Dienste, REST-API und Health-Check und stellt
//! den oeffentlichen Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use config::{ServerConfig, ENV_SECRET};

use turnstile_api::{api_router, ApiState, RestServer};
use turnstile_auth::{Argon2Hasher, AuthDienste, SystemUhr};
use turnstile_db::SqliteDb;
use turnstile_observability::{health_router, HealthState};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

/// Gesamter Router: `/api/v1/...` plus `/health` und `/ready`
pub fn app_router(dienste: AuthDienste, db: Option<SqliteDb>) -> Router {
    api_router(ApiState::neu(dienste)).merge(health_router(HealthState::neu(db)))
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbankverbindung herstellen (inkl. Migrationen)
    /// 2. Standardrollen anlegen
    /// 3. Session-Cleanup starten
    /// 4. REST-API starten
    /// 5. Auf Ctrl-C warten
    pub async fn starten(self) -> Result<()> {
        let rest = self.config.rest_konfig()?;
        let auth_konfig = self
            .config
            .auth_konfig(std::env::var(ENV_SECRET).ok())?;

        tracing::info!(
            server_name = %self.config.server.name,
            umgebung = %self.config.server.umgebung,
            api = %rest.bind_addr,
            "Server startet"
        );

        let db = SqliteDb::oeffnen(&self.config.datenbank_config()).await?;
        let store = Arc::new(db.clone());

        let a = &self.config.auth;
        let hasher = Argon2Hasher::mit_parametern(
            a.argon2_speicher_kib,
            a.argon2_iterationen,
            a.argon2_parallelitaet,
        )?;

        let dienste = AuthDienste::aufbauen(
            Arc::new(auth_konfig),
            Arc::new(SystemUhr),
            Arc::new(hasher),
            store.clone(),
            store.clone(),
            store,
        );

        let angelegt = dienste.service.standard_rollen_anlegen().await?;
        if angelegt > 0 {
            tracing::info!(anzahl = angelegt, "Standardrollen angelegt");
        }

        let intervall = self.config.cleanup_intervall();
        let sweep = dienste.sessions.sweep_starten(intervall);
        tracing::info!(intervall_s = intervall.as_secs(), "Session-Cleanup gestartet");

        let router = app_router(dienste, Some(db));
        let ergebnis = RestServer::neu(rest).starten(router, shutdown_signal()).await;

        sweep.abort();
        tracing::info!("Server beendet");
        ergebnis
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
        Err(e) => tracing::error!(fehler = %e, "Shutdown-Signal konnte nicht abgewartet werden"),
    }
}
