//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::SocketAddr;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use turnstile_api::RestServerKonfig;
use turnstile_auth::config::{ACCESS_TTL_SEKUNDEN, REFRESH_TTL_SEKUNDEN};
use turnstile_auth::AuthKonfig;
use turnstile_db::DatabaseConfig;

/// Umgebungsvariable fuer das Signatur-Secret
pub const ENV_SECRET: &str = "TURNSTILE_SECRET";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Datenbank-Einstellungen
    pub datenbank: DatenbankEinstellungen,
    /// Token-, Session- und Passwort-Einstellungen
    pub auth: AuthEinstellungen,
    /// REST-API-Einstellungen
    pub api: ApiEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// "development" oder "production"
    pub umgebung: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Turnstile".into(),
            umgebung: "development".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer die REST-API
    pub bind_adresse: String,
    /// Port fuer die REST-API
    pub api_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            api_port: 8000,
        }
    }
}

/// Datenbank-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Verbindungs-URL
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    pub sqlite_wal: bool,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        Self {
            url: "sqlite://turnstile.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

/// Token-, Session- und Passwort-Einstellungen
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEinstellungen {
    /// Signatur-Secret (HS256). Leer = `TURNSTILE_SECRET` oder zufaellig.
    pub secret: Option<String>,
    pub access_ttl_sekunden: i64,
    pub refresh_ttl_sekunden: i64,
    /// Intervall des Session-Cleanups
    pub cleanup_intervall_sekunden: u64,
    /// Argon2id-Speicherkosten in KiB
    pub argon2_speicher_kib: u32,
    pub argon2_iterationen: u32,
    pub argon2_parallelitaet: u32,
}

impl Default for AuthEinstellungen {
    fn default() -> Self {
        Self {
            secret: None,
            access_ttl_sekunden: ACCESS_TTL_SEKUNDEN,
            refresh_ttl_sekunden: REFRESH_TTL_SEKUNDEN,
            cleanup_intervall_sekunden: 15 * 60,
            argon2_speicher_kib: 64 * 1024,
            argon2_iterationen: 3,
            argon2_parallelitaet: 1,
        }
    }
}

impl std::fmt::Debug for AuthEinstellungen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEinstellungen")
            .field("secret", &self.secret.as_ref().map(|_| "<verborgen>"))
            .field("access_ttl_sekunden", &self.access_ttl_sekunden)
            .field("refresh_ttl_sekunden", &self.refresh_ttl_sekunden)
            .field("cleanup_intervall_sekunden", &self.cleanup_intervall_sekunden)
            .field("argon2_speicher_kib", &self.argon2_speicher_kib)
            .field("argon2_iterationen", &self.argon2_iterationen)
            .field("argon2_parallelitaet", &self.argon2_parallelitaet)
            .finish()
    }
}

/// REST-API-Einstellungen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEinstellungen {
    /// CORS-Origins (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    pub fn ist_produktion(&self) -> bool {
        self.server.umgebung.eq_ignore_ascii_case("production")
    }

    /// Gibt die Bind-Adresse fuer die REST-API zurueck
    pub fn api_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.api_port)
    }

    pub fn datenbank_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.datenbank.url.clone(),
            max_verbindungen: self.datenbank.max_verbindungen,
            sqlite_wal: self.datenbank.sqlite_wal,
        }
    }

    pub fn rest_konfig(&self) -> anyhow::Result<RestServerKonfig> {
        let adresse = self.api_bind_adresse();
        let bind_addr: SocketAddr = adresse
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltige Bind-Adresse '{adresse}': {e}"))?;
        Ok(RestServerKonfig {
            bind_addr,
            cors_origins: self.api.cors_origins.clone(),
        })
    }

    pub fn cleanup_intervall(&self) -> Duration {
        Duration::from_secs(self.auth.cleanup_intervall_sekunden.max(1))
    }

    /// Baut die Auth-Konfiguration; `umgebung_secret` ist der Wert von
    /// `TURNSTILE_SECRET`
    pub fn auth_konfig(&self, umgebung_secret: Option<String>) -> anyhow::Result<AuthKonfig> {
        if self.auth.access_ttl_sekunden <= 0 || self.auth.refresh_ttl_sekunden <= 0 {
            anyhow::bail!("Token-Laufzeiten muessen positiv sein");
        }

        let secret = match self
            .auth
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .or(umgebung_secret.filter(|s| !s.is_empty()))
        {
            Some(s) => s,
            None if self.ist_produktion() => {
                anyhow::bail!("Kein Secret konfiguriert ([auth].secret oder {ENV_SECRET})")
            }
            None => {
                tracing::warn!(
                    "Kein Secret konfiguriert, verwende zufaelliges Secret; \
                     Tokens werden beim Neustart ungueltig"
                );
                zufaelliges_secret()
            }
        };

        let mut konfig = AuthKonfig::neu(secret).mit_produktion(self.ist_produktion());
        konfig.access_ttl = chrono::Duration::seconds(self.auth.access_ttl_sekunden);
        konfig.refresh_ttl = chrono::Duration::seconds(self.auth.refresh_ttl_sekunden);
        Ok(konfig)
    }
}

fn zufaelliges_secret() -> String {
    let mut bytes = [0u8; 48];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
