//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `TS_LOG_LEVEL`: Log-Level bzw. Filter-Direktive, Standard aus der Konfiguration
//! - `TS_LOG_FORMAT`: Format (text/json), Standard aus der Konfiguration
//!
//! Die Umgebungsvariablen haben Vorrang vor den Werten aus `[logging]`.

use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "TS_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "TS_LOG_FORMAT";

/// Initialisiert das Logging-System.
///
/// Darf nur einmal pro Prozess aufgerufen werden.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let aus_env = std::env::var(ENV_LOG_FORMAT).ok();
    let format = format_waehlen(aus_env.as_deref(), format);

    match format {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_current_span(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Umgebungswert vor Konfigurationswert; unbekannte Formate fallen auf `text`
fn format_waehlen<'a>(aus_env: Option<&'a str>, aus_konfig: &'a str) -> &'a str {
    let gewaehlt = aus_env.unwrap_or(aus_konfig);
    if log_format_gueltig(gewaehlt) {
        gewaehlt
    } else {
        "text"
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
