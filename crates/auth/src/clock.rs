//! Zeitquelle fuer Ablaufpruefungen
//!
//! Tokens und Sessions lesen die aktuelle Zeit ausschliesslich ueber [`Uhr`].
//! Im Betrieb ist das [`SystemUhr`], in Tests eine [`FesteUhr`], die sich
//! gezielt vorstellen laesst.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Liefert den aktuellen Zeitpunkt
pub trait Uhr: Send + Sync {
    fn jetzt(&self) -> DateTime<Utc>;
}

/// Systemzeit
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemUhr;

impl Uhr for SystemUhr {
    fn jetzt(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manuell gesteuerte Uhr
#[derive(Debug)]
pub struct FesteUhr {
    zeit: Mutex<DateTime<Utc>>,
}

impl FesteUhr {
    pub fn neu(zeit: DateTime<Utc>) -> Self {
        Self {
            zeit: Mutex::new(zeit),
        }
    }

    pub fn setzen(&self, zeit: DateTime<Utc>) {
        *self.zeit.lock().unwrap_or_else(|e| e.into_inner()) = zeit;
    }

    pub fn vorstellen(&self, dauer: Duration) {
        let mut zeit = self.zeit.lock().unwrap_or_else(|e| e.into_inner());
        *zeit += dauer;
    }
}

impl Uhr for FesteUhr {
    fn jetzt(&self) -> DateTime<Utc> {
        *self.zeit.lock().unwrap_or_else(|e| e.into_inner())
    }
}
