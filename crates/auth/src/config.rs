//! Konfiguration fuer Tokens und Sessions
//!
//! Wird einmal beim Start aufgebaut und als `Arc<AuthKonfig>` an
//! `TokenCodec`, `SessionService` und die REST-Schicht weitergereicht.

use chrono::Duration;

/// Standard-Lebensdauer eines Access-Tokens: 15 Minuten
pub const ACCESS_TTL_SEKUNDEN: i64 = 15 * 60;

/// Standard-Lebensdauer einer Session bzw. eines Refresh-Tokens: 30 Tage
pub const REFRESH_TTL_SEKUNDEN: i64 = 30 * 24 * 60 * 60;

/// Unveraenderliche Auth-Konfiguration
#[derive(Clone)]
pub struct AuthKonfig {
    /// HMAC-Schluessel fuer die Token-Signatur
    pub secret: String,
    /// Lebensdauer eines Access-Tokens
    pub access_ttl: Duration,
    /// Lebensdauer einer Session (und ihres Refresh-Tokens)
    pub refresh_ttl: Duration,
    /// Produktionsbetrieb (steuert u.a. das `Secure`-Flag am Cookie)
    pub produktion: bool,
}

impl AuthKonfig {
    /// Konfiguration mit Standard-Lebensdauern
    pub fn neu(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::seconds(ACCESS_TTL_SEKUNDEN),
            refresh_ttl: Duration::seconds(REFRESH_TTL_SEKUNDEN),
            produktion: false,
        }
    }

    pub fn mit_produktion(mut self, produktion: bool) -> Self {
        self.produktion = produktion;
        self
    }

    /// Lebensdauer des Access-Tokens in Sekunden (`expires_in`)
    pub fn access_ttl_sekunden(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Lebensdauer des Refresh-Tokens in Sekunden (Cookie `Max-Age`)
    pub fn refresh_ttl_sekunden(&self) -> i64 {
        self.refresh_ttl.num_seconds()
    }
}

// Secret nie im Log
impl std::fmt::Debug for AuthKonfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthKonfig")
            .field("secret", &"***")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("produktion", &self.produktion)
            .finish()
    }
}
