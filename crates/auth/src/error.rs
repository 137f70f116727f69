//! Fehlertypen fuer den Auth-Service

use thiserror::Error;

/// Alle moeglichen Fehler im Auth-Service
///
/// Die Varianten bilden die Fehlerklassen der Schnittstelle ab:
/// `NichtAuthentifiziert` (erneut anmelden), `Verboten` (Anmeldung hilft
/// nicht), `Konflikt`, `NichtGefunden`, `UngueltigeEingabe`. Alles andere ist
/// ein interner Fehler und fuehrt nie zu gewaehrtem Zugriff.
#[derive(Debug, Error)]
pub enum AuthError {
    // --- Authentifizierung ---
    #[error("Nicht authentifiziert: {0}")]
    NichtAuthentifiziert(String),

    #[error("Zugriff verweigert: {0}")]
    Verboten(String),

    // --- Token ---
    #[error("Token abgelaufen")]
    TokenAbgelaufen,

    #[error("Token ungueltig")]
    TokenUngueltig,

    // --- Ressourcen ---
    #[error("Konflikt: {0}")]
    Konflikt(String),

    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    // --- Passwort ---
    #[error("Passwort-Hashing fehlgeschlagen: {0}")]
    PasswortHashing(String),

    // --- Datenbank ---
    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] turnstile_db::DbError),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl AuthError {
    pub fn nicht_authentifiziert(msg: impl Into<String>) -> Self {
        Self::NichtAuthentifiziert(msg.into())
    }

    pub fn verboten(msg: impl Into<String>) -> Self {
        Self::Verboten(msg.into())
    }

    pub fn ungueltige_eingabe(msg: impl Into<String>) -> Self {
        Self::UngueltigeEingabe(msg.into())
    }

    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// `true` fuer alle Fehler, nach denen eine erneute Anmeldung hilft
    pub fn ist_nicht_authentifiziert(&self) -> bool {
        matches!(
            self,
            Self::NichtAuthentifiziert(_) | Self::TokenAbgelaufen | Self::TokenUngueltig
        )
    }
}

/// Result-Alias fuer den Auth-Service
pub type AuthResult<T> = Result<T, AuthError>;
