//! turnstile-auth – Sessions, Tokens und Berechtigungen
//!
//! Dieses Crate implementiert:
//! - Signierte Access- und Refresh-Tokens (`TokenCodec`)
//! - Passwort-Hashing mit Argon2id (`PasswortHasher`)
//! - Berechtigungspruefung mit Namensraum-Platzhaltern (`satisfies`)
//! - Session-Management ueber das `SessionRepository` (`SessionService`)
//! - Authentifizierung pro Anfrage (`AuthenticationGate`, `PermissionGate`)
//! - AuthService (Registrierung, Login, Refresh, Logout, Konto- und Admin-Verwaltung)

pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod password;
pub mod permission;
pub mod service;
pub mod session;
pub mod token;

use std::sync::Arc;

use turnstile_db::{RoleRepository, SessionRepository, UserRepository};

// Bequeme Re-Exporte
pub use clock::{FesteUhr, SystemUhr, Uhr};
pub use config::AuthKonfig;
pub use error::{AuthError, AuthResult};
pub use gate::{AngemeldeterBenutzer, Anmeldedaten, AuthenticationGate, PermissionGate};
pub use password::{Argon2Hasher, PasswortHasher};
pub use permission::satisfies;
pub use service::{
    AuthService, BenutzerAenderung, BenutzerProfil, BenutzerSeite, LoginErgebnis, Paginierung,
    Registrierung, TokenAntwort,
};
pub use session::{GeraeteInfo, NeueSession, SessionService};
pub use token::{TokenClaims, TokenCodec, TokenInhalt, TokenTyp};

/// Alle Auth-Komponenten, fertig verdrahtet
#[derive(Clone)]
pub struct AuthDienste {
    pub konfig: Arc<AuthKonfig>,
    pub codec: Arc<TokenCodec>,
    pub sessions: Arc<SessionService>,
    pub gate: Arc<AuthenticationGate>,
    pub service: Arc<AuthService>,
}

impl AuthDienste {
    pub fn aufbauen(
        konfig: Arc<AuthKonfig>,
        uhr: Arc<dyn Uhr>,
        hasher: Arc<dyn PasswortHasher>,
        session_store: Arc<dyn SessionRepository>,
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::neu(&konfig, Arc::clone(&uhr)));
        let sessions = Arc::new(SessionService::neu(
            session_store,
            Arc::clone(&codec),
            Arc::clone(&konfig),
            uhr,
        ));
        let gate = Arc::new(AuthenticationGate::neu(
            Arc::clone(&codec),
            Arc::clone(&sessions),
            Arc::clone(&users),
            Arc::clone(&roles),
        ));
        let service = Arc::new(AuthService::neu(
            users,
            roles,
            Arc::clone(&sessions),
            Arc::clone(&codec),
            hasher,
            Arc::clone(&konfig),
        ));

        Self {
            konfig,
            codec,
            sessions,
            gate,
            service,
        }
    }
}
