//! Authentifizierung pro Anfrage
//!
//! Das [`AuthenticationGate`] nimmt die Anmeldedaten einer Anfrage entgegen
//! (Bearer-Token oder Refresh-Cookie), prueft Token, Session und Benutzer und
//! laedt die Berechtigungen der Rolle. [`PermissionGate`] prueft zusaetzlich
//! eine feste Liste geforderter Berechtigungen.

use std::collections::HashSet;
use std::sync::Arc;

use turnstile_core::Permission;
use turnstile_db::{BenutzerRecord, RoleRepository, SessionRecord, UserRepository};

use crate::error::{AuthError, AuthResult};
use crate::permission::satisfies;
use crate::session::SessionService;
use crate::token::{TokenCodec, TokenTyp};

/// Rohdaten aus einer Anfrage
#[derive(Debug, Clone, Default)]
pub struct Anmeldedaten {
    /// Inhalt des `Authorization: Bearer`-Headers
    pub bearer: Option<String>,
    /// Inhalt des `refresh_token`-Cookies
    pub refresh_cookie: Option<String>,
}

/// Ergebnis einer erfolgreichen Authentifizierung
#[derive(Debug, Clone)]
pub struct AngemeldeterBenutzer {
    pub benutzer: BenutzerRecord,
    pub session: SessionRecord,
    /// Name der Rolle, falls die Rolle existiert
    pub rolle: Option<String>,
    pub berechtigungen: HashSet<Permission>,
}

impl AngemeldeterBenutzer {
    pub fn hat_berechtigungen(&self, gefordert: &[Permission]) -> bool {
        satisfies(&self.berechtigungen, gefordert)
    }
}

pub struct AuthenticationGate {
    codec: Arc<TokenCodec>,
    sessions: Arc<SessionService>,
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
}

impl AuthenticationGate {
    pub fn neu(
        codec: Arc<TokenCodec>,
        sessions: Arc<SessionService>,
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
    ) -> Self {
        Self {
            codec,
            sessions,
            users,
            roles,
        }
    }

    /// Authentifiziert eine Anfrage
    ///
    /// Bearer-Token werden als Access-Token, Cookies als Refresh-Token
    /// erwartet; ein vertauschter Typ gilt als nicht authentifiziert.
    pub async fn authentifizieren(&self, daten: &Anmeldedaten) -> AuthResult<AngemeldeterBenutzer> {
        let (token, erwartet) = match (&daten.bearer, &daten.refresh_cookie) {
            (Some(bearer), _) => (bearer.as_str(), TokenTyp::Access),
            (None, Some(cookie)) => (cookie.as_str(), TokenTyp::Refresh),
            (None, None) => {
                return Err(AuthError::nicht_authentifiziert("Kein Token vorhanden"));
            }
        };

        let claims = match self.codec.decode_typ(token, erwartet) {
            Ok(c) => c,
            Err(e @ AuthError::NichtAuthentifiziert(_)) => {
                tracing::warn!(erwartet = %erwartet, "Token-Typ passt nicht zur Quelle");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let session = self
            .sessions
            .validate_session(claims.sid)
            .await?
            .ok_or_else(|| AuthError::nicht_authentifiziert("Session ungueltig oder abgelaufen"))?;

        if session.user_id != claims.uid {
            tracing::warn!(
                session_id = %session.id.kurz(),
                user_id = %claims.uid,
                "Session gehoert einem anderen Benutzer"
            );
            return Err(AuthError::verboten("Session gehoert nicht zu diesem Benutzer"));
        }

        let benutzer = self
            .users
            .get_by_id(claims.uid)
            .await?
            .ok_or_else(|| AuthError::nicht_authentifiziert("Benutzer nicht gefunden"))?;

        if !benutzer.is_active {
            let anzahl = self.sessions.revoke_all_sessions_for_user(benutzer.id).await?;
            tracing::warn!(
                user_id = %benutzer.id,
                widerrufen = anzahl,
                "Zugriff durch deaktivierten Benutzer"
            );
            return Err(AuthError::verboten("Benutzerkonto deaktiviert"));
        }

        // Fehlende oder inaktive Rolle: keine Berechtigungen
        let (rolle, berechtigungen) = match self.roles.get_by_id(benutzer.role_id).await? {
            Some(r) if r.is_active => (Some(r.name), r.permissions.into_iter().collect()),
            Some(r) => (Some(r.name), HashSet::new()),
            None => (None, HashSet::new()),
        };

        Ok(AngemeldeterBenutzer {
            benutzer,
            session,
            rolle,
            berechtigungen,
        })
    }

    /// Gate, das zusaetzlich `gefordert` gegen die Rollenrechte prueft
    pub fn require_permissions<I, P>(self: &Arc<Self>, gefordert: I) -> PermissionGate
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        PermissionGate {
            gate: Arc::clone(self),
            gefordert: gefordert.into_iter().map(Into::into).collect(),
        }
    }
}

/// Authentifizierung plus Berechtigungspruefung
#[derive(Clone)]
pub struct PermissionGate {
    gate: Arc<AuthenticationGate>,
    gefordert: Vec<Permission>,
}

impl PermissionGate {
    pub fn gefordert(&self) -> &[Permission] {
        &self.gefordert
    }

    pub async fn authentifizieren(&self, daten: &Anmeldedaten) -> AuthResult<AngemeldeterBenutzer> {
        let angemeldet = self.gate.authentifizieren(daten).await?;
        if !angemeldet.hat_berechtigungen(&self.gefordert) {
            tracing::warn!(
                user_id = %angemeldet.benutzer.id,
                "Unzureichende Berechtigungen"
            );
            return Err(AuthError::verboten("Unzureichende Berechtigungen"));
        }
        Ok(angemeldet)
    }
}
