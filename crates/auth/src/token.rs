//! Signierte, ablaufende Tokens (HS256)
//!
//! Access- und Refresh-Tokens tragen nur Identifikatoren: Benutzer, Session,
//! beim Refresh-Token zusaetzlich den Refresh-Identifier, plus Typ und
//! Ablaufzeitpunkt. Berechtigungen oder Geheimnisse stehen nie im Token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use turnstile_core::{SessionId, UserId};

use crate::clock::Uhr;
use crate::config::AuthKonfig;
use crate::error::{AuthError, AuthResult};

/// Token-Typ (`type`-Claim)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenTyp {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenTyp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenTyp::Access => write!(f, "access"),
            TokenTyp::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claim-Satz eines Tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Benutzer-ID
    pub uid: UserId,
    /// Session-ID
    pub sid: SessionId,
    /// Refresh-Identifier (nur bei Refresh-Tokens)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(rename = "type")]
    pub typ: TokenTyp,
    /// Ausgestellt (Unix-Sekunden)
    pub iat: i64,
    /// Ablauf (Unix-Sekunden)
    pub exp: i64,
}

impl TokenClaims {
    pub fn ist_access(&self) -> bool {
        self.typ == TokenTyp::Access
    }

    pub fn ist_refresh(&self) -> bool {
        self.typ == TokenTyp::Refresh
    }
}

/// Eingabe fuer [`TokenCodec::encode`]
#[derive(Debug, Clone)]
pub struct TokenInhalt {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub refresh_identifier: Option<String>,
    pub typ: TokenTyp,
}

impl TokenInhalt {
    pub fn access(user_id: UserId, session_id: SessionId) -> Self {
        Self {
            user_id,
            session_id,
            refresh_identifier: None,
            typ: TokenTyp::Access,
        }
    }

    pub fn refresh(user_id: UserId, session_id: SessionId, refresh_identifier: String) -> Self {
        Self {
            user_id,
            session_id,
            refresh_identifier: Some(refresh_identifier),
            typ: TokenTyp::Refresh,
        }
    }
}

/// Kodiert und prueft Tokens mit dem prozessweiten Secret
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    uhr: Arc<dyn Uhr>,
}

impl TokenCodec {
    pub fn neu(konfig: &AuthKonfig, uhr: Arc<dyn Uhr>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Ablauf wird gegen die eigene Uhr geprueft
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(konfig.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(konfig.secret.as_bytes()),
            validation,
            uhr,
        }
    }

    /// Signiert `inhalt` mit dem absoluten Ablaufzeitpunkt `gueltig_bis`
    pub fn encode(&self, inhalt: TokenInhalt, gueltig_bis: DateTime<Utc>) -> AuthResult<String> {
        let claims = TokenClaims {
            uid: inhalt.user_id,
            sid: inhalt.session_id,
            jti: inhalt.refresh_identifier,
            typ: inhalt.typ,
            iat: self.uhr.jetzt().timestamp(),
            exp: gueltig_bis.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::intern(format!("Token-Kodierung fehlgeschlagen: {e}")))
    }

    /// Prueft Signatur und Ablauf und gibt die Claims zurueck
    ///
    /// `TokenAbgelaufen` wenn `exp` vor der aktuellen Zeit liegt,
    /// `TokenUngueltig` bei falscher Signatur oder Struktur.
    pub fn decode(&self, token: &str) -> AuthResult<TokenClaims> {
        let daten = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(fehler = %e, "Token abgelehnt");
                AuthError::TokenUngueltig
            })?;

        if daten.claims.exp < self.uhr.jetzt().timestamp() {
            return Err(AuthError::TokenAbgelaufen);
        }
        Ok(daten.claims)
    }

    /// Wie [`decode`](Self::decode), verlangt aber zusaetzlich den Typ `erwartet`
    pub fn decode_typ(&self, token: &str, erwartet: TokenTyp) -> AuthResult<TokenClaims> {
        let claims = self.decode(token)?;
        if claims.typ != erwartet {
            return Err(AuthError::nicht_authentifiziert(format!(
                "Token-Typ '{}' erwartet",
                erwartet
            )));
        }
        Ok(claims)
    }
}
