//! Axum-Extraktoren fuer Anmeldedaten, Authentifizierung und JSON-Bodies

use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::de::DeserializeOwned;

use turnstile_auth::{AngemeldeterBenutzer, Anmeldedaten};

use crate::error::ApiError;
use crate::middleware::{bearer_token, REFRESH_COOKIE};
use crate::state::ApiState;

/// Rohe Anmeldedaten (Bearer-Header und Refresh-Cookie), ungeprueft
#[derive(Debug, Clone)]
pub struct Anmeldung(pub Anmeldedaten);

#[async_trait]
impl<S> FromRequestParts<S> for Anmeldung
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Self(Anmeldedaten {
            bearer: bearer_token(&parts.headers).map(str::to_string),
            refresh_cookie: jar
                .get(REFRESH_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|v| !v.is_empty()),
        }))
    }
}

/// Authentifizierter Benutzer (Token, Session und Konto geprueft)
#[derive(Debug, Clone)]
pub struct Angemeldet(pub AngemeldeterBenutzer);

#[async_trait]
impl FromRequestParts<ApiState> for Angemeldet {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let Anmeldung(daten) = match Anmeldung::from_request_parts(parts, state).await {
            Ok(a) => a,
            Err(never) => match never {},
        };
        let benutzer = state.gate().authentifizieren(&daten).await?;
        Ok(Self(benutzer))
    }
}

/// Authentifizierter Benutzer mit `admin:*`
#[derive(Debug, Clone)]
pub struct Admin(pub AngemeldeterBenutzer);

#[async_trait]
impl FromRequestParts<ApiState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let Anmeldung(daten) = match Anmeldung::from_request_parts(parts, state).await {
            Ok(a) => a,
            Err(never) => match never {},
        };
        let benutzer = state.admin_gate.authentifizieren(&daten).await?;
        Ok(Self(benutzer))
    }
}

/// JSON-Body, dessen Fehler als `400` im API-Umschlag gemeldet werden
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(wert)) => Ok(Self(wert)),
            Err(rejection) => Err(rejection_zu_fehler(rejection)),
        }
    }
}

fn rejection_zu_fehler(rejection: JsonRejection) -> ApiError {
    tracing::debug!(fehler = %rejection, "Ungueltiger JSON-Body");
    ApiError::UngueltigeEingabe(rejection.body_text())
}
