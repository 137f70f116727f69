//! REST-Handler fuer `/auth`: Registrierung, Login, Refresh, Logout

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use turnstile_auth::{BenutzerProfil, Registrierung, TokenAntwort};

use crate::error::{ApiAntwort, ApiError, ApiResult};
use crate::extract::{Angemeldet, Anmeldung, JsonBody};
use crate::handlers::Widerrufen;
use crate::middleware::{geraete_info, refresh_cookie_entfernen, refresh_cookie_setzen};
use crate::state::ApiState;

/// `POST /auth/register`
pub async fn register(
    State(state): State<ApiState>,
    JsonBody(body): JsonBody<Registrierung>,
) -> ApiResult<impl IntoResponse> {
    let profil = state.service().register(body).await?;
    Ok((
        StatusCode::CREATED,
        ApiAntwort::ok("Benutzer registriert", profil),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    /// Username oder E-Mail
    #[serde(alias = "identifier", alias = "username")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginDaten {
    pub token: TokenAntwort,
    pub user: BenutzerProfil,
}

/// `POST /auth/login` – setzt das Refresh-Cookie
pub async fn login(
    State(state): State<ApiState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<LoginBody>,
) -> ApiResult<impl IntoResponse> {
    let ergebnis = state
        .service()
        .login(&body.email, &body.password, geraete_info(&headers))
        .await?;

    let cookie = refresh_cookie_setzen(&ergebnis.refresh_token, state.konfig());
    Ok((
        [(SET_COOKIE, cookie)],
        ApiAntwort::ok(
            "Anmeldung erfolgreich",
            LoginDaten {
                token: ergebnis.token,
                user: ergebnis.benutzer,
            },
        ),
    ))
}

#[derive(Debug, Serialize)]
pub struct RefreshDaten {
    pub token: TokenAntwort,
}

/// `POST /auth/refresh` – neues Access-Token, kein neues Cookie
pub async fn refresh(
    State(state): State<ApiState>,
    Angemeldet(angemeldet): Angemeldet,
    Anmeldung(daten): Anmeldung,
) -> ApiResult<impl IntoResponse> {
    let token = state
        .service()
        .refresh(daten.refresh_cookie.as_deref(), &angemeldet.benutzer)
        .await?;
    Ok(ApiAntwort::ok("Token erneuert", RefreshDaten { token }))
}

/// `POST /auth/logout` – loescht das Refresh-Cookie in jedem Fall
pub async fn logout(State(state): State<ApiState>, Anmeldung(daten): Anmeldung) -> Response {
    let entfernen = [(SET_COOKIE, refresh_cookie_entfernen(state.konfig()))];
    let ergebnis = state
        .service()
        .logout(daten.bearer.as_deref(), daten.refresh_cookie.as_deref())
        .await;

    match ergebnis {
        Ok(()) => (
            entfernen,
            ApiAntwort::ok("Abgemeldet", Widerrufen { revoked_sessions: 1 }),
        )
            .into_response(),
        Err(e) => (entfernen, ApiError::from(e)).into_response(),
    }
}
