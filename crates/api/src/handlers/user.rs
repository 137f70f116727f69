//! REST-Handler fuer `/user`: eigenes Profil und eigene Sessions

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use turnstile_auth::BenutzerAenderung;
use turnstile_core::SessionId;
use turnstile_db::SessionRecord;

use crate::error::{ApiAntwort, ApiResult};
use crate::extract::{Angemeldet, JsonBody};
use crate::handlers::Widerrufen;
use crate::middleware::refresh_cookie_entfernen;
use crate::state::ApiState;

/// `GET /user`
pub async fn get_user(
    State(state): State<ApiState>,
    Angemeldet(angemeldet): Angemeldet,
) -> ApiResult<impl IntoResponse> {
    let profil = state.service().profil(&angemeldet.benutzer).await?;
    Ok(ApiAntwort::ok("Profil geladen", profil))
}

/// `PUT /user`
pub async fn update_user(
    State(state): State<ApiState>,
    Angemeldet(angemeldet): Angemeldet,
    JsonBody(body): JsonBody<BenutzerAenderung>,
) -> ApiResult<impl IntoResponse> {
    let profil = state
        .service()
        .profil_aktualisieren(angemeldet.benutzer.id, body)
        .await?;
    Ok(ApiAntwort::ok("Profil aktualisiert", profil))
}

/// `DELETE /user` – deaktiviert das eigene Konto
pub async fn delete_user(
    State(state): State<ApiState>,
    Angemeldet(angemeldet): Angemeldet,
) -> ApiResult<impl IntoResponse> {
    let anzahl = state.service().konto_loeschen(angemeldet.benutzer.id).await?;
    Ok((
        [(SET_COOKIE, refresh_cookie_entfernen(state.konfig()))],
        ApiAntwort::ok(
            "Konto geloescht",
            Widerrufen {
                revoked_sessions: anzahl,
            },
        ),
    ))
}

/// Session ohne Refresh-Identifier
#[derive(Debug, Serialize)]
pub struct SessionAnsicht {
    pub id: SessionId,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Session der aktuellen Anfrage
    pub is_current: bool,
}

impl SessionAnsicht {
    fn aus(s: SessionRecord, aktuelle: SessionId) -> Self {
        Self {
            is_current: s.id == aktuelle,
            id: s.id,
            device_info: s.device_info,
            ip_address: s.ip_address,
            user_agent: s.user_agent,
            created_at: s.created_at,
            last_activity: s.last_activity,
            expires_at: s.expires_at,
        }
    }
}

/// `GET /user/sessions`
pub async fn list_sessions(
    State(state): State<ApiState>,
    Angemeldet(angemeldet): Angemeldet,
) -> ApiResult<impl IntoResponse> {
    let aktuelle = angemeldet.session.id;
    let sessions: Vec<SessionAnsicht> = state
        .service()
        .sessions_auflisten(angemeldet.benutzer.id)
        .await?
        .into_iter()
        .map(|s| SessionAnsicht::aus(s, aktuelle))
        .collect();
    Ok(ApiAntwort::ok("Sessions geladen", sessions))
}
