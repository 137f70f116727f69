//! REST-Handler fuer `/admin/users` (erfordert `admin:*`)

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
};
use serde::Deserialize;

use turnstile_auth::BenutzerAenderung;
use turnstile_core::UserId;

use crate::error::{ApiAntwort, ApiError, ApiResult};
use crate::extract::{Admin, JsonBody};
use crate::handlers::Widerrufen;
use crate::state::ApiState;

#[derive(Debug, Deserialize)]
pub struct SeitenParameter {
    #[serde(default = "standard_seite")]
    pub page: u64,
    #[serde(default = "standard_groesse")]
    pub size: u64,
}

fn standard_seite() -> u64 {
    1
}

fn standard_groesse() -> u64 {
    10
}

fn pfad_id(pfad: Result<Path<UserId>, PathRejection>) -> ApiResult<UserId> {
    pfad.map(|Path(id)| id)
        .map_err(|e| ApiError::UngueltigeEingabe(e.body_text()))
}

/// `GET /admin/users?page=&size=`
pub async fn list_users(
    State(state): State<ApiState>,
    Admin(_admin): Admin,
    query: Result<Query<SeitenParameter>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(p) = query.map_err(|e| ApiError::UngueltigeEingabe(e.body_text()))?;
    let seite = state.service().admin_benutzer_auflisten(p.page, p.size).await?;
    Ok(ApiAntwort::ok("Benutzer geladen", seite))
}

/// `PUT /admin/users/:id`
pub async fn update_user(
    State(state): State<ApiState>,
    Admin(admin): Admin,
    pfad: Result<Path<UserId>, PathRejection>,
    JsonBody(body): JsonBody<BenutzerAenderung>,
) -> ApiResult<impl IntoResponse> {
    let ziel = pfad_id(pfad)?;
    let profil = state
        .service()
        .admin_benutzer_aktualisieren(admin.benutzer.id, ziel, body)
        .await?;
    Ok(ApiAntwort::ok("Benutzer aktualisiert", profil))
}

/// `DELETE /admin/users/:id` – Soft-Delete
pub async fn delete_user(
    State(state): State<ApiState>,
    Admin(admin): Admin,
    pfad: Result<Path<UserId>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let ziel = pfad_id(pfad)?;
    let anzahl = state
        .service()
        .admin_benutzer_loeschen(admin.benutzer.id, ziel)
        .await?;
    Ok(ApiAntwort::ok(
        "Benutzer deaktiviert",
        Widerrufen {
            revoked_sessions: anzahl,
        },
    ))
}
