//! Fehler- und Antworttypen der REST-API
//!
//! Jede Antwort verwendet den Umschlag `{ code, message, data }`. Erfolg hat
//! `code = 0`, Fehler tragen den HTTP-Status als `code` und `data = null`.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use turnstile_auth::AuthError;

/// Fehler an der HTTP-Grenze
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NichtAuthentifiziert(String),

    #[error("{0}")]
    Verboten(String),

    #[error("{0}")]
    NichtGefunden(String),

    #[error("{0}")]
    Konflikt(String),

    #[error("{0}")]
    UngueltigeEingabe(String),

    /// Details werden nur geloggt, nie ausgeliefert
    #[error("Interner Serverfehler")]
    Intern,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NichtAuthentifiziert(_) => StatusCode::UNAUTHORIZED,
            Self::Verboten(_) => StatusCode::FORBIDDEN,
            Self::NichtGefunden(_) => StatusCode::NOT_FOUND,
            Self::Konflikt(_) => StatusCode::CONFLICT,
            Self::UngueltigeEingabe(_) => StatusCode::BAD_REQUEST,
            Self::Intern => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::NichtAuthentifiziert(msg) => Self::NichtAuthentifiziert(msg),
            AuthError::TokenAbgelaufen => Self::NichtAuthentifiziert("Token abgelaufen".into()),
            AuthError::TokenUngueltig => Self::NichtAuthentifiziert("Token ungueltig".into()),
            AuthError::Verboten(msg) => Self::Verboten(msg),
            AuthError::NichtGefunden(msg) => Self::NichtGefunden(msg),
            AuthError::Konflikt(msg) => Self::Konflikt(msg),
            AuthError::UngueltigeEingabe(msg) => Self::UngueltigeEingabe(msg),
            andere @ (AuthError::PasswortHashing(_)
            | AuthError::Datenbank(_)
            | AuthError::Intern(_)) => {
                tracing::error!(fehler = %andere, "Interner Fehler bei Anfrage");
                Self::Intern
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "code": status.as_u16(),
            "message": self.to_string(),
            "data": null,
        }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Erfolgs-Umschlag
#[derive(Debug, Serialize)]
pub struct ApiAntwort<T: Serialize> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiAntwort<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            code: 0,
            message: message.into(),
            data,
        })
    }
}
