//! # turnstile-api
//!
//! REST-Schnittstelle fuer Turnstile (Axum, Prefix `/api/v1`):
//! - `auth`: Registrierung, Login, Refresh, Logout
//! - `user`: eigenes Profil und eigene Sessions
//! - `admin`: Benutzerverwaltung (erfordert `admin:*`)
//!
//! Alle Antworten verwenden den Umschlag `{ code, message, data }`.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiAntwort, ApiError, ApiResult};
pub use routes::api_router;
pub use server::{RestServer, RestServerKonfig};
pub use state::ApiState;
