//! # turnstile-observability
//!
//! Observability-Crate fuer Turnstile:
//! - Health-Check-Endpunkte (`/health`, `/ready`)
//! - Structured Logging (Text oder JSON) via tracing-subscriber

pub mod health;
pub mod logging;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
