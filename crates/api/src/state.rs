//! Axum-State der REST-API

use std::sync::Arc;

use turnstile_auth::{AuthDienste, AuthKonfig, AuthService, AuthenticationGate, PermissionGate};

/// Berechtigung fuer alle `/admin`-Routen
pub const ADMIN_BERECHTIGUNG: &str = "admin:*";

/// Geteilter Zustand aller Handler
#[derive(Clone)]
pub struct ApiState {
    pub auth: AuthDienste,
    pub admin_gate: PermissionGate,
}

impl ApiState {
    pub fn neu(auth: AuthDienste) -> Self {
        let admin_gate = auth.gate.require_permissions([ADMIN_BERECHTIGUNG]);
        Self { auth, admin_gate }
    }

    pub fn service(&self) -> &Arc<AuthService> {
        &self.auth.service
    }

    pub fn gate(&self) -> &Arc<AuthenticationGate> {
        &self.auth.gate
    }

    pub fn konfig(&self) -> &AuthKonfig {
        &self.auth.konfig
    }
}
