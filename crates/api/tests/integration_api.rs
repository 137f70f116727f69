//! Integrationstests fuer die REST-API (In-Memory SQLite, ohne Netzwerk)

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use turnstile_api::{api_router, ApiState};
use turnstile_auth::{Argon2Hasher, AuthDienste, AuthKonfig, FesteUhr};
use turnstile_db::{SessionRepository, SqliteDb};

struct Antwort {
    status: StatusCode,
    headers: HeaderMap,
    json: Value,
}

impl Antwort {
    fn cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }

    /// Wert des Refresh-Cookies aus `Set-Cookie`
    fn refresh_token(&self) -> String {
        let cookie = self.cookie().unwrap();
        cookie
            .strip_prefix("refresh_token=")
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    fn access_token(&self) -> String {
        self.json["data"]["token"]["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

async fn app() -> (Router, Arc<SqliteDb>) {
    let uhr = Arc::new(FesteUhr::neu(
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
    ));
    let db = Arc::new(SqliteDb::in_memory().await.unwrap());
    let dienste = AuthDienste::aufbauen(
        Arc::new(AuthKonfig::neu("api-secret")),
        uhr,
        Arc::new(Argon2Hasher::mit_parametern(1024, 1, 1).unwrap()),
        db.clone(),
        db.clone(),
        db.clone(),
    );
    dienste.service.standard_rollen_anlegen().await.unwrap();
    (api_router(ApiState::neu(dienste)), db)
}

async fn senden(
    app: &Router,
    methode: Method,
    pfad: &str,
    body: Option<Value>,
    bearer: Option<&str>,
    cookie: Option<&str>,
) -> Antwort {
    let mut req = Request::builder().method(methode).uri(pfad);
    if let Some(t) = bearer {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    if let Some(c) = cookie {
        req = req.header(header::COOKIE, format!("refresh_token={c}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Antwort {
        status,
        headers,
        json,
    }
}

async fn registrieren(app: &Router, username: &str, email: &str, role: Option<&str>) -> Antwort {
    let mut body = json!({ "username": username, "email": email, "password": "secret" });
    if let Some(r) = role {
        body["role"] = json!(r);
    }
    senden(app, Method::POST, "/api/v1/auth/register", Some(body), None, None).await
}

async fn anmelden(app: &Router, kennung: &str) -> Antwort {
    senden(
        app,
        Method::POST,
        "/api/v1/auth/login",
        Some(json!({ "email": kennung, "password": "secret" })),
        None,
        None,
    )
    .await
}

#[tokio::test]
async fn registrierung_und_login() {
    let (app, db) = app().await;

    let reg = registrieren(&app, "alice", "a@x.com", None).await;
    assert_eq!(reg.status, StatusCode::CREATED);
    assert_eq!(reg.json["code"], 0);
    assert_eq!(reg.json["data"]["username"], "alice");
    assert_eq!(reg.json["data"]["role"], "USER");
    assert!(reg.json["data"].get("password_hash").is_none());

    let login = anmelden(&app, "a@x.com").await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.json["data"]["token"]["expires_in"], 900);
    assert_eq!(login.json["data"]["token"]["token_type"], "bearer");
    assert_eq!(login.json["data"]["user"]["email"], "a@x.com");

    let cookie = login.cookie().unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Max-Age=2592000"));
    assert!(!login.refresh_token().is_empty());
    // Refresh-Token nie im Body
    assert!(!login.json.to_string().contains(&login.refresh_token()));

    let user_id = reg.json["data"]["id"].as_str().unwrap();
    let user_id = turnstile_core::UserId(user_id.parse().unwrap());
    let sessions = db.list_active_by_user(user_id).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].is_active);
}

#[tokio::test]
async fn doppelte_registrierung_ist_konflikt() {
    let (app, _db) = app().await;
    registrieren(&app, "alice", "a@x.com", None).await;

    let zweite = registrieren(&app, "alice", "b@x.com", None).await;
    assert_eq!(zweite.status, StatusCode::CONFLICT);
    assert_eq!(zweite.json["code"], 409);
    assert!(zweite.json["data"].is_null());
}

#[tokio::test]
async fn kaputter_json_body_ist_400() {
    let (app, _db) = app().await;
    let req = Request::post("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ kein json"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["code"], 400);
}

#[tokio::test]
async fn falsches_passwort_ist_401() {
    let (app, _db) = app().await;
    registrieren(&app, "alice", "a@x.com", None).await;

    let login = senden(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        Some(json!({ "email": "alice", "password": "falsch" })),
        None,
        None,
    )
    .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
    assert_eq!(login.headers[header::WWW_AUTHENTICATE], "Bearer");
    assert!(login.cookie().is_none());
}

#[tokio::test]
async fn profil_nur_mit_token() {
    let (app, _db) = app().await;
    registrieren(&app, "alice", "a@x.com", None).await;
    let login = anmelden(&app, "alice").await;

    let ohne = senden(&app, Method::GET, "/api/v1/user", None, None, None).await;
    assert_eq!(ohne.status, StatusCode::UNAUTHORIZED);

    let mit = senden(
        &app,
        Method::GET,
        "/api/v1/user",
        None,
        Some(&login.access_token()),
        None,
    )
    .await;
    assert_eq!(mit.status, StatusCode::OK);
    assert_eq!(mit.json["data"]["username"], "alice");

    // Refresh-Token als Bearer wird abgewiesen
    let verwechselt = senden(
        &app,
        Method::GET,
        "/api/v1/user",
        None,
        Some(&login.refresh_token()),
        None,
    )
    .await;
    assert_eq!(verwechselt.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_ueber_cookie() {
    let (app, _db) = app().await;
    registrieren(&app, "alice", "a@x.com", None).await;
    let login = anmelden(&app, "alice").await;

    let refresh = senden(
        &app,
        Method::POST,
        "/api/v1/auth/refresh",
        None,
        None,
        Some(&login.refresh_token()),
    )
    .await;
    assert_eq!(refresh.status, StatusCode::OK);
    assert!(refresh.cookie().is_none());
    let neu = refresh.access_token();

    let profil = senden(&app, Method::GET, "/api/v1/user", None, Some(&neu), None).await;
    assert_eq!(profil.status, StatusCode::OK);

    // Ohne Cookie kein Refresh
    let ohne = senden(
        &app,
        Method::POST,
        "/api/v1/auth/refresh",
        None,
        Some(&login.access_token()),
        None,
    )
    .await;
    assert_eq!(ohne.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_loescht_cookie_immer() {
    let (app, _db) = app().await;
    registrieren(&app, "alice", "a@x.com", None).await;
    let login = anmelden(&app, "alice").await;
    let access = login.access_token();

    let erst = senden(&app, Method::POST, "/api/v1/auth/logout", None, Some(&access), None).await;
    assert_eq!(erst.status, StatusCode::OK);
    assert_eq!(erst.json["data"]["revoked_sessions"], 1);
    assert!(erst.cookie().unwrap().contains("Max-Age=0"));

    // Session widerrufen: Access-Token gilt nicht mehr
    let profil = senden(&app, Method::GET, "/api/v1/user", None, Some(&access), None).await;
    assert_eq!(profil.status, StatusCode::UNAUTHORIZED);

    let zweit = senden(&app, Method::POST, "/api/v1/auth/logout", None, Some(&access), None).await;
    assert_eq!(zweit.status, StatusCode::NOT_FOUND);
    assert!(zweit.cookie().unwrap().contains("Max-Age=0"));

    let ohne = senden(&app, Method::POST, "/api/v1/auth/logout", None, None, None).await;
    assert_eq!(ohne.status, StatusCode::BAD_REQUEST);
    assert!(ohne.cookie().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn eigene_sessions_ohne_refresh_identifier() {
    let (app, _db) = app().await;
    registrieren(&app, "alice", "a@x.com", None).await;
    let erste = anmelden(&app, "alice").await;
    anmelden(&app, "alice").await;

    let liste = senden(
        &app,
        Method::GET,
        "/api/v1/user/sessions",
        None,
        Some(&erste.access_token()),
        None,
    )
    .await;
    assert_eq!(liste.status, StatusCode::OK);
    let sessions = liste.json["data"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(
        sessions.iter().filter(|s| s["is_current"] == true).count(),
        1
    );
    assert!(!liste.json.to_string().contains("refresh_identifier"));
}

#[tokio::test]
async fn konto_loeschen_widerruft_sessions() {
    let (app, _db) = app().await;
    registrieren(&app, "alice", "a@x.com", None).await;
    let erste = anmelden(&app, "alice").await;
    let zweite = anmelden(&app, "alice").await;

    let geloescht = senden(
        &app,
        Method::DELETE,
        "/api/v1/user",
        None,
        Some(&erste.access_token()),
        None,
    )
    .await;
    assert_eq!(geloescht.status, StatusCode::OK);
    assert_eq!(geloescht.json["data"]["revoked_sessions"], 2);

    let profil = senden(
        &app,
        Method::GET,
        "/api/v1/user",
        None,
        Some(&zweite.access_token()),
        None,
    )
    .await;
    assert_eq!(profil.status, StatusCode::UNAUTHORIZED);

    let login = anmelden(&app, "alice").await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn eigene_rolle_nicht_aenderbar() {
    let (app, _db) = app().await;
    registrieren(&app, "alice", "a@x.com", None).await;
    let login = anmelden(&app, "alice").await;

    let resp = senden(
        &app,
        Method::PUT,
        "/api/v1/user",
        Some(json!({ "role": "ADMIN" })),
        Some(&login.access_token()),
        None,
    )
    .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = senden(
        &app,
        Method::PUT,
        "/api/v1/user",
        Some(json!({ "full_name": "Alice A." })),
        Some(&login.access_token()),
        None,
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json["data"]["full_name"], "Alice A.");
}

#[tokio::test]
async fn admin_routen_erfordern_admin() {
    let (app, _db) = app().await;
    registrieren(&app, "admin", "admin@x.com", Some("ADMIN")).await;
    let ziel = registrieren(&app, "bob", "b@x.com", None).await;
    let ziel_id = ziel.json["data"]["id"].as_str().unwrap().to_string();

    let admin = anmelden(&app, "admin").await.access_token();
    let bob = anmelden(&app, "bob").await.access_token();

    let verboten = senden(&app, Method::GET, "/api/v1/admin/users", None, Some(&bob), None).await;
    assert_eq!(verboten.status, StatusCode::FORBIDDEN);
    assert_eq!(verboten.json["code"], 403);

    let liste = senden(
        &app,
        Method::GET,
        "/api/v1/admin/users?page=1&size=1",
        None,
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(liste.status, StatusCode::OK);
    assert_eq!(liste.json["data"]["users"].as_array().unwrap().len(), 1);
    assert_eq!(liste.json["data"]["pagination"]["total_items"], 2);
    assert_eq!(liste.json["data"]["pagination"]["has_next"], true);

    let zu_gross = senden(
        &app,
        Method::GET,
        "/api/v1/admin/users?size=101",
        None,
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(zu_gross.status, StatusCode::BAD_REQUEST);

    let kaputte_id = senden(
        &app,
        Method::DELETE,
        "/api/v1/admin/users/keine-uuid",
        None,
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(kaputte_id.status, StatusCode::BAD_REQUEST);

    let geloescht = senden(
        &app,
        Method::DELETE,
        &format!("/api/v1/admin/users/{ziel_id}"),
        None,
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(geloescht.status, StatusCode::OK);
    assert_eq!(geloescht.json["data"]["revoked_sessions"], 1);

    // Bobs Token ist nach der Deaktivierung wertlos
    let profil = senden(&app, Method::GET, "/api/v1/user", None, Some(&bob), None).await;
    assert_eq!(profil.status, StatusCode::UNAUTHORIZED);

    let nochmal = senden(
        &app,
        Method::DELETE,
        &format!("/api/v1/admin/users/{ziel_id}"),
        None,
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(nochmal.status, StatusCode::BAD_REQUEST);
}
