//! Header-Hilfsfunktionen: Bearer-Token, Client-IP, Geraet und Refresh-Cookie

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use turnstile_auth::{AuthKonfig, GeraeteInfo};

/// Name des Refresh-Cookies
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Extrahiert den Client-IP aus den Request-Headern
///
/// Erster Eintrag von `X-Forwarded-For`, sonst `X-Real-IP`, sonst `unknown`.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or("unknown")
        .to_string()
}

/// Extrahiert Bearer-Token aus Authorization-Header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Kurzbeschreibung "Browser | Betriebssystem" aus einem User-Agent
pub fn geraet_beschreibung(user_agent: &str) -> String {
    let browser = if user_agent.contains("Edg/") {
        Some("Edge")
    } else if user_agent.contains("OPR/") || user_agent.contains("Opera") {
        Some("Opera")
    } else if user_agent.contains("Firefox/") {
        Some("Firefox")
    } else if user_agent.contains("Chrome/") || user_agent.contains("CriOS/") {
        Some("Chrome")
    } else if user_agent.contains("Safari/") {
        Some("Safari")
    } else if user_agent.starts_with("curl/") {
        Some("curl")
    } else {
        None
    };

    // Reihenfolge: Android-UAs enthalten "Linux", iOS-UAs "Mac OS X"
    let os = if user_agent.contains("Windows") {
        Some("Windows")
    } else if user_agent.contains("Android") {
        Some("Android")
    } else if user_agent.contains("iPhone") || user_agent.contains("iPad") {
        Some("iOS")
    } else if user_agent.contains("Mac OS X") || user_agent.contains("Macintosh") {
        Some("macOS")
    } else if user_agent.contains("Linux") {
        Some("Linux")
    } else {
        None
    };

    let teile: Vec<&str> = [browser, os].into_iter().flatten().collect();
    if teile.is_empty() {
        "Unknown".to_string()
    } else {
        teile.join(" | ")
    }
}

/// Geraete- und Verbindungsdaten fuer eine neue Session
pub fn geraete_info(headers: &HeaderMap) -> GeraeteInfo {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    GeraeteInfo {
        device_info: Some(geraet_beschreibung(user_agent.as_deref().unwrap_or(""))),
        ip_address: Some(client_ip(headers)),
        user_agent,
    }
}

fn refresh_cookie(wert: String, max_age: Duration, konfig: &AuthKonfig) -> String {
    Cookie::build((REFRESH_COOKIE, wert))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(konfig.produktion)
        .path("/")
        .max_age(max_age)
        .build()
        .to_string()
}

/// `Set-Cookie`-Wert fuer ein neues Refresh-Token
pub fn refresh_cookie_setzen(token: &str, konfig: &AuthKonfig) -> String {
    refresh_cookie(
        token.to_string(),
        Duration::seconds(konfig.refresh_ttl_sekunden()),
        konfig,
    )
}

/// `Set-Cookie`-Wert der das Refresh-Cookie loescht (gleiche Attribute)
pub fn refresh_cookie_entfernen(konfig: &AuthKonfig) -> String {
    refresh_cookie(String::new(), Duration::ZERO, konfig)
}
