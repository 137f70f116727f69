//! Session-Management fuer Turnstile
//!
//! Der [`SessionService`] ist der einzige Ort, an dem Session-Datensaetze
//! veraendert werden. Jede Anmeldung erzeugt eine eigene Session mit
//! eigenem Refresh-Identifier; Sessions sind einzeln widerrufbar.
//! Ein Hintergrund-Task loescht abgelaufene Sessions periodisch.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rand::RngCore;
use tokio::task::JoinHandle;

use turnstile_core::{SessionId, UserId};
use turnstile_db::{BenutzerRecord, SessionRecord, SessionRepository};

use crate::clock::Uhr;
use crate::config::AuthKonfig;
use crate::error::{AuthError, AuthResult};
use crate::token::{TokenCodec, TokenInhalt, TokenTyp};

/// Standard-Intervall fuer den Cleanup-Task: 15 Minuten
pub const CLEANUP_INTERVALL: Duration = Duration::from_secs(15 * 60);

/// Geraete- und Verbindungsdaten einer Anmeldung
#[derive(Debug, Clone, Default)]
pub struct GeraeteInfo {
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Ergebnis von [`SessionService::create_session`]
#[derive(Debug, Clone)]
pub struct NeueSession {
    pub access_token: String,
    /// Nur fuer das Cookie bestimmt, nie fuer einen Response-Body
    pub refresh_token: String,
    pub session: SessionRecord,
}

/// Erstellt, prueft und widerruft Sessions
pub struct SessionService {
    store: Arc<dyn SessionRepository>,
    codec: Arc<TokenCodec>,
    konfig: Arc<AuthKonfig>,
    uhr: Arc<dyn Uhr>,
}

impl SessionService {
    pub fn neu(
        store: Arc<dyn SessionRepository>,
        codec: Arc<TokenCodec>,
        konfig: Arc<AuthKonfig>,
        uhr: Arc<dyn Uhr>,
    ) -> Self {
        Self {
            store,
            codec,
            konfig,
            uhr,
        }
    }

    /// Startet den periodischen Cleanup-Task
    pub fn sweep_starten(self: &Arc<Self>, intervall: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(intervall).await;
                match service.cleanup_expired().await {
                    Ok(0) => {}
                    Ok(anzahl) => {
                        tracing::info!(anzahl, "Abgelaufene Sessions geloescht");
                    }
                    Err(e) => {
                        tracing::warn!(fehler = %e, "Session-Cleanup fehlgeschlagen");
                    }
                }
            }
        })
    }

    /// Legt eine neue Session an und stellt Access- und Refresh-Token aus
    ///
    /// Bei einer Eindeutigkeitsverletzung wird genau einmal mit frischen
    /// Identifikatoren wiederholt; ein zweiter Konflikt ergibt `Konflikt`.
    pub async fn create_session(
        &self,
        benutzer: &BenutzerRecord,
        geraet: GeraeteInfo,
    ) -> AuthResult<NeueSession> {
        let jetzt = self.uhr.jetzt();
        let mut session = SessionRecord {
            id: SessionId::new(),
            user_id: benutzer.id,
            refresh_identifier: refresh_identifier_generieren(),
            device_info: kuerzen(geraet.device_info, SessionRecord::MAX_GERAET),
            ip_address: kuerzen(geraet.ip_address, SessionRecord::MAX_IP),
            user_agent: kuerzen(geraet.user_agent, SessionRecord::MAX_USER_AGENT),
            expires_at: jetzt + self.konfig.refresh_ttl,
            is_active: true,
            created_at: jetzt,
            last_activity: jetzt,
        };

        let mut versuch = 0;
        loop {
            match self.store.insert(&session).await {
                Ok(()) => break,
                Err(e) if e.ist_eindeutigkeit() && versuch == 0 => {
                    tracing::warn!(
                        user_id = %benutzer.id,
                        "Session-Identifier bereits vergeben, neuer Versuch"
                    );
                    session.id = SessionId::new();
                    session.refresh_identifier = refresh_identifier_generieren();
                    versuch += 1;
                }
                Err(e) if e.ist_eindeutigkeit() => {
                    return Err(AuthError::Konflikt(
                        "Session-Identifier wiederholt vergeben".into(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let access_token = self.access_token_erstellen(session.user_id, session.id)?;
        let refresh_token = self.codec.encode(
            TokenInhalt::refresh(
                session.user_id,
                session.id,
                session.refresh_identifier.clone(),
            ),
            session.expires_at,
        )?;

        tracing::info!(
            user_id = %session.user_id,
            session_id = %session.id.kurz(),
            "Neue Session erstellt"
        );

        Ok(NeueSession {
            access_token,
            refresh_token,
            session,
        })
    }

    /// Prueft ob eine Session gueltig ist und aktualisiert `last_activity`
    ///
    /// `None` wenn die Session fehlt, widerrufen oder abgelaufen ist.
    pub async fn validate_session(&self, id: SessionId) -> AuthResult<Option<SessionRecord>> {
        let jetzt = self.uhr.jetzt();
        let Some(mut session) = self.store.get(id).await? else {
            return Ok(None);
        };
        if !session.ist_gueltig(jetzt) {
            tracing::debug!(session_id = %id.kurz(), "Session ungueltig");
            return Ok(None);
        }

        self.store.update_last_activity(id, jetzt).await?;
        session.last_activity = session.last_activity.max(jetzt);
        Ok(Some(session))
    }

    /// Stellt mit einem Refresh-Token ein neues Access-Token aus
    ///
    /// Jeder Fehlschlag ergibt einheitlich `None`. Passt das Token nicht zur
    /// gespeicherten Session oder zum angemeldeten Benutzer, wird die Session
    /// vorher widerrufen. Das Refresh-Token selbst wird nicht rotiert.
    pub async fn refresh_session(
        &self,
        refresh_token: &str,
        benutzer: &BenutzerRecord,
    ) -> AuthResult<Option<String>> {
        let claims = match self.codec.decode(refresh_token) {
            Ok(c) if c.typ == TokenTyp::Refresh => c,
            Ok(_) | Err(_) => {
                tracing::debug!(user_id = %benutzer.id, "Refresh: Token ungueltig");
                return Ok(None);
            }
        };
        let Some(refresh_identifier) = claims.jti.as_deref() else {
            return Ok(None);
        };

        let Some(session) = self
            .store
            .find_by_refresh_identifier(refresh_identifier)
            .await?
        else {
            tracing::debug!(user_id = %benutzer.id, "Refresh: Session unbekannt");
            return Ok(None);
        };

        let jetzt = self.uhr.jetzt();
        if !session.ist_gueltig(jetzt) {
            tracing::debug!(session_id = %session.id.kurz(), "Refresh: Session ungueltig");
            return Ok(None);
        }

        if claims.sid != session.id || claims.uid != session.user_id || session.user_id != benutzer.id
        {
            tracing::warn!(
                session_id = %session.id.kurz(),
                user_id = %benutzer.id,
                "Refresh: Token passt nicht zur Session, Session wird widerrufen"
            );
            self.store.revoke(session.id).await?;
            return Ok(None);
        }

        if !benutzer.is_active {
            tracing::warn!(
                session_id = %session.id.kurz(),
                user_id = %benutzer.id,
                "Refresh: Benutzer deaktiviert, Session wird widerrufen"
            );
            self.store.revoke(session.id).await?;
            return Ok(None);
        }

        self.store.update_last_activity(session.id, jetzt).await?;
        let access_token = self.access_token_erstellen(session.user_id, session.id)?;

        tracing::debug!(session_id = %session.id.kurz(), "Access-Token erneuert");
        Ok(Some(access_token))
    }

    /// Widerruft eine Session. `false` wenn sie fehlt oder schon inaktiv ist.
    pub async fn revoke_session(&self, id: SessionId) -> AuthResult<bool> {
        let widerrufen = self.store.revoke(id).await?;
        if widerrufen {
            tracing::info!(session_id = %id.kurz(), "Session widerrufen");
        }
        Ok(widerrufen)
    }

    /// Widerruft alle Sessions eines Benutzers
    ///
    /// Muss bei jeder Deaktivierung eines Benutzers aufgerufen werden.
    pub async fn revoke_all_sessions_for_user(&self, user_id: UserId) -> AuthResult<u64> {
        let anzahl = self.store.revoke_all_for_user(user_id).await?;
        if anzahl > 0 {
            tracing::info!(user_id = %user_id, anzahl, "Alle Sessions des Benutzers widerrufen");
        }
        Ok(anzahl)
    }

    /// Aktive Sessions eines Benutzers, zuletzt benutzte zuerst
    pub async fn list_sessions_for_user(&self, user_id: UserId) -> AuthResult<Vec<SessionRecord>> {
        Ok(self.store.list_active_by_user(user_id).await?)
    }

    /// Loescht alle Sessions mit `expires_at < jetzt`, auch widerrufene
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let anzahl = self.store.delete_expired(self.uhr.jetzt()).await?;
        tracing::debug!(anzahl, "Session-Cleanup durchgefuehrt");
        Ok(anzahl)
    }

    /// Stellt ein Access-Token fuer eine bestehende Session aus
    pub fn access_token_erstellen(&self, user_id: UserId, session_id: SessionId) -> AuthResult<String> {
        self.codec.encode(
            TokenInhalt::access(user_id, session_id),
            self.access_ablauf(self.uhr.jetzt()),
        )
    }

    fn access_ablauf(&self, jetzt: DateTime<Utc>) -> DateTime<Utc> {
        jetzt + self.konfig.access_ttl
    }
}

/// Generiert einen kryptografisch sicheren Refresh-Identifier (URL-sicheres Base64)
fn refresh_identifier_generieren() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Kuerzt auf hoechstens `max` Zeichen
fn kuerzen(wert: Option<String>, max: usize) -> Option<String> {
    wert.map(|w| {
        if w.chars().count() > max {
            w.chars().take(max).collect()
        } else {
            w
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FesteUhr;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::atomic::{AtomicU32, Ordering};
    use turnstile_core::RoleId;
    use turnstile_db::{DbError, DbResult, SqliteDb};

    struct Umgebung {
        service: SessionService,
        codec: Arc<TokenCodec>,
        db: Arc<SqliteDb>,
        uhr: Arc<FesteUhr>,
    }

    async fn umgebung_mit_store(store: Option<Arc<dyn SessionRepository>>) -> Umgebung {
        let uhr = Arc::new(FesteUhr::neu(
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        ));
        let konfig = Arc::new(AuthKonfig::neu("test-secret"));
        let codec = Arc::new(TokenCodec::neu(&konfig, uhr.clone()));
        let db = Arc::new(SqliteDb::in_memory().await.unwrap());
        let store = store.unwrap_or_else(|| db.clone() as Arc<dyn SessionRepository>);
        let service = SessionService::neu(store, codec.clone(), konfig, uhr.clone());
        Umgebung {
            service,
            codec,
            db,
            uhr,
        }
    }

    async fn umgebung() -> Umgebung {
        umgebung_mit_store(None).await
    }

    fn benutzer() -> BenutzerRecord {
        BenutzerRecord {
            id: UserId::new(),
            username: "alice".into(),
            email: "a@x.com".into(),
            full_name: None,
            password_hash: "hash".into(),
            role_id: RoleId::new(),
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2029, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn session_erstellen_und_validieren() {
        let u = umgebung().await;
        let b = benutzer();

        let neu = u.service.create_session(&b, GeraeteInfo::default()).await.unwrap();
        assert!(neu.session.is_active);
        assert_eq!(neu.session.expires_at, u.uhr.jetzt() + ChronoDuration::days(30));
        assert_ne!(neu.session.refresh_identifier, neu.session.id.to_string());

        let access = u.codec.decode(&neu.access_token).unwrap();
        assert!(access.ist_access());
        assert_eq!(access.sid, neu.session.id);
        assert_eq!(access.uid, b.id);

        let refresh = u.codec.decode(&neu.refresh_token).unwrap();
        assert!(refresh.ist_refresh());
        assert_eq!(refresh.jti.as_deref(), Some(neu.session.refresh_identifier.as_str()));

        let gueltig = u.service.validate_session(neu.session.id).await.unwrap();
        assert!(gueltig.is_some());
    }

    #[tokio::test]
    async fn gueltig_bis_ablauf_und_danach_nicht() {
        let u = umgebung().await;
        let neu = u
            .service
            .create_session(&benutzer(), GeraeteInfo::default())
            .await
            .unwrap();

        u.uhr.setzen(neu.session.expires_at);
        assert!(u.service.validate_session(neu.session.id).await.unwrap().is_some());

        u.uhr.vorstellen(ChronoDuration::seconds(1));
        assert!(u.service.validate_session(neu.session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn validieren_aktualisiert_letzte_aktivitaet() {
        let u = umgebung().await;
        let neu = u
            .service
            .create_session(&benutzer(), GeraeteInfo::default())
            .await
            .unwrap();

        u.uhr.vorstellen(ChronoDuration::minutes(5));
        let s = u.service.validate_session(neu.session.id).await.unwrap().unwrap();
        assert_eq!(s.last_activity, u.uhr.jetzt());

        let gespeichert = u.db.get(neu.session.id).await.unwrap().unwrap();
        assert_eq!(gespeichert.last_activity, u.uhr.jetzt());
    }

    #[tokio::test]
    async fn unbekannte_session_ist_ungueltig() {
        let u = umgebung().await;
        assert!(u.service.validate_session(SessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn widerruf_ist_idempotent() {
        let u = umgebung().await;
        let neu = u
            .service
            .create_session(&benutzer(), GeraeteInfo::default())
            .await
            .unwrap();

        assert!(u.service.revoke_session(neu.session.id).await.unwrap());
        assert!(!u.service.revoke_session(neu.session.id).await.unwrap());
        assert!(u.service.validate_session(neu.session.id).await.unwrap().is_none());
        assert!(!u.service.revoke_session(SessionId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn refresh_liefert_neues_access_token() {
        let u = umgebung().await;
        let b = benutzer();
        let neu = u.service.create_session(&b, GeraeteInfo::default()).await.unwrap();

        u.uhr.vorstellen(ChronoDuration::minutes(20));
        let access = u
            .service
            .refresh_session(&neu.refresh_token, &b)
            .await
            .unwrap()
            .expect("Refresh sollte gelingen");

        let claims = u.codec.decode(&access).unwrap();
        assert!(claims.ist_access());
        assert_eq!(claims.sid, neu.session.id);

        // Ohne Rotation bleibt das Refresh-Token verwendbar
        assert!(u
            .service
            .refresh_session(&neu.refresh_token, &b)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn refresh_mit_access_token_schlaegt_fehl() {
        let u = umgebung().await;
        let b = benutzer();
        let neu = u.service.create_session(&b, GeraeteInfo::default()).await.unwrap();

        assert!(u
            .service
            .refresh_session(&neu.access_token, &b)
            .await
            .unwrap()
            .is_none());
        assert!(u
            .service
            .refresh_session("kein-token", &b)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn refresh_mit_fremder_session_id_widerruft() {
        let u = umgebung().await;
        let b = benutzer();
        let neu = u.service.create_session(&b, GeraeteInfo::default()).await.unwrap();

        // Gueltig signiert, aber mit falscher Session-ID
        let gefaelscht = u
            .codec
            .encode(
                TokenInhalt::refresh(b.id, SessionId::new(), neu.session.refresh_identifier.clone()),
                neu.session.expires_at,
            )
            .unwrap();

        assert!(u.service.refresh_session(&gefaelscht, &b).await.unwrap().is_none());
        let s = u.db.get(neu.session.id).await.unwrap().unwrap();
        assert!(!s.is_active, "Session muss widerrufen sein");

        // Auch das echte Token ist danach wertlos
        assert!(u
            .service
            .refresh_session(&neu.refresh_token, &b)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn refresh_durch_anderen_benutzer_widerruft() {
        let u = umgebung().await;
        let b = benutzer();
        let neu = u.service.create_session(&b, GeraeteInfo::default()).await.unwrap();

        let fremder = benutzer();
        assert!(u
            .service
            .refresh_session(&neu.refresh_token, &fremder)
            .await
            .unwrap()
            .is_none());
        assert!(u.service.validate_session(neu.session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_fuer_inaktiven_benutzer_widerruft() {
        let u = umgebung().await;
        let mut b = benutzer();
        let neu = u.service.create_session(&b, GeraeteInfo::default()).await.unwrap();

        b.is_active = false;
        assert!(u.service.refresh_session(&neu.refresh_token, &b).await.unwrap().is_none());
        assert!(!u.db.get(neu.session.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn refresh_nach_session_ablauf_schlaegt_fehl() {
        let u = umgebung().await;
        let b = benutzer();
        let neu = u.service.create_session(&b, GeraeteInfo::default()).await.unwrap();

        u.uhr.setzen(neu.session.expires_at + ChronoDuration::seconds(1));
        assert!(u.service.refresh_session(&neu.refresh_token, &b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn alle_sessions_widerrufen() {
        let u = umgebung().await;
        let b = benutzer();
        let s1 = u.service.create_session(&b, GeraeteInfo::default()).await.unwrap();
        let s2 = u.service.create_session(&b, GeraeteInfo::default()).await.unwrap();
        let anderer = u
            .service
            .create_session(&benutzer(), GeraeteInfo::default())
            .await
            .unwrap();

        assert_eq!(u.service.list_sessions_for_user(b.id).await.unwrap().len(), 2);
        assert_eq!(u.service.revoke_all_sessions_for_user(b.id).await.unwrap(), 2);

        assert!(u.service.validate_session(s1.session.id).await.unwrap().is_none());
        assert!(u.service.validate_session(s2.session.id).await.unwrap().is_none());
        assert!(u.service.list_sessions_for_user(b.id).await.unwrap().is_empty());
        assert!(u
            .service
            .validate_session(anderer.session.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn cleanup_loescht_abgelaufene_sessions() {
        let u = umgebung().await;
        let neu = u
            .service
            .create_session(&benutzer(), GeraeteInfo::default())
            .await
            .unwrap();

        u.uhr.setzen(neu.session.expires_at + ChronoDuration::seconds(1));
        assert_eq!(u.service.cleanup_expired().await.unwrap(), 1);
        assert!(u.db.get(neu.session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lange_geraetedaten_werden_gekuerzt() {
        let u = umgebung().await;
        let neu = u
            .service
            .create_session(
                &benutzer(),
                GeraeteInfo {
                    device_info: Some("g".repeat(300)),
                    ip_address: Some("1".repeat(60)),
                    user_agent: Some("u".repeat(800)),
                },
            )
            .await
            .unwrap();

        let s = u.db.get(neu.session.id).await.unwrap().unwrap();
        assert_eq!(s.device_info.unwrap().len(), SessionRecord::MAX_GERAET);
        assert_eq!(s.ip_address.unwrap().len(), SessionRecord::MAX_IP);
        assert_eq!(s.user_agent.unwrap().len(), SessionRecord::MAX_USER_AGENT);
    }

    /// Store, dessen erste `konflikte` Inserts mit Eindeutigkeitsfehler scheitern
    struct KonfliktStore {
        inner: Arc<SqliteDb>,
        konflikte: AtomicU32,
    }

    #[async_trait]
    impl SessionRepository for KonfliktStore {
        async fn insert(&self, session: &SessionRecord) -> DbResult<()> {
            let rest = self.konflikte.load(Ordering::SeqCst);
            if rest > 0 {
                self.konflikte.store(rest - 1, Ordering::SeqCst);
                return Err(DbError::Eindeutigkeit("refresh_identifier".into()));
            }
            self.inner.insert(session).await
        }
        async fn get(&self, id: SessionId) -> DbResult<Option<SessionRecord>> {
            self.inner.get(id).await
        }
        async fn find_by_refresh_identifier(&self, rid: &str) -> DbResult<Option<SessionRecord>> {
            self.inner.find_by_refresh_identifier(rid).await
        }
        async fn list_active_by_user(&self, user_id: UserId) -> DbResult<Vec<SessionRecord>> {
            self.inner.list_active_by_user(user_id).await
        }
        async fn update_last_activity(&self, id: SessionId, zeit: DateTime<Utc>) -> DbResult<()> {
            self.inner.update_last_activity(id, zeit).await
        }
        async fn revoke(&self, id: SessionId) -> DbResult<bool> {
            self.inner.revoke(id).await
        }
        async fn revoke_all_for_user(&self, user_id: UserId) -> DbResult<u64> {
            self.inner.revoke_all_for_user(user_id).await
        }
        async fn delete_expired(&self, jetzt: DateTime<Utc>) -> DbResult<u64> {
            self.inner.delete_expired(jetzt).await
        }
    }

    #[tokio::test]
    async fn konflikt_wird_einmal_wiederholt() {
        let db = Arc::new(SqliteDb::in_memory().await.unwrap());
        let store: Arc<dyn SessionRepository> = Arc::new(KonfliktStore {
            inner: db.clone(),
            konflikte: AtomicU32::new(1),
        });
        let u = umgebung_mit_store(Some(store)).await;

        let neu = u
            .service
            .create_session(&benutzer(), GeraeteInfo::default())
            .await
            .expect("Zweiter Versuch sollte gelingen");
        assert!(db.get(neu.session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn zweiter_konflikt_wird_gemeldet() {
        let db = Arc::new(SqliteDb::in_memory().await.unwrap());
        let store: Arc<dyn SessionRepository> = Arc::new(KonfliktStore {
            inner: db,
            konflikte: AtomicU32::new(2),
        });
        let u = umgebung_mit_store(Some(store)).await;

        let err = u
            .service
            .create_session(&benutzer(), GeraeteInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Konflikt(_)));
    }

    #[tokio::test]
    async fn sweep_task_raeumt_auf() {
        let u = umgebung().await;
        let neu = u
            .service
            .create_session(&benutzer(), GeraeteInfo::default())
            .await
            .unwrap();
        u.uhr.setzen(neu.session.expires_at + ChronoDuration::seconds(1));

        let service = Arc::new(u.service);
        let handle = service.sweep_starten(Duration::from_millis(20));

        let mut geloescht = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if u.db.get(neu.session.id).await.unwrap().is_none() {
                geloescht = true;
                break;
            }
        }
        handle.abort();
        assert!(geloescht, "Sweep-Task sollte die Session geloescht haben");
    }
}
