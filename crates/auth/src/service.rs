//! Auth-Service fuer Turnstile
//!
//! Zentraler Service fuer Registrierung, Login, Refresh, Logout sowie die
//! Konto- und Admin-Verwaltung. Nutzt die DB-Repositories, den
//! [`SessionService`] und den [`PasswortHasher`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use turnstile_core::{Permission, SessionId, UserId};
use turnstile_db::{
    BenutzerRecord, BenutzerUpdate, DbError, NeueRolle, NeuerBenutzer, RoleRepository,
    SessionRecord, UserRepository,
};

use crate::config::AuthKonfig;
use crate::error::{AuthError, AuthResult};
use crate::password::PasswortHasher;
use crate::session::{GeraeteInfo, SessionService};
use crate::token::TokenCodec;

/// Rolle fuer neue Benutzer ohne explizite Rollenangabe
pub const STANDARD_ROLLE: &str = "USER";

/// Rollen, die beim Start angelegt werden (Name, Beschreibung, Berechtigungen)
pub const STANDARD_ROLLEN: &[(&str, &str, &[&str])] = &[
    ("USER", "Standardbenutzer", &["user:*"]),
    ("ADMIN", "Administrator", &["admin:*"]),
    ("SUPER_ADMIN", "Vollzugriff", &["*"]),
];

const MAX_USERNAME: usize = 50;
const MAX_EMAIL: usize = 100;
const MAX_SEITENGROESSE: u64 = 100;

const UNGUELTIGE_ANMELDEDATEN: &str = "Ungueltige Anmeldedaten";

/// Eingabe fuer die Registrierung
#[derive(Debug, Clone, Deserialize)]
pub struct Registrierung {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub password: String,
    /// Rollenname, Standard `USER`
    #[serde(default)]
    pub role: Option<String>,
}

/// Aenderungen an einem Benutzer (eigenes Profil oder Admin)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BenutzerAenderung {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Oeffentliche Sicht auf einen Benutzer (ohne Passwort-Hash)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenutzerProfil {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Access-Token fuer den Response-Body
#[derive(Debug, Clone, Serialize)]
pub struct TokenAntwort {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// Ergebnis eines erfolgreichen Logins
#[derive(Debug, Clone)]
pub struct LoginErgebnis {
    pub token: TokenAntwort,
    /// Nur fuer das Cookie bestimmt
    pub refresh_token: String,
    pub benutzer: BenutzerProfil,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginierung {
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Paginierung {
    pub fn berechnen(total_items: u64, current_page: u64, page_size: u64) -> Self {
        let total_pages = total_items.div_ceil(page_size);
        Self {
            total_items,
            total_pages,
            current_page,
            page_size,
            has_next: current_page < total_pages,
            has_previous: current_page > 1,
        }
    }
}

/// Eine Seite der Benutzerliste
#[derive(Debug, Clone, Serialize)]
pub struct BenutzerSeite {
    pub users: Vec<BenutzerProfil>,
    pub pagination: Paginierung,
}

/// Auth-Service – zentraler Einstiegspunkt fuer alle Authentifizierungsvorgaenge
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    sessions: Arc<SessionService>,
    codec: Arc<TokenCodec>,
    hasher: Arc<dyn PasswortHasher>,
    konfig: Arc<AuthKonfig>,
}

impl AuthService {
    pub fn neu(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        sessions: Arc<SessionService>,
        codec: Arc<TokenCodec>,
        hasher: Arc<dyn PasswortHasher>,
        konfig: Arc<AuthKonfig>,
    ) -> Self {
        Self {
            users,
            roles,
            sessions,
            codec,
            hasher,
            konfig,
        }
    }

    pub fn konfig(&self) -> &AuthKonfig {
        &self.konfig
    }

    /// Legt die Standardrollen an, falls sie fehlen. Gibt die Anzahl neu
    /// angelegter Rollen zurueck.
    pub async fn standard_rollen_anlegen(&self) -> AuthResult<usize> {
        let mut angelegt = 0;
        for &(name, beschreibung, perms) in STANDARD_ROLLEN {
            if self.roles.get_by_name(name).await?.is_some() {
                continue;
            }
            let ergebnis = self
                .roles
                .create(NeueRolle {
                    name,
                    description: Some(beschreibung),
                    permissions: perms.iter().map(|p| Permission::from(*p)).collect(),
                })
                .await;
            match ergebnis {
                Ok(_) => {
                    tracing::info!(rolle = %name, "Standardrolle angelegt");
                    angelegt += 1;
                }
                // Parallel angelegt
                Err(e) if e.ist_eindeutigkeit() => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(angelegt)
    }

    /// Registriert einen neuen Benutzer
    pub async fn register(&self, eingabe: Registrierung) -> AuthResult<BenutzerProfil> {
        username_pruefen(&eingabe.username)?;
        email_pruefen(&eingabe.email)?;
        passwort_pruefen(&eingabe.password)?;

        let rollenname = eingabe.role.as_deref().unwrap_or(STANDARD_ROLLE);
        let rolle = self
            .roles
            .get_by_name(rollenname)
            .await?
            .ok_or_else(|| {
                AuthError::ungueltige_eingabe(format!("Rolle '{rollenname}' nicht gefunden"))
            })?;

        let passwort_hash = self.hasher.hash(&eingabe.password)?;

        let benutzer = self
            .users
            .create(NeuerBenutzer {
                username: &eingabe.username,
                email: &eingabe.email,
                full_name: eingabe.full_name.as_deref(),
                password_hash: &passwort_hash,
                role_id: rolle.id,
            })
            .await
            .map_err(|e| {
                konflikt_oder(e, "Benutzername oder E-Mail bereits registriert")
            })?;

        tracing::info!(
            user_id = %benutzer.id,
            username = %benutzer.username,
            rolle = %rolle.name,
            "Neuer Benutzer registriert"
        );

        Ok(profil_aus(benutzer, Some(rolle.name)))
    }

    /// Meldet einen Benutzer ueber Username oder E-Mail an
    ///
    /// Unbekannter Benutzer, deaktiviertes Konto und falsches Passwort
    /// ergeben denselben Fehler.
    pub async fn login(
        &self,
        kennung: &str,
        passwort: &str,
        geraet: GeraeteInfo,
    ) -> AuthResult<LoginErgebnis> {
        let Some(benutzer) = self.users.find_by_login(kennung).await? else {
            tracing::warn!(kennung = %kennung, "Login fehlgeschlagen: Benutzer unbekannt");
            return Err(AuthError::nicht_authentifiziert(UNGUELTIGE_ANMELDEDATEN));
        };
        if !benutzer.is_active {
            tracing::warn!(user_id = %benutzer.id, "Login fehlgeschlagen: Konto deaktiviert");
            return Err(AuthError::nicht_authentifiziert(UNGUELTIGE_ANMELDEDATEN));
        }
        if !self.hasher.verify(&benutzer.password_hash, passwort)? {
            tracing::warn!(user_id = %benutzer.id, "Login fehlgeschlagen: Passwort falsch");
            return Err(AuthError::nicht_authentifiziert(UNGUELTIGE_ANMELDEDATEN));
        }

        if self.hasher.needs_rehash(&benutzer.password_hash) {
            let neuer_hash = self.hasher.hash(passwort)?;
            self.users
                .update(
                    benutzer.id,
                    BenutzerUpdate {
                        password_hash: Some(neuer_hash),
                        ..Default::default()
                    },
                )
                .await?;
            tracing::info!(user_id = %benutzer.id, "Passwort-Hash aktualisiert");
        }

        let neu = self.sessions.create_session(&benutzer, geraet).await?;
        let profil = self.profil(&benutzer).await?;

        tracing::info!(
            user_id = %benutzer.id,
            session_id = %neu.session.id.kurz(),
            "Benutzer angemeldet"
        );

        Ok(LoginErgebnis {
            token: self.token_antwort(neu.access_token),
            refresh_token: neu.refresh_token,
            benutzer: profil,
            session_id: neu.session.id,
        })
    }

    /// Stellt ein neues Access-Token aus dem Refresh-Cookie aus
    pub async fn refresh(
        &self,
        refresh_token: Option<&str>,
        benutzer: &BenutzerRecord,
    ) -> AuthResult<TokenAntwort> {
        let token = refresh_token
            .ok_or_else(|| AuthError::nicht_authentifiziert("Refresh-Token fehlt"))?;

        match self.sessions.refresh_session(token, benutzer).await? {
            Some(access_token) => Ok(self.token_antwort(access_token)),
            None => Err(AuthError::nicht_authentifiziert(
                "Refresh-Token ungueltig oder abgelaufen",
            )),
        }
    }

    /// Widerruft die Session des Access-Tokens, ersatzweise die des
    /// Refresh-Cookies
    pub async fn logout(&self, bearer: Option<&str>, cookie: Option<&str>) -> AuthResult<()> {
        let session_id = [bearer, cookie]
            .into_iter()
            .flatten()
            .find_map(|token| match self.codec.decode(token) {
                Ok(claims) => Some(claims.sid),
                Err(e) => {
                    tracing::debug!(fehler = %e, "Logout: Token nicht lesbar");
                    None
                }
            })
            .ok_or_else(|| {
                AuthError::ungueltige_eingabe("Gueltiges Access- oder Refresh-Token erforderlich")
            })?;

        if !self.sessions.revoke_session(session_id).await? {
            tracing::warn!(session_id = %session_id.kurz(), "Logout: Session nicht gefunden");
            return Err(AuthError::NichtGefunden("Session nicht gefunden".into()));
        }
        Ok(())
    }

    /// Oeffentliches Profil eines Benutzers inklusive Rollenname
    pub async fn profil(&self, benutzer: &BenutzerRecord) -> AuthResult<BenutzerProfil> {
        let rolle = self
            .roles
            .get_by_id(benutzer.role_id)
            .await?
            .map(|r| r.name);
        Ok(profil_aus(benutzer.clone(), rolle))
    }

    /// Aktualisiert das eigene Profil; die Rolle ist nicht aenderbar
    pub async fn profil_aktualisieren(
        &self,
        user_id: UserId,
        aenderung: BenutzerAenderung,
    ) -> AuthResult<BenutzerProfil> {
        let benutzer = self.aktiven_benutzer_laden(user_id).await?;
        if aenderung.role.is_some() {
            tracing::warn!(user_id = %user_id, "Versuch, die eigene Rolle zu aendern");
            return Err(AuthError::verboten(
                "Eigene Rolle kann nicht geaendert werden",
            ));
        }
        let neu = self.aenderung_anwenden(&benutzer, aenderung).await?;
        tracing::info!(user_id = %user_id, "Profil aktualisiert");
        self.profil(&neu).await
    }

    /// Deaktiviert das eigene Konto und widerruft alle Sessions
    pub async fn konto_loeschen(&self, user_id: UserId) -> AuthResult<u64> {
        self.aktiven_benutzer_laden(user_id).await?;
        let anzahl = self.benutzer_deaktivieren(user_id).await?;
        tracing::info!(user_id = %user_id, widerrufen = anzahl, "Konto geloescht");
        Ok(anzahl)
    }

    /// Aktive Sessions eines Benutzers
    pub async fn sessions_auflisten(&self, user_id: UserId) -> AuthResult<Vec<SessionRecord>> {
        self.sessions.list_sessions_for_user(user_id).await
    }

    /// Seitenweise Benutzerliste (Seiten ab 1, Groesse 1..=100)
    pub async fn admin_benutzer_auflisten(&self, seite: u64, groesse: u64) -> AuthResult<BenutzerSeite> {
        if seite < 1 {
            return Err(AuthError::ungueltige_eingabe("Seite muss >= 1 sein"));
        }
        if !(1..=MAX_SEITENGROESSE).contains(&groesse) {
            return Err(AuthError::ungueltige_eingabe(format!(
                "Seitengroesse muss zwischen 1 und {MAX_SEITENGROESSE} liegen"
            )));
        }

        let gesamt = self.users.count().await?;
        let datensaetze = self.users.list((seite - 1) * groesse, groesse).await?;

        let mut users = Vec::with_capacity(datensaetze.len());
        for b in &datensaetze {
            users.push(self.profil(b).await?);
        }

        Ok(BenutzerSeite {
            users,
            pagination: Paginierung::berechnen(gesamt, seite, groesse),
        })
    }

    /// Aendert einen anderen Benutzer (Admin)
    pub async fn admin_benutzer_aktualisieren(
        &self,
        admin_id: UserId,
        ziel_id: UserId,
        aenderung: BenutzerAenderung,
    ) -> AuthResult<BenutzerProfil> {
        if admin_id == ziel_id {
            return Err(AuthError::ungueltige_eingabe(
                "Eigenes Profil ueber PUT /user aendern",
            ));
        }
        let ziel = self
            .users
            .get_by_id(ziel_id)
            .await?
            .ok_or_else(|| AuthError::NichtGefunden("Benutzer nicht gefunden".into()))?;

        let neu = self.aenderung_anwenden(&ziel, aenderung).await?;
        tracing::info!(admin_id = %admin_id, user_id = %ziel_id, "Benutzer durch Admin geaendert");
        self.profil(&neu).await
    }

    /// Deaktiviert einen anderen Benutzer (Admin)
    pub async fn admin_benutzer_loeschen(&self, admin_id: UserId, ziel_id: UserId) -> AuthResult<u64> {
        if admin_id == ziel_id {
            return Err(AuthError::ungueltige_eingabe(
                "Eigenes Konto ueber DELETE /user loeschen",
            ));
        }
        let ziel = self
            .users
            .get_by_id(ziel_id)
            .await?
            .ok_or_else(|| AuthError::NichtGefunden("Benutzer nicht gefunden".into()))?;
        if !ziel.is_active {
            return Err(AuthError::ungueltige_eingabe("Benutzer bereits deaktiviert"));
        }

        let anzahl = self.benutzer_deaktivieren(ziel_id).await?;
        tracing::warn!(
            admin_id = %admin_id,
            user_id = %ziel_id,
            widerrufen = anzahl,
            "Benutzer durch Admin deaktiviert"
        );
        Ok(anzahl)
    }

    /// Setzt `is_active = false` und widerruft alle Sessions des Benutzers
    pub async fn benutzer_deaktivieren(&self, user_id: UserId) -> AuthResult<u64> {
        self.users
            .update(
                user_id,
                BenutzerUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        self.sessions.revoke_all_sessions_for_user(user_id).await
    }

    async fn aktiven_benutzer_laden(&self, user_id: UserId) -> AuthResult<BenutzerRecord> {
        match self.users.get_by_id(user_id).await? {
            Some(b) if b.is_active => Ok(b),
            _ => Err(AuthError::NichtGefunden("Benutzer nicht gefunden".into())),
        }
    }

    async fn aenderung_anwenden(
        &self,
        benutzer: &BenutzerRecord,
        aenderung: BenutzerAenderung,
    ) -> AuthResult<BenutzerRecord> {
        if let Some(ref u) = aenderung.username {
            username_pruefen(u)?;
        }
        if let Some(ref e) = aenderung.email {
            email_pruefen(e)?;
        }

        let role_id = match aenderung.role {
            Some(ref name) => Some(
                self.roles
                    .get_by_name(name)
                    .await?
                    .ok_or_else(|| {
                        AuthError::ungueltige_eingabe(format!("Rolle '{name}' nicht gefunden"))
                    })?
                    .id,
            ),
            None => None,
        };

        let password_hash = match aenderung.password {
            Some(ref p) => {
                passwort_pruefen(p)?;
                Some(self.hasher.hash(p)?)
            }
            None => None,
        };

        let deaktivieren = benutzer.is_active && aenderung.is_active == Some(false);

        let neu = self
            .users
            .update(
                benutzer.id,
                BenutzerUpdate {
                    username: aenderung.username,
                    email: aenderung.email,
                    full_name: aenderung.full_name.map(Some),
                    password_hash,
                    role_id,
                    // Deaktivierung laeuft ueber benutzer_deaktivieren
                    is_active: aenderung.is_active.filter(|aktiv| *aktiv),
                },
            )
            .await
            .map_err(|e| konflikt_oder(e, "Benutzername oder E-Mail bereits vergeben"))?;

        if deaktivieren {
            self.benutzer_deaktivieren(benutzer.id).await?;
            return self
                .users
                .get_by_id(benutzer.id)
                .await?
                .ok_or_else(|| AuthError::intern("Benutzer nach Deaktivierung nicht gefunden"));
        }
        Ok(neu)
    }

    fn token_antwort(&self, access_token: String) -> TokenAntwort {
        TokenAntwort {
            access_token,
            expires_in: self.konfig.access_ttl_sekunden(),
            token_type: "bearer".into(),
        }
    }
}

fn profil_aus(benutzer: BenutzerRecord, rolle: Option<String>) -> BenutzerProfil {
    BenutzerProfil {
        id: benutzer.id,
        username: benutzer.username,
        email: benutzer.email,
        full_name: benutzer.full_name,
        role: rolle,
        is_active: benutzer.is_active,
        created_at: benutzer.created_at,
    }
}

fn konflikt_oder(e: DbError, msg: &str) -> AuthError {
    if e.ist_eindeutigkeit() {
        AuthError::Konflikt(msg.to_string())
    } else {
        AuthError::Datenbank(e)
    }
}

fn username_pruefen(username: &str) -> AuthResult<()> {
    let laenge = username.chars().count();
    if laenge == 0 || laenge > MAX_USERNAME {
        return Err(AuthError::ungueltige_eingabe(format!(
            "Benutzername muss 1 bis {MAX_USERNAME} Zeichen lang sein"
        )));
    }
    Ok(())
}

fn email_pruefen(email: &str) -> AuthResult<()> {
    let gueltig = match email.split_once('@') {
        Some((lokal, domain)) => !lokal.is_empty() && domain.contains('.'),
        None => false,
    };
    if !gueltig || email.chars().count() > MAX_EMAIL {
        return Err(AuthError::ungueltige_eingabe("Ungueltige E-Mail-Adresse"));
    }
    Ok(())
}

fn passwort_pruefen(passwort: &str) -> AuthResult<()> {
    if passwort.is_empty() {
        return Err(AuthError::ungueltige_eingabe("Passwort darf nicht leer sein"));
    }
    Ok(())
}
