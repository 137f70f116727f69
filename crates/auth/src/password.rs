//! Passwort-Hashing mit Argon2id
//!
//! Die Auth-Logik sieht nur den Trait [`PasswortHasher`]. Die
//! Standard-Implementierung [`Argon2Hasher`] nutzt Argon2id mit den Werten
//! gemaess OWASP-Empfehlungen (Stand 2024):
//! - Speicher: 64 MiB
//! - Iterationen: 3
//! - Parallelismus: 1

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::{AuthError, AuthResult};

const STANDARD_M_KOSTEN: u32 = 64 * 1024;
const STANDARD_T_KOSTEN: u32 = 3;
const STANDARD_P_KOSTEN: u32 = 1;

/// Hashen, Pruefen und Rehash-Erkennung von Passwoertern
pub trait PasswortHasher: Send + Sync {
    /// Hasht ein Klartext-Passwort und gibt den PHC-String zurueck
    fn hash(&self, klartext: &str) -> AuthResult<String>;

    /// Gibt `true` zurueck wenn `klartext` zu `hash` passt
    fn verify(&self, hash: &str, klartext: &str) -> AuthResult<bool>;

    /// Gibt `true` zurueck wenn `hash` mit anderen Parametern erzeugt wurde
    fn needs_rehash(&self, hash: &str) -> bool;
}

/// Argon2id-Hasher
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Hasher mit eigenen Kostenparametern (Tests, schwache Hardware)
    pub fn mit_parametern(m_kosten: u32, t_kosten: u32, p_kosten: u32) -> AuthResult<Self> {
        let params = Params::new(m_kosten, t_kosten, p_kosten, None)
            .map_err(|e| AuthError::PasswortHashing(format!("Argon2-Parameter ungueltig: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        // Konstante Standardwerte liegen im gueltigen Bereich
        let params = Params::new(STANDARD_M_KOSTEN, STANDARD_T_KOSTEN, STANDARD_P_KOSTEN, None)
            .unwrap_or_default();
        Self { params }
    }
}

impl PasswortHasher for Argon2Hasher {
    fn hash(&self, klartext: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(klartext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswortHashing(e.to_string()))
    }

    fn verify(&self, hash: &str, klartext: &str) -> AuthResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::PasswortHashing(format!("Ungueltiges Hash-Format: {e}")))?;

        // Parameter stehen im Hash selbst; alte Hashes bleiben pruefbar
        match self.argon2().verify_password(klartext.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswortHashing(e.to_string())),
        }
    }

    fn needs_rehash(&self, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return true;
        };
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }
        if parsed.version != Some(Version::V0x13 as u32) {
            return true;
        }
        match Params::try_from(&parsed) {
            Ok(p) => {
                p.m_cost() != self.params.m_cost()
                    || p.t_cost() != self.params.t_cost()
                    || p.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}
