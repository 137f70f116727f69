//! Typisierte Berechtigungen
//!
//! Berechtigungen folgen der Konvention `namensraum:aktion`. Zwei Platzhalter
//! existieren: `*` gewaehrt alles, `namensraum:*` gewaehrt alle Aktionen eines
//! Namensraums. Das Parsen ist total, jeder String ergibt eine Berechtigung.

use serde::{Deserialize, Serialize};

/// Eine einzelne Berechtigung
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Permission {
    /// `*` – gewaehrt jede Berechtigung
    Alles,
    /// `ns:*` – gewaehrt alle Aktionen im Namensraum `ns`
    Namensraum(String),
    /// `ns:aktion` – genau eine Aktion
    Aktion { namensraum: String, aktion: String },
    /// Berechtigung ohne `:` (kein Namensraum, nur woertlicher Vergleich)
    Einzeln(String),
}

impl Permission {
    /// Platzhalter fuer einen ganzen Namensraum (`ns:*`)
    pub fn namensraum_platzhalter(namensraum: impl Into<String>) -> Self {
        Self::Namensraum(namensraum.into())
    }

    /// Namensraum, dessen Platzhalter diese Berechtigung ebenfalls erfuellt.
    ///
    /// `None` fuer `*`, fuer Berechtigungen ohne `:` und fuer einen leeren
    /// Namensraum.
    pub fn namensraum(&self) -> Option<&str> {
        match self {
            Self::Namensraum(ns) => Some(ns.as_str()),
            Self::Aktion { namensraum, .. } if !namensraum.is_empty() => Some(namensraum.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        if s == "*" {
            return Self::Alles;
        }
        match s.split_once(':') {
            Some((ns, "*")) if !ns.is_empty() => Self::Namensraum(ns.to_string()),
            Some((ns, aktion)) => Self::Aktion {
                namensraum: ns.to_string(),
                aktion: aktion.to_string(),
            },
            None => Self::Einzeln(s.to_string()),
        }
    }
}

impl From<String> for Permission {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Permission> for String {
    fn from(p: Permission) -> Self {
        p.to_string()
    }
}

impl std::str::FromStr for Permission {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alles => write!(f, "*"),
            Self::Namensraum(ns) => write!(f, "{ns}:*"),
            Self::Aktion { namensraum, aktion } => write!(f, "{namensraum}:{aktion}"),
            Self::Einzeln(s) => write!(f, "{s}"),
        }
    }
}
