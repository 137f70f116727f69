//! Berechtigungspruefung
//!
//! Reine Funktion ohne Seiteneffekte: entscheidet ob eine Menge gehaltener
//! Berechtigungen eine Liste geforderter Berechtigungen erfuellt.

use std::collections::HashSet;

use turnstile_core::Permission;

/// Gibt `true` zurueck wenn `gehalten` jede Berechtigung aus `gefordert` erfuellt.
///
/// `*` in `gehalten` erfuellt alles. Sonst wird jede geforderte Berechtigung
/// einzeln geprueft: woertlich enthalten, oder `ns:*` enthalten, wobei `ns`
/// der Teil vor dem ersten `:` ist. Berechtigungen ohne `:` haben keinen
/// Namensraum-Platzhalter, ebenso wenig ein leerer Namensraum (`:read`).
/// Eine leere Forderung ist immer erfuellt.
pub fn satisfies(gehalten: &HashSet<Permission>, gefordert: &[Permission]) -> bool {
    if gehalten.contains(&Permission::Alles) {
        return true;
    }
    gefordert.iter().all(|p| einzeln_erfuellt(gehalten, p))
}

fn einzeln_erfuellt(gehalten: &HashSet<Permission>, gefordert: &Permission) -> bool {
    if gehalten.contains(gefordert) {
        return true;
    }
    match gefordert.namensraum() {
        Some(ns) => gehalten.contains(&Permission::namensraum_platzhalter(ns)),
        None => false,
    }
}
