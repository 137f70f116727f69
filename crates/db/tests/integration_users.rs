//! Integration-Tests fuer UserRepository und RoleRepository (In-Memory SQLite)

use turnstile_core::{Permission, UserId};
use turnstile_db::{
    BenutzerUpdate, NeueRolle, NeuerBenutzer, RoleRepository, RolleRecord, SqliteDb,
    UserRepository,
};

async fn db() -> SqliteDb {
    SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden")
}

async fn rolle(db: &SqliteDb, name: &str, perms: &[&str]) -> RolleRecord {
    RoleRepository::create(
        db,
        NeueRolle {
            name,
            description: None,
            permissions: perms.iter().map(|p| Permission::from(*p)).collect(),
        },
    )
    .await
    .expect("Rolle erstellen fehlgeschlagen")
}

fn neuer<'a>(username: &'a str, email: &'a str, rolle: &RolleRecord) -> NeuerBenutzer<'a> {
    NeuerBenutzer {
        username,
        email,
        full_name: None,
        password_hash: "hash",
        role_id: rolle.id,
    }
}

#[tokio::test]
async fn rolle_mit_berechtigungen_speichern() {
    let db = db().await;
    let r = rolle(&db, "ADMIN", &["admin:*", "user:read"]).await;

    let geladen = db.get_by_name("ADMIN").await.unwrap().expect("Rolle ADMIN");
    assert_eq!(geladen.id, r.id);
    assert_eq!(
        geladen.permissions,
        vec![Permission::from("admin:*"), Permission::from("user:read")]
    );

    let per_id = RoleRepository::get_by_id(&db, r.id).await.unwrap().unwrap();
    assert_eq!(per_id.name, "ADMIN");
    assert!(db.get_by_name("FEHLT").await.unwrap().is_none());
}

#[tokio::test]
async fn rollenname_ist_eindeutig() {
    let db = db().await;
    rolle(&db, "USER", &["user:*"]).await;
    let err = RoleRepository::create(
        &db,
        NeueRolle {
            name: "USER",
            description: None,
            permissions: vec![],
        },
    )
    .await
    .unwrap_err();
    assert!(err.ist_eindeutigkeit());
}

#[tokio::test]
async fn benutzer_erstellen_und_laden() {
    let db = db().await;
    let r = rolle(&db, "USER", &["user:*"]).await;

    let user = UserRepository::create(&db, neuer("alice", "a@x.com", &r))
        .await
        .expect("Benutzer erstellen fehlgeschlagen");
    assert!(user.is_active);

    let geladen = UserRepository::get_by_id(&db, user.id)
        .await
        .unwrap()
        .expect("Benutzer sollte gefunden werden");
    assert_eq!(geladen.username, "alice");
    assert_eq!(geladen.role_id, r.id);

    assert!(UserRepository::get_by_id(&db, UserId::new())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn login_ueber_username_oder_email() {
    let db = db().await;
    let r = rolle(&db, "USER", &[]).await;
    UserRepository::create(&db, neuer("bob", "bob@x.com", &r))
        .await
        .unwrap();

    let per_name = db.find_by_login("bob").await.unwrap().unwrap();
    let per_mail = db.find_by_login("bob@x.com").await.unwrap().unwrap();
    assert_eq!(per_name.id, per_mail.id);
    assert!(db.find_by_login("niemand").await.unwrap().is_none());
}

#[tokio::test]
async fn username_und_email_sind_eindeutig() {
    let db = db().await;
    let r = rolle(&db, "USER", &[]).await;
    UserRepository::create(&db, neuer("carol", "c@x.com", &r))
        .await
        .unwrap();

    let gleicher_name = UserRepository::create(&db, neuer("carol", "anders@x.com", &r)).await;
    assert!(gleicher_name.unwrap_err().ist_eindeutigkeit());

    let gleiche_mail = UserRepository::create(&db, neuer("dave", "c@x.com", &r)).await;
    assert!(gleiche_mail.unwrap_err().ist_eindeutigkeit());
}

#[tokio::test]
async fn benutzer_aktualisieren() {
    let db = db().await;
    let r = rolle(&db, "USER", &[]).await;
    let admin = rolle(&db, "ADMIN", &["admin:*"]).await;
    let user = UserRepository::create(&db, neuer("erin", "e@x.com", &r))
        .await
        .unwrap();

    let neu = db
        .update(
            user.id,
            BenutzerUpdate {
                full_name: Some(Some("Erin E.".into())),
                role_id: Some(admin.id),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(neu.full_name.as_deref(), Some("Erin E."));
    assert_eq!(neu.role_id, admin.id);
    assert!(!neu.is_active);
    assert_eq!(neu.username, "erin");

    // Leeres Update liefert den unveraenderten Datensatz
    let unveraendert = db.update(user.id, BenutzerUpdate::default()).await.unwrap();
    assert_eq!(unveraendert.full_name.as_deref(), Some("Erin E."));

    let fehlt = db
        .update(
            UserId::new(),
            BenutzerUpdate {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await;
    assert!(fehlt.is_err());
}

#[tokio::test]
async fn benutzer_seitenweise_auflisten() {
    let db = db().await;
    let r = rolle(&db, "USER", &[]).await;
    for i in 0..5 {
        let name = format!("user{i}");
        let mail = format!("user{i}@x.com");
        UserRepository::create(&db, neuer(&name, &mail, &r))
            .await
            .unwrap();
    }

    assert_eq!(db.count().await.unwrap(), 5);
    assert_eq!(db.list(0, 2).await.unwrap().len(), 2);
    assert_eq!(db.list(4, 2).await.unwrap().len(), 1);
    assert!(db.list(10, 2).await.unwrap().is_empty());
}
