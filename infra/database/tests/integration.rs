use evreg_database::*;

const NOTES: Migration = Migration::new(
    "notes",
    "0001-notes",
    "DEFINE TABLE OVERWRITE note SCHEMALESS;\nDEFINE FIELD OVERWRITE body ON note TYPE string;",
);

#[tokio::test]
async fn connect_in_memory_and_health_check() {
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .init()
        .await
        .expect("connect to mem://");

    db.health().await.expect("health check");
    assert_eq!(db.namespace(), "test_ns");
    assert_eq!(db.name(), "test_db");
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));

    let err = Database::builder().url("mem://").init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn slice_migrations_are_recorded_once() {
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "migrations")
        .migration(NOTES)
        .init()
        .await
        .expect("migrated connection");

    let ledger: Vec<AppliedMigration> = db
        .query("SELECT slice, version, checksum FROM migration ORDER BY version")
        .await
        .expect("ledger query")
        .take(0)
        .expect("ledger rows");

    let versions: Vec<&str> = ledger.iter().map(|m| m.version.as_str()).collect();
    assert_eq!(versions, vec!["0000-bootstrap", "0001-notes"]);
    assert_eq!(ledger[1].checksum, NOTES.checksum());
}

#[tokio::test]
async fn manual_transaction_control_is_rejected() {
    let bad = Migration::new("bad", "0001-bad", "BEGIN TRANSACTION; DEFINE TABLE t; COMMIT TRANSACTION;");
    let err = Database::builder()
        .url("mem://")
        .session("test_ns", "bad")
        .migration(bad)
        .init()
        .await
        .unwrap_err();

    assert!(matches!(err, DatabaseError::Migration { .. }));
}
