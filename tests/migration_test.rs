use skillpath::db;
use skillpath::db::migrations::{
    get_embedding_model, get_schema_version, run_migrations, set_embedding_model,
    CURRENT_SCHEMA_VERSION,
};

#[test]
fn fresh_db_migrates_to_current_version() {
    let conn = db::open_memory_database().unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn migrations_are_idempotent() {
    let mut conn = db::open_memory_database().unwrap();
    // Running again should be a no-op
    run_migrations(&mut conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn manual_v1_db_upgrades_correctly() {
    // Simulate a v1 database that hasn't been migrated
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    conn.execute(
        "INSERT INTO job_queue (queue, payload, enqueued_at) VALUES ('q', '{}', 'now')",
        [],
    )
    .unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), 1);

    run_migrations(&mut conn).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    // Jobs queued before the upgrade keep their payload and start at zero attempts
    let (payload, attempts): (String, i64) = conn
        .query_row("SELECT payload, attempts FROM job_queue", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(payload, "{}");
    assert_eq!(attempts, 0);
}

#[test]
fn embedding_model_is_recorded_and_replaced() {
    let conn = db::open_memory_database().unwrap();
    assert!(get_embedding_model(&conn).unwrap().is_none());

    set_embedding_model(&conn, "all-MiniLM-L6-v2").unwrap();
    set_embedding_model(&conn, "trigram-256").unwrap();
    assert_eq!(
        get_embedding_model(&conn).unwrap().as_deref(),
        Some("trigram-256")
    );
}
