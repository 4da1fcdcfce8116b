use super::*;
use crate::dialects::base::{FieldType, OrderSpec};
use crate::dialects::postgres::COLLATION_PROBE_SQL;
use crate::dialects::{DriverKind, DriverRegistry, ServerVersion};
use crate::executor::scripted::{ScriptedConnector, scalar};
use crate::executor::{ColumnMeta, RecordSet};
use crate::model::DatabaseConfig;

fn params() -> ConnectParams {
    ConnectParams::new("localhost", "blog", "s3cret", "weblog")
}

fn handle(kind: DriverKind, connector: &ScriptedConnector) -> DbHandle {
    DbHandle::new(kind, params(), Box::new(connector.clone()))
}

fn sqlite_connector(collation: bool) -> ScriptedConnector {
    let connector = ScriptedConnector::with_version("3.45.1");
    {
        let mut script = connector.script.borrow_mut();
        script.now_function = true;
        script.collation = collation;
    }
    connector
}

#[test]
fn test_negotiator_runs_before_caller_statements() {
    let connector = ScriptedConnector::with_version("5.7.44-log");
    let mut db = handle(DriverKind::Mysqli, &connector);

    db.connect().unwrap();
    db.select("SELECT 1").unwrap();

    assert_eq!(
        connector.log(),
        vec![
            "SELECT VERSION()",
            "SET NAMES 'utf8'",
            "SET collation_connection = 'utf8_unicode_ci'",
            "SELECT 1",
        ]
    );
    assert_eq!(db.unicode_collation(), Some("utf8_unicode_ci"));
    assert_eq!(db.version().unwrap(), "5.7.44-log");
}

#[test]
fn test_mb4_refuses_server_below_5_7_7() {
    let connector = ScriptedConnector::with_version("5.7.6");
    let mut db = handle(DriverKind::PdoMysqlMb4, &connector);

    let err = db.connect().unwrap_err();
    assert!(
        matches!(err, DriverError::Connection(ref m) if m == "unable to connect to a full-Unicode database")
    );
    assert!(!db.is_connected());
    assert_eq!(connector.log(), vec!["SELECT VERSION()"]);
}

#[test]
fn test_mb4_on_5_7_7_sets_database_charset() {
    let connector = ScriptedConnector::with_version("5.7.7");
    let mut db = handle(DriverKind::MysqliMb4, &connector);
    db.connect().unwrap();

    assert_eq!(
        connector.log()[1..],
        [
            "SET NAMES 'utf8mb4' COLLATE 'utf8mb4_unicode_ci'",
            "SET collation_connection = 'utf8mb4_unicode_ci'",
            "SET collation_server = 'utf8mb4_unicode_ci'",
            "SET character_set_server = 'utf8mb4'",
            "SET character_set_database = 'utf8mb4'",
        ]
    );
    assert_eq!(db.unicode_collation(), Some("utf8mb4_unicode_ci"));
}

#[test]
fn test_mb4_on_eight_skips_database_charset() {
    let connector = ScriptedConnector::with_version("8.0.35-0ubuntu0.22.04.1");
    let mut db = handle(DriverKind::MysqliMb4, &connector);
    db.connect().unwrap();

    let log = connector.log();
    assert_eq!(log.len(), 5);
    assert!(!log.iter().any(|s| s.contains("character_set_database")));
}

#[test]
fn test_mariadb_replication_prefix_is_ignored() {
    let connector = ScriptedConnector::with_version("5.5.5-10.6.12-MariaDB-log");
    let mut db = handle(DriverKind::PdoMysqlMb4, &connector);
    db.connect().unwrap();
    assert_eq!(db.server_version(), Some(ServerVersion::new(10, 6, 12)));
}

#[test]
fn test_failed_negotiation_leaves_handle_closed() {
    let connector = ScriptedConnector::with_version("8.0.35");
    connector.fail("SET NAMES", "Access denied");
    let mut db = handle(DriverKind::Mysqli, &connector);

    let err = db.connect().unwrap_err();
    assert!(matches!(err, DriverError::Negotiation(_)));
    assert!(!db.is_connected());
    assert!(matches!(db.select("SELECT 1"), Err(DriverError::NotConnected)));
}

#[test]
fn test_negotiator_runs_once_per_open() {
    let connector = ScriptedConnector::with_version("8.0.35");
    let mut db = handle(DriverKind::PdoMysql, &connector);

    db.connect().unwrap();
    db.connect().unwrap();
    assert_eq!(connector.count("SET NAMES 'utf8'"), 1);
    assert_eq!(connector.script.borrow().opens, 1);

    db.close().unwrap();
    db.connect().unwrap();
    assert_eq!(connector.count("SET NAMES 'utf8'"), 2);
    assert_eq!(connector.script.borrow().opens, 2);
}

#[test]
fn test_unparseable_version_assumes_oldest_server() {
    let connector = ScriptedConnector::with_version("unknown");
    let mut db = handle(DriverKind::Mysqli, &connector);
    db.connect().unwrap();

    assert_eq!(db.server_version(), Some(ServerVersion::default()));
    assert_eq!(connector.log(), vec!["SELECT VERSION()"]);
    assert_eq!(db.unicode_collation(), None);
}

#[test]
fn test_refused_connection() {
    let connector = ScriptedConnector::with_version("8.0.35");
    connector.script.borrow_mut().refuse_connection = true;
    let mut db = handle(DriverKind::Mysqli, &connector);

    assert!(matches!(db.connect(), Err(DriverError::Connection(_))));
    assert!(!db.is_connected());
}

#[test]
fn test_postgres_negotiation_with_utf8_collation() {
    let connector = ScriptedConnector::with_version("14.5 (Debian 14.5-1.pgdg110+1)");
    connector.respond(COLLATION_PROBE_SQL, scalar("en_US.utf8"));
    let mut db = handle(DriverKind::PdoPgsql, &connector);
    db.connect().unwrap();

    assert_eq!(
        connector.log(),
        vec![
            "SHOW server_version",
            "SET client_encoding = 'UTF8'",
            COLLATION_PROBE_SQL,
        ]
    );
    assert_eq!(db.unicode_collation(), Some("en_US.utf8"));
    assert_eq!(
        db.order_by(&[OrderSpec::field("title").collate()]),
        " ORDER BY title COLLATE \"en_US.utf8\" "
    );
}

#[test]
fn test_postgres_without_collation_falls_back_to_lower() {
    let connector = ScriptedConnector::with_version("15.2");
    let mut db = handle(DriverKind::PdoPgsql, &connector);
    db.connect().unwrap();

    assert_eq!(db.unicode_collation(), None);
    assert_eq!(db.lex_fields(&["name"]), "LOWER(name)");
    assert_eq!(
        db.order_by(&[OrderSpec::field("name").collate()]),
        " ORDER BY LOWER(name) "
    );
}

#[test]
fn test_postgres_probe_failure_is_not_fatal() {
    let connector = ScriptedConnector::with_version("15.2");
    connector.fail(COLLATION_PROBE_SQL, "permission denied for pg_collation");
    let mut db = handle(DriverKind::PdoPgsql, &connector);

    db.connect().unwrap();
    assert!(db.is_connected());
    assert_eq!(db.unicode_collation(), None);
}

#[test]
fn test_old_postgres_skips_probe() {
    let connector = ScriptedConnector::with_version("9.0.23");
    let mut db = handle(DriverKind::PdoPgsql, &connector);
    db.connect().unwrap();
    assert_eq!(connector.count(COLLATION_PROBE_SQL), 0);
}

#[test]
fn test_sqlite_negotiation_registers_function_and_collation() {
    let connector = sqlite_connector(true);
    let mut db = handle(DriverKind::PdoSqlite, &connector);
    db.connect().unwrap();

    assert_eq!(
        connector.log(),
        vec![
            "SELECT sqlite_version()",
            "PRAGMA short_column_names = 1",
            "PRAGMA encoding = \"UTF-8\"",
        ]
    );
    assert_eq!(connector.script.borrow().registered, vec!["now", "UNICODE"]);
    assert_eq!(db.lex_fields(&["name", "slug"]), "name COLLATE UNICODE, slug COLLATE UNICODE");
}

#[test]
fn test_sqlite_without_comparator_uses_lower() {
    let connector = sqlite_connector(false);
    let mut db = handle(DriverKind::PdoSqlite, &connector);
    db.connect().unwrap();

    assert_eq!(db.unicode_collation(), None);
    assert_eq!(db.lex_fields(&["name"]), "LOWER(name)");
}

#[test]
fn test_sqlite_requires_now_function() {
    let connector = ScriptedConnector::with_version("3.45.1");
    let mut db = handle(DriverKind::PdoSqlite, &connector);
    assert!(matches!(db.connect(), Err(DriverError::Negotiation(_))));
    assert!(!db.is_connected());
}

#[test]
fn test_sqlite_vacuum_runs_once_on_close() {
    let connector = sqlite_connector(true);
    let mut db = handle(DriverKind::PdoSqlite, &connector);
    db.connect().unwrap();

    db.vacuum("posts").unwrap();
    db.vacuum("comments").unwrap();
    assert_eq!(connector.count("VACUUM"), 0);

    db.close().unwrap();
    db.close().unwrap();
    assert_eq!(connector.count("VACUUM"), 1);
}

#[test]
fn test_dropping_handle_runs_deferred_vacuum() {
    let connector = sqlite_connector(true);
    {
        let mut db = handle(DriverKind::PdoSqlite, &connector);
        db.connect().unwrap();
        db.vacuum("posts").unwrap();
    }
    assert_eq!(connector.count("VACUUM"), 1);
}

#[test]
fn test_immediate_vacuum() {
    let connector = ScriptedConnector::with_version("8.0.35");
    let mut db = handle(DriverKind::Mysqli, &connector);
    db.connect().unwrap();
    db.vacuum("blog_contents").unwrap();
    assert_eq!(connector.count("OPTIMIZE TABLE `blog_contents`"), 1);

    let connector = ScriptedConnector::with_version("15.2");
    let mut db = handle(DriverKind::PdoPgsql, &connector);
    db.connect().unwrap();
    db.vacuum("blog_contents").unwrap();
    assert_eq!(connector.count("VACUUM FULL \"blog_contents\""), 1);
    db.close().unwrap();
    assert_eq!(connector.count("VACUUM FULL \"blog_contents\""), 1);
}

#[test]
fn test_weak_lock_swallows_failure() {
    let connector = ScriptedConnector::with_version("8.0.35");
    connector.fail("LOCK TABLES", "LOCK TABLES command denied");
    let mut db = handle(DriverKind::Mysqli, &connector);
    db.connect().unwrap();

    assert!(db.weak_locks());
    db.write_lock("blog_options").unwrap();
    assert!(!db.is_locked());
}

#[test]
fn test_strict_lock_reports_lock_error() {
    let connector = ScriptedConnector::with_version("8.0.35");
    connector.fail("LOCK TABLES", "LOCK TABLES command denied");
    let mut db = handle(DriverKind::PdoMysql, &connector).with_weak_locks(false);
    db.connect().unwrap();

    let err = db.write_lock("blog_options").unwrap_err();
    assert!(matches!(err, DriverError::Lock(_)));
}

#[test]
fn test_mysql_lock_cycle() {
    let connector = ScriptedConnector::with_version("8.0.35");
    let mut db = handle(DriverKind::Mysqli, &connector);
    db.connect().unwrap();
    connector.clear_log();

    db.write_lock("blog_options").unwrap();
    assert!(db.is_locked());
    db.unlock().unwrap();
    assert!(!db.is_locked());
    assert_eq!(
        connector.log(),
        vec!["LOCK TABLES `blog_options` WRITE", "UNLOCK TABLES"]
    );
}

#[test]
fn test_postgres_lock_failure_rolls_back() {
    let connector = ScriptedConnector::with_version("15.2");
    connector.fail("LOCK TABLE", "could not obtain lock");
    // Weak locks are a MySQL policy; PostgreSQL failures always propagate.
    let mut db = handle(DriverKind::PdoPgsql, &connector).with_weak_locks(true);
    db.connect().unwrap();
    connector.clear_log();

    let err = db.write_lock("blog_options").unwrap_err();
    assert!(matches!(err, DriverError::Lock(_)));
    assert_eq!(
        connector.log(),
        vec![
            "BEGIN",
            "LOCK TABLE \"blog_options\" IN EXCLUSIVE MODE",
            "ROLLBACK",
        ]
    );
}

#[test]
fn test_postgres_and_sqlite_lock_statements() {
    let connector = ScriptedConnector::with_version("15.2");
    let mut db = handle(DriverKind::PdoPgsql, &connector);
    db.connect().unwrap();
    connector.clear_log();
    db.write_lock("posts").unwrap();
    db.unlock().unwrap();
    assert_eq!(
        connector.log(),
        vec!["BEGIN", "LOCK TABLE \"posts\" IN EXCLUSIVE MODE", "COMMIT"]
    );

    let connector = sqlite_connector(true);
    let mut db = handle(DriverKind::PdoSqlite, &connector);
    db.connect().unwrap();
    connector.clear_log();
    db.write_lock("posts").unwrap();
    db.unlock().unwrap();
    assert_eq!(
        connector.log(),
        vec!["BEGIN EXCLUSIVE TRANSACTION", "COMMIT"]
    );
}

#[test]
fn test_close_releases_lock_before_deferred_vacuum() {
    let connector = sqlite_connector(true);
    let mut db = handle(DriverKind::PdoSqlite, &connector);
    db.connect().unwrap();
    connector.clear_log();

    db.vacuum("posts").unwrap();
    db.write_lock("posts").unwrap();
    db.close().unwrap();

    assert!(!db.is_locked());
    assert_eq!(
        connector.log(),
        vec!["BEGIN EXCLUSIVE TRANSACTION", "COMMIT", "VACUUM"]
    );
}

#[test]
fn test_close_reports_strict_unlock_failure() {
    let connector = ScriptedConnector::with_version("15.2");
    connector.fail("COMMIT", "connection lost");
    let mut db = handle(DriverKind::PdoPgsql, &connector);
    db.connect().unwrap();
    db.write_lock("posts").unwrap();

    let err = db.close().unwrap_err();
    assert!(matches!(err, DriverError::Lock(_)));
    assert!(!db.is_connected());
    assert!(!db.is_locked());
}

#[test]
fn test_close_swallows_weak_unlock_failure() {
    let connector = ScriptedConnector::with_version("8.0.35");
    connector.fail("UNLOCK TABLES", "server has gone away");
    let mut db = handle(DriverKind::Mysqli, &connector);
    db.connect().unwrap();
    db.write_lock("posts").unwrap();

    db.close().unwrap();
    assert_eq!(connector.count("UNLOCK TABLES"), 1);
}

#[test]
fn test_unlock_without_lock_is_noop() {
    let connector = sqlite_connector(true);
    let mut db = handle(DriverKind::PdoSqlite, &connector);
    db.connect().unwrap();
    connector.clear_log();

    db.unlock().unwrap();
    assert!(connector.log().is_empty());
}

#[test]
fn test_closed_handle_rejects_statements() {
    let connector = ScriptedConnector::with_version("8.0.35");
    let mut db = handle(DriverKind::Mysqli, &connector);

    assert!(matches!(db.select("SELECT 1"), Err(DriverError::NotConnected)));
    assert!(matches!(db.execute("DELETE FROM t"), Err(DriverError::NotConnected)));
    assert!(matches!(db.write_lock("t"), Err(DriverError::NotConnected)));
    assert!(matches!(db.vacuum("t"), Err(DriverError::NotConnected)));
    assert!(matches!(db.version(), Err(DriverError::NotConnected)));
    assert!(db.close().is_ok());
    assert!(connector.log().is_empty());
}

#[test]
fn test_persistent_connect_degrades_for_sqlite() {
    let connector = ScriptedConnector::with_version("8.0.35");
    let mut db = handle(DriverKind::MysqliMb4, &connector);
    db.persistent_connect().unwrap();
    assert_eq!(connector.script.borrow().persistent_opens, 1);

    let connector = sqlite_connector(true);
    let mut db = handle(DriverKind::PdoSqlite, &connector);
    db.persistent_connect().unwrap();
    assert!(db.is_connected());
    assert_eq!(connector.script.borrow().opens, 1);
    assert_eq!(connector.script.borrow().persistent_opens, 0);
}

#[test]
fn test_empty_order_and_lex_on_every_driver() {
    let connector = ScriptedConnector::new();
    for kind in DriverKind::ALL {
        let db = handle(kind, &connector);
        assert_eq!(db.order_by(&[]), "", "{:?}", kind);
        assert_eq!(db.order_by(&[OrderSpec::raw("  ")]), "", "{:?}", kind);
        assert_eq!(db.lex_fields(&[]), "", "{:?}", kind);
    }
}

#[test]
fn test_order_direction_tokens_on_every_driver() {
    let connector = ScriptedConnector::new();
    for kind in DriverKind::ALL {
        let db = handle(kind, &connector);
        assert_eq!(
            db.order_by(&[OrderSpec::field("created").order("DeSc")]),
            " ORDER BY created DESC ",
            "{:?}",
            kind
        );
        assert_eq!(
            db.order_by(&[OrderSpec::field("created").order("asc")]),
            " ORDER BY created ",
            "{:?}",
            kind
        );
        assert_eq!(
            db.order_by(&[OrderSpec::field("created").order("sideways")]),
            " ORDER BY created ",
            "{:?}",
            kind
        );
    }
}

#[test]
fn test_field_type_lookup() {
    let connector = ScriptedConnector::new();
    let rs = RecordSet::new(
        vec![
            ColumnMeta::new("cid", "SQL_INTEGER"),
            ColumnMeta::new("created", "SQL_TYPE_TIMESTAMP"),
            ColumnMeta::new("geo", "SQL_SS_UDT"),
        ],
        Vec::new(),
    );

    let mysql = handle(DriverKind::PdoMysql, &connector);
    assert_eq!(mysql.field_type(&rs, 0), FieldType::Int);
    assert_eq!(mysql.field_type(&rs, 1), FieldType::Datetime);
    assert_eq!(mysql.field_type(&rs, 2), FieldType::Unknown);
    assert_eq!(mysql.field_type(&rs, 3), FieldType::Unknown);

    let pgsql = handle(DriverKind::PdoPgsql, &connector);
    assert_eq!(pgsql.field_type(&rs, 1), FieldType::Timestamp);
}

#[test]
fn test_dialect_delegates() {
    let connector = ScriptedConnector::new();
    let mysql = handle(DriverKind::Mysqli, &connector);
    let sqlite = handle(DriverKind::PdoSqlite, &connector);

    assert_eq!(mysql.escape_system("order"), "`order`");
    assert_eq!(sqlite.escape_system("order"), "\"order\"");
    assert_eq!(mysql.escape_str("it's"), r"'it\'s'");
    assert_eq!(sqlite.escape_str("it's"), "'it''s'");
    assert_eq!(mysql.concat(&["a", "b"]), "CONCAT(a, b)");
    assert_eq!(sqlite.concat(&["a", "b"]), "(a || b)");
    assert_eq!(
        sqlite.date_format("created", "Y"),
        "strftime('%Y', created)"
    );
}

#[test]
fn test_last_insert_id() {
    let connector = ScriptedConnector::with_version("8.0.35");
    connector.respond("SELECT LAST_INSERT_ID()", scalar("42"));
    let mut db = handle(DriverKind::Mysqli, &connector);
    db.connect().unwrap();
    assert_eq!(db.last_insert_id().unwrap(), Some(42));
}

#[test]
fn test_schema_is_paired_with_engine() {
    let connector = sqlite_connector(true);
    connector.respond(
        "SELECT name FROM sqlite_master",
        RecordSet::new(
            vec![ColumnMeta::new("name", "TEXT")],
            vec![vec![Some("comments".into())], vec![Some("posts".into())]],
        ),
    );
    let mut db = handle(DriverKind::PdoSqlite, &connector);
    db.connect().unwrap();

    let mut schema = db.schema();
    assert_eq!(schema.tables().unwrap(), vec!["comments", "posts"]);
    assert!(schema.has_table("posts").unwrap());
    assert_eq!(schema.ops().quote("posts"), "\"posts\"");

    schema
        .apply(&["CREATE TABLE a (x)".to_string(), "DROP TABLE a".to_string()])
        .unwrap();
    let log = connector.log();
    assert_eq!(log[log.len() - 2..], ["CREATE TABLE a (x)", "DROP TABLE a"]);
}

#[test]
fn test_from_config_resolves_alias_and_policy() {
    let registry = DriverRegistry::builtin();
    let config = DatabaseConfig {
        driver: "utf8mb4".to_string(),
        weak_locks: Some(false),
        ..DatabaseConfig::default()
    };
    let db = DbHandle::from_config(&config, &registry).unwrap();
    assert_eq!(db.kind(), DriverKind::MysqliMb4);
    assert!(!db.weak_locks());
    assert!(!db.is_connected());

    let config = DatabaseConfig {
        driver: "oracle".to_string(),
        ..DatabaseConfig::default()
    };
    assert!(matches!(
        DbHandle::from_config(&config, &registry),
        Err(DriverError::UnknownDriver(_))
    ));
}

#[test]
fn test_debug_never_shows_password() {
    let connector = ScriptedConnector::new();
    let db = handle(DriverKind::Mysqli, &connector);
    let printed = format!("{:?}", db);
    assert!(!printed.contains("s3cret"));
    assert!(printed.contains("mysqli"));
}
