#![allow(dead_code)]

use assert_cmd::Command;
use sqlbridge_rs::{ConnectParams, DbHandle, DriverKind, NativeConnector};
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

/// Returns a configured Command for the `sqlbridge` binary
pub fn sqlbridge_cmd() -> Command {
    Command::cargo_bin("sqlbridge").expect("Binary not found")
}

/// Closed SQLite handle on `path`, using the real transport.
pub fn sqlite_handle(path: &Path) -> DbHandle {
    let params = ConnectParams::new("", "", "", path.to_string_lossy());
    DbHandle::new(
        DriverKind::PdoSqlite,
        params,
        Box::new(NativeConnector::default()),
    )
}

/// Temp dir holding `blog.db` with a small `posts` table.
pub fn setup_blog_db() -> (TempDir, PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("blog.db");

    let mut db = sqlite_handle(&db_path);
    db.connect().expect("Failed to open SQLite database");
    db.execute(
        "CREATE TABLE posts (cid INTEGER PRIMARY KEY AUTOINCREMENT, title VARCHAR(150), created DATETIME)",
    )
    .unwrap();
    db.execute(
        "INSERT INTO posts (title, created) VALUES \
         ('banana', '2024-03-01 10:00:00'), \
         ('Apple', '2024-01-15 08:30:00'), \
         ('cherry', '2023-12-31 23:59:59')",
    )
    .unwrap();
    db.close().unwrap();

    (temp_dir, db_path)
}
