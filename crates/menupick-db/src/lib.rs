// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use menupick_app::{Record, RecordId, RecordStore, StoreError, StoreResult};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

pub const APP_NAME: &str = "menupick";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS foods (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
";

const REQUIRED_SCHEMA: &[(&str, &[&str])] =
    &[("foods", &["id", "name", "created_at", "updated_at"])];

pub const DEMO_DISHES: [&str; 8] = [
    "Bibimbap",
    "Chicken curry",
    "Falafel wrap",
    "Margherita pizza",
    "Miso ramen",
    "Pad thai",
    "Shakshuka",
    "Tomato soup",
];

/// SQLite-backed `RecordStore` over the `foods` table.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        debug!(path = %path.display(), "database opened");
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the schema on an empty database, otherwise checks that the
    /// existing one has every column the store reads.
    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn.execute_batch(SCHEMA).context("create schema")?;
            info!("database schema created");
        }
        Ok(())
    }

    /// Inserts `names` that are not already present. Returns how many were added.
    pub fn seed_names(&self, names: &[&str]) -> Result<usize> {
        let now = now_rfc3339()?;
        let mut added = 0;
        for name in names {
            added += self
                .conn
                .execute(
                    "INSERT OR IGNORE INTO foods (name, created_at, updated_at) VALUES (?, ?, ?)",
                    params![name, now, now],
                )
                .with_context(|| format!("seed dish {name}"))?;
        }
        Ok(added)
    }

    pub fn seed_demo_data(&self) -> Result<usize> {
        self.seed_names(&DEMO_DISHES)
    }

    pub fn record_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))
            .context("count dishes")?;
        usize::try_from(count).context("dish count out of range")
    }

    pub fn get_record(&self, id: RecordId) -> Result<Option<Record>> {
        self.conn
            .query_row(
                "SELECT id, name FROM foods WHERE id = ?",
                params![id.get()],
                |row| Ok(Record::new(row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .with_context(|| format!("load dish {id}"))
    }

    pub fn list_records(&self) -> Result<Vec<Record>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM foods ORDER BY id ASC")
            .context("prepare dish list query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Record::new(row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .context("query dishes")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect dishes")
    }

    fn insert_record(&self, name: &str) -> StoreResult<Record> {
        let now = now_rfc3339().map_err(transport)?;
        self.conn
            .execute(
                "INSERT INTO foods (name, created_at, updated_at) VALUES (?, ?, ?)",
                params![name, now, now],
            )
            .map_err(|error| map_write_error(error, name))?;
        let record = Record::new(self.conn.last_insert_rowid(), name);
        info!(id = %record.id, %name, "dish inserted");
        Ok(record)
    }

    fn update_record(&self, id: RecordId, name: &str) -> StoreResult<Record> {
        let now = now_rfc3339().map_err(transport)?;
        let changed = self
            .conn
            .execute(
                "UPDATE foods SET name = ?, updated_at = ? WHERE id = ?",
                params![name, now, id.get()],
            )
            .map_err(|error| map_write_error(error, name))?;
        if changed == 0 {
            return Err(StoreError::NotFound { id });
        }
        info!(%id, %name, "dish renamed");
        Ok(Record::new(id, name))
    }

    fn delete_record(&self, id: RecordId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM foods WHERE id = ?", params![id.get()])
            .map_err(|error| StoreError::transport(error.to_string()))?;
        if changed == 0 {
            return Err(StoreError::NotFound { id });
        }
        info!(%id, "dish deleted");
        Ok(())
    }
}

impl RecordStore for Store {
    fn list(&mut self) -> StoreResult<Vec<Record>> {
        self.list_records().map_err(transport)
    }

    fn insert(&mut self, name: &str) -> StoreResult<Record> {
        self.insert_record(name)
    }

    fn update(&mut self, id: RecordId, name: &str) -> StoreResult<Record> {
        self.update_record(id, name)
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        self.delete_record(id)
    }
}

fn transport(error: anyhow::Error) -> StoreError {
    warn!(error = %format!("{error:#}"), "database call failed");
    StoreError::transport(format!("{error:#}"))
}

fn map_write_error(error: rusqlite::Error, name: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &error
        && failure.code == ErrorCode::ConstraintViolation
    {
        return StoreError::DuplicateName {
            name: name.to_owned(),
        };
    }
    warn!(%error, "database write failed");
    StoreError::transport(error.to_string())
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("MENUPICK_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set MENUPICK_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("menupick.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point --config at a menupick database or remove the file"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; recreate the database",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
