//! SQLite-backed record store.
//!
//! # Responsibility
//! - Open file or in-memory connections with the required pragmas.
//! - Apply schema migrations before handing out a usable store.
//! - Map note records to and from the `notes` table.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and migrations applied.
//! - `content` is the document's JSON wire form; round-trips exactly.

use super::{RecordStore, StoreError, StoreResult};
use crate::model::document::Document;
use crate::model::note::{Note, Visibility};
use log::{error, info};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_init.sql"),
}];

pub struct SqliteStore {
    conn: Connection,
}

/// Opens a SQLite database file and applies all pending migrations.
pub fn open_store(path: impl AsRef<Path>) -> StoreResult<SqliteStore> {
    let started_at = Instant::now();
    info!("event=store_open module=store status=start mode=file");
    let conn = Connection::open(path).map_err(StoreError::from);
    finish_open(conn, started_at, "file")
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_store_in_memory() -> StoreResult<SqliteStore> {
    let started_at = Instant::now();
    info!("event=store_open module=store status=start mode=memory");
    let conn = Connection::open_in_memory().map_err(StoreError::from);
    finish_open(conn, started_at, "memory")
}

fn finish_open(
    conn: StoreResult<Connection>,
    started_at: Instant,
    mode: &str,
) -> StoreResult<SqliteStore> {
    let result = conn.and_then(|mut conn| {
        bootstrap_connection(&mut conn)?;
        Ok(SqliteStore { conn })
    });
    match &result {
        Ok(_) => info!(
            "event=store_open module=store status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=store_open module=store status=error mode={mode} duration_ms={} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
    result
}

fn bootstrap_connection(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}

/// Latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

fn apply_migrations(conn: &mut Connection) -> StoreResult<()> {
    let current: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();
    if current > latest {
        return Err(StoreError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;
    Ok(())
}

impl SqliteStore {
    /// Wraps an already-migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl RecordStore for SqliteStore {
    fn get(&self, id: &str) -> StoreResult<Option<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, content, owner, created_at, updated_at, visibility
             FROM notes
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(note_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_all(&self) -> StoreResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, content, owner, created_at, updated_at, visibility
             FROM notes
             ORDER BY updated_at DESC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(note_from_row(row)?);
        }
        Ok(notes)
    }

    fn upsert(&mut self, note: &Note) -> StoreResult<()> {
        let content = serde_json::to_string(&note.content)?;
        self.conn.execute(
            "INSERT INTO notes (id, title, content, owner, created_at, updated_at, visibility)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                owner = excluded.owner,
                updated_at = excluded.updated_at,
                visibility = excluded.visibility;",
            params![
                note.id,
                note.title,
                content,
                note.owner,
                note.created_at,
                note.updated_at,
                visibility_text(note.visibility),
            ],
        )?;
        Ok(())
    }

    fn delete(&mut self, id: &str) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn visibility_text(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Private => "private",
        Visibility::Public => "public",
    }
}

fn visibility_from_text(value: &str) -> StoreResult<Visibility> {
    match value {
        "private" => Ok(Visibility::Private),
        "public" => Ok(Visibility::Public),
        other => Err(StoreError::InvalidData(format!(
            "invalid visibility value `{other}` in notes.visibility"
        ))),
    }
}

fn note_from_row(row: &Row<'_>) -> StoreResult<Note> {
    let content_text: String = row.get("content")?;
    let content: Document = serde_json::from_str(&content_text)?;
    let visibility_value: String = row.get("visibility")?;
    Ok(Note {
        id: row.get("id")?,
        title: row.get("title")?,
        content,
        owner: row.get("owner")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        visibility: visibility_from_text(&visibility_value)?,
    })
}
