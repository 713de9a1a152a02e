use std::path::Path;

use rusqlite::{params, Connection};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS records (
            id          INTEGER PRIMARY KEY,
            name        TEXT,
            address     TEXT,
            phone       TEXT,
            source_url  TEXT NOT NULL,
            page        INTEGER,
            raw_text    TEXT NOT NULL,
            record_key  TEXT NOT NULL,
            indexed_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        -- a missing phone counts as '' so phone-less rows still dedup
        CREATE UNIQUE INDEX IF NOT EXISTS uniq_record
            ON records (COALESCE(phone, ''), record_key);
        CREATE INDEX IF NOT EXISTS idx_records_source ON records(source_url);

        CREATE VIRTUAL TABLE IF NOT EXISTS records_fts USING fts5(
            name,
            address,
            phone,
            raw_text,
            content='records',
            content_rowid='id',
            tokenize='porter unicode61'
        );

        -- records are append-only, so insert is the only sync point
        CREATE TRIGGER IF NOT EXISTS records_fts_insert AFTER INSERT ON records BEGIN
            INSERT INTO records_fts (rowid, name, address, phone, raw_text)
            VALUES (new.id, new.name, new.address, new.phone, new.raw_text);
        END;
        ",
    )?;
    Ok(())
}

// ── Ingestion ──

/// One parsed entry, before it is tied to a source document.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub page: Option<i64>,
    pub raw_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Hash of `(name, address, source_url)`; paired with the phone it forms the
/// uniqueness key.
pub fn record_key(row: &RecordRow, source_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(row.name.as_deref().unwrap_or(""));
    hasher.update("|");
    hasher.update(row.address.as_deref().unwrap_or(""));
    hasher.update("|");
    hasher.update(source_url);
    format!("{:x}", hasher.finalize())
}

/// Insert the rows of one document in a single transaction. Rows already
/// present are skipped. Returns the number of new rows.
pub fn upsert_records(conn: &Connection, rows: &[RecordRow], source_url: &str) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO records
             (name, address, phone, source_url, page, raw_text, record_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for r in rows {
            let outcome = match stmt.execute(params![
                r.name,
                r.address,
                r.phone,
                source_url,
                r.page,
                r.raw_text,
                record_key(r, source_url),
            ])? {
                0 => InsertOutcome::Duplicate,
                _ => InsertOutcome::Inserted,
            };
            if outcome == InsertOutcome::Inserted {
                count += 1;
            }
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Search ──

#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: i64,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub source_url: String,
    pub page: Option<i64>,
}

/// Full-text search, best match first. An empty query matches nothing.
pub fn search(conn: &Connection, query: &str, limit: usize) -> Result<Vec<Record>> {
    let Some(fts_query) = to_fts_query(query) else {
        return Ok(Vec::new());
    };

    let mut stmt = conn.prepare(
        "SELECT r.id, r.name, r.address, r.phone, r.source_url, r.page
         FROM records_fts
         JOIN records r ON r.id = records_fts.rowid
         WHERE records_fts MATCH ?1
         ORDER BY bm25(records_fts, 4.0, 2.0, 1.0, 1.0)
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![fts_query, limit as i64], |row| {
            Ok(Record {
                id: row.get(0)?,
                name: row.get(1)?,
                address: row.get(2)?,
                phone: row.get(3)?,
                source_url: row.get(4)?,
                page: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Plain-text query → FTS5 query: every word quoted, all of them required.
fn to_fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

// ── Stats ──

pub struct Stats {
    pub records: usize,
    pub sources: usize,
    pub with_phone: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let records: usize = conn.query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))?;
    let sources: usize = conn.query_row(
        "SELECT COUNT(DISTINCT source_url) FROM records",
        [],
        |r| r.get(0),
    )?;
    let with_phone: usize = conn.query_row(
        "SELECT COUNT(*) FROM records WHERE phone IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        records,
        sources,
        with_phone,
    })
}
