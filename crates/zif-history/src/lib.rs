//! Append-only SQLite record of every package touched by a transaction
//!. Schema is created lazily on first open; all parameters
//! pass through bound prepared statements, never raw string
//! interpolation.

#![warn(clippy::all)]

mod error;

pub use error::{Error, Result};

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::debug;
use zif_core::Reason;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS packages (
    transaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
    installed_by   INTEGER NOT NULL,
    command_line   TEXT NOT NULL,
    from_repo      TEXT NOT NULL,
    reason         TEXT NOT NULL,
    releasever     TEXT NOT NULL,
    name           TEXT NOT NULL,
    version        TEXT NOT NULL,
    arch           TEXT NOT NULL,
    timestamp      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS packages_name_idx ON packages(name);
CREATE INDEX IF NOT EXISTS packages_timestamp_idx ON packages(timestamp);
";

/// One row of the `packages` history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    /// Auto-increment id of the committing transaction.
    pub transaction_id: i64,
    /// Caller uid recorded at commit time.
    pub installed_by: u32,
    /// Full command line that initiated the transaction.
    pub command_line: String,
    /// Source repo id the package came from.
    pub from_repo: String,
    /// The item's reason tag.
    pub reason: Reason,
    /// The `$releasever` value in effect at commit time.
    pub releasever: String,
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Package architecture.
    pub arch: String,
    /// Unix timestamp (seconds).
    pub timestamp: i64,
}

/// A single yumdb entry being copied into history by [`HistoryStore::import`].
#[derive(Debug, Clone)]
pub struct ImportRow {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Package architecture.
    pub arch: String,
    /// Source repo id, from the yumdb `from_repo` key.
    pub from_repo: String,
    /// Caller uid, from the yumdb `installed_by` key.
    pub installed_by: u32,
    /// Reason tag, from the yumdb `reason` key.
    pub reason: Reason,
    /// Timestamp the yumdb entry itself recorded, from `from_repo_timestamp`.
    pub from_repo_timestamp: i64,
    /// `$releasever` at the time the entry was written.
    pub releasever: String,
}

/// The SQLite-backed history store. Accessed single-threaded; the mutex
/// exists so an `Arc<HistoryStore>` can still be shared across the
/// engine's call sites without `unsafe`.
#[derive(Debug)]
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Open (creating if absent) the history database at `path`, with
    /// `PRAGMA synchronous=OFF` since access is single-threaded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path).map_err(|source| Error::FailedToOpen {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch("PRAGMA synchronous=OFF;")?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), "history database opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// An in-memory history store, for tests and the manifest harness.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA synchronous=OFF;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Append one row for a committed transaction item. Returns the new
    /// row's auto-increment `transaction_id`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_entry(
        &self,
        name: &str,
        version: &str,
        arch: &str,
        timestamp: i64,
        reason: Reason,
        uid: u32,
        cmdline: &str,
        from_repo: &str,
        releasever: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO packages \
             (installed_by, command_line, from_repo, reason, releasever, name, version, arch, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![uid, cmdline, from_repo, reason.as_str(), releasever, name, version, arch, timestamp],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Distinct transaction timestamps, ascending.
    pub fn list_transactions(&self) -> Result<Vec<i64>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT timestamp FROM packages ORDER BY timestamp ASC")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Every row committed at exactly `timestamp`, ordered by
    /// `transaction_id` (the auto-increment tiebreak for rows sharing a
    /// timestamp).
    pub fn get_packages(&self, timestamp: i64) -> Result<Vec<HistoryRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT transaction_id, installed_by, command_line, from_repo, reason, \
                    releasever, name, version, arch, timestamp \
             FROM packages WHERE timestamp = ?1 ORDER BY transaction_id ASC",
        )?;
        let raw_rows = stmt
            .query_map(params![timestamp], RawRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raw_rows.into_iter().map(RawRow::into_history_row).collect()
    }

    /// The uid that committed the most recent row for `(name, version, arch)`.
    pub fn get_uid(&self, name: &str, version: &str, arch: &str) -> Result<Option<u32>> {
        self.latest_scalar(name, version, arch, "installed_by")
    }

    /// The command line of the most recent row for `(name, version, arch)`.
    pub fn get_cmdline(&self, name: &str, version: &str, arch: &str) -> Result<Option<String>> {
        self.latest_scalar(name, version, arch, "command_line")
    }

    /// The source repo id of the most recent row for `(name, version, arch)`.
    pub fn get_repo(&self, name: &str, version: &str, arch: &str) -> Result<Option<String>> {
        self.latest_scalar(name, version, arch, "from_repo")
    }

    /// The reason tag of the most recent row for `(name, version, arch)`.
    pub fn get_reason(&self, name: &str, version: &str, arch: &str) -> Result<Option<Reason>> {
        let raw: Option<String> = self.latest_scalar(name, version, arch, "reason")?;
        raw.map(|s| s.parse().map_err(Error::Core)).transpose()
    }

    /// The most recent `from_repo` for any version of `name`. Update
    /// advice needs "where did the newest build of this name come
    /// from", independent of which exact version/arch is installed now,
    /// so this stays its own query rather than folding into
    /// `get_packages`.
    pub fn get_repo_newest(&self, name: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT from_repo FROM packages WHERE name = ?1 ORDER BY timestamp DESC, transaction_id DESC LIMIT 1",
            params![name],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other.into()),
        })
    }

    /// Copy a batch of yumdb entries into the history table, for
    /// backfilling after an upgrade from an installation with no prior
    /// history.
    pub fn import(&self, rows: impl IntoIterator<Item = ImportRow>) -> Result<usize> {
        let mut count = 0;
        for row in rows {
            self.add_entry(
                &row.name,
                &row.version,
                &row.arch,
                row.from_repo_timestamp,
                row.reason,
                row.installed_by,
                "",
                &row.from_repo,
                &row.releasever,
            )?;
            count += 1;
        }
        Ok(count)
    }

    fn latest_scalar<T: rusqlite::types::FromSql>(
        &self,
        name: &str,
        version: &str,
        arch: &str,
        column: &'static str,
    ) -> Result<Option<T>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {column} FROM packages WHERE name = ?1 AND version = ?2 AND arch = ?3 \
             ORDER BY timestamp DESC, transaction_id DESC LIMIT 1"
        );
        conn.query_row(&sql, params![name, version, arch], |row| row.get(0))
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other.into()),
            })
    }

}

/// The raw SQL row shape, with `reason` still a string; parsed into a
/// [`HistoryRow`] (and its typed `Reason`) after the statement finishes.
struct RawRow {
    transaction_id: i64,
    installed_by: u32,
    command_line: String,
    from_repo: String,
    reason: String,
    releasever: String,
    name: String,
    version: String,
    arch: String,
    timestamp: i64,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            transaction_id: row.get(0)?,
            installed_by: row.get(1)?,
            command_line: row.get(2)?,
            from_repo: row.get(3)?,
            reason: row.get(4)?,
            releasever: row.get(5)?,
            name: row.get(6)?,
            version: row.get(7)?,
            arch: row.get(8)?,
            timestamp: row.get(9)?,
        })
    }

    fn into_history_row(self) -> Result<HistoryRow> {
        Ok(HistoryRow {
            transaction_id: self.transaction_id,
            installed_by: self.installed_by,
            command_line: self.command_line,
            from_repo: self.from_repo,
            reason: self.reason.parse()?,
            releasever: self.releasever,
            name: self.name,
            version: self.version,
            arch: self.arch,
            timestamp: self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(store: &HistoryStore, ts: i64) {
        store
            .add_entry("hello", "1.0-1", "x86_64", ts, Reason::InstallUserAction, 1000, "zif install hello", "base", "40")
            .unwrap();
    }

    #[test]
    fn round_trip_add_and_get_packages() {
        let store = HistoryStore::open_in_memory().unwrap();
        sample(&store, 100);
        let rows = store.get_packages(100).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "hello");
        assert_eq!(rows[0].reason, Reason::InstallUserAction);
    }

    #[test]
    fn list_transactions_is_ascending_and_distinct() {
        let store = HistoryStore::open_in_memory().unwrap();
        sample(&store, 200);
        sample(&store, 100);
        sample(&store, 100);
        let timestamps = store.list_transactions().unwrap();
        assert_eq!(timestamps, vec![100, 200]);
    }

    #[test]
    fn get_repo_newest_tracks_latest_timestamp() {
        let store = HistoryStore::open_in_memory().unwrap();
        store
            .add_entry("hello", "1.0-1", "x86_64", 100, Reason::InstallUserAction, 0, "", "old-repo", "40")
            .unwrap();
        store
            .add_entry("hello", "2.0-1", "x86_64", 200, Reason::UpdateUserAction, 0, "", "new-repo", "40")
            .unwrap();
        assert_eq!(store.get_repo_newest("hello").unwrap().as_deref(), Some("new-repo"));
    }

    #[test]
    fn get_repo_newest_is_none_when_absent() {
        let store = HistoryStore::open_in_memory().unwrap();
        assert_eq!(store.get_repo_newest("nothing").unwrap(), None);
    }

    #[test]
    fn sql_injection_attempt_is_stored_verbatim() {
        let store = HistoryStore::open_in_memory().unwrap();
        let hostile = "'; DROP TABLE packages; --\\0";
        store
            .add_entry("hello", "1.0-1", "x86_64", 100, Reason::InstallUserAction, 0, hostile, "base", "40")
            .unwrap();
        let rows = store.get_packages(100).unwrap();
        assert_eq!(rows[0].command_line, hostile);
        // The table must still exist and be queryable.
        assert_eq!(store.list_transactions().unwrap(), vec![100]);
    }

    #[test]
    fn import_copies_yumdb_rows() {
        let store = HistoryStore::open_in_memory().unwrap();
        let imported = store
            .import(vec![ImportRow {
                name: "hello".to_string(),
                version: "1.0-1".to_string(),
                arch: "x86_64".to_string(),
                from_repo: "base".to_string(),
                installed_by: 0,
                reason: Reason::InstallDepend,
                from_repo_timestamp: 321,
                releasever: "40".to_string(),
            }])
            .unwrap();
        assert_eq!(imported, 1);
        assert_eq!(store.get_packages(321).unwrap().len(), 1);
    }
}
