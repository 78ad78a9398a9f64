// 🗄️ Keyed Record Store - SQLite-backed (bucket, key) → blob map
//
// One database file in WAL mode:
// - write transactions start with BEGIN IMMEDIATE → one writer store-wide
// - read snapshots are deferred transactions → never wait on the writer
// - busy_timeout bounds the wait for the write lock (surfaces as Timeout)
// - synchronous = FULL on every connection, so a commit is on disk when it returns
// Every blob carries a SHA-256 checksum that is verified on read.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::StoreError;

// ============================================================================
// BUCKETS
// ============================================================================

/// Namespace inside the store. Keys only need to be unique per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// ReviewAggregate per item
    Reviews,

    /// DetailLedger per (submitter, item)
    Details,

    /// Account per account id
    Accounts,

    /// Username → account id index
    Usernames,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Reviews => "reviews",
            Bucket::Details => "details",
            Bucket::Accounts => "accounts",
            Bucket::Usernames => "usernames",
        }
    }
}

// ============================================================================
// RECORD STORE
// ============================================================================

/// Handle to the store file. Cheap to clone; each transaction opens its own
/// connection, so handles can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl RecordStore {
    /// Open (or create) the store described by `config`
    pub fn open(config: &Config) -> Result<Self, StoreError> {
        Self::open_path(config.db_path(), config.lock_timeout)
    }

    pub fn open_path(path: impl Into<PathBuf>, lock_timeout: Duration) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let store = RecordStore { path, lock_timeout };
        let conn = store.connect()?;
        setup_schema(&conn).map_err(|e| StoreError::from_sqlite(e, lock_timeout))?;

        log::info!("🗄️  Record store ready at {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Same store, different lock wait
    pub fn with_lock_timeout(&self, lock_timeout: Duration) -> Self {
        RecordStore {
            path: self.path.clone(),
            lock_timeout,
        }
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path).map_err(StoreError::Sqlite)?;
        conn.busy_timeout(self.lock_timeout).map_err(StoreError::Sqlite)?;
        // Per-connection setting, unlike journal_mode
        conn.execute_batch("PRAGMA synchronous = FULL")
            .map_err(|e| StoreError::from_sqlite(e, self.lock_timeout))?;
        Ok(conn)
    }

    /// Start the (single) write transaction, waiting at most `lock_timeout`
    pub fn begin_write(&self) -> Result<WriteTxn, StoreError> {
        let conn = self.connect()?;

        if let Err(e) = conn.execute_batch("BEGIN IMMEDIATE") {
            let err = StoreError::from_sqlite(e, self.lock_timeout);
            if err.is_timeout() {
                log::warn!(
                    "⏱️  Write lock on {} not acquired within {:?}",
                    self.path.display(),
                    self.lock_timeout
                );
            }
            return Err(err);
        }

        log::debug!("write transaction opened on {}", self.path.display());
        Ok(WriteTxn {
            conn,
            lock_timeout: self.lock_timeout,
            finished: false,
        })
    }

    /// Start a consistent read snapshot (fixed at its first read)
    pub fn begin_read(&self) -> Result<ReadSnapshot, StoreError> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN DEFERRED")
            .map_err(|e| StoreError::from_sqlite(e, self.lock_timeout))?;

        Ok(ReadSnapshot {
            conn,
            lock_timeout: self.lock_timeout,
        })
    }

    /// Run `f` inside a write transaction: commit on Ok, roll back on Err
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut txn = self.begin_write()?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                // Dropping the transaction rolls it back
                drop(txn);
                Err(err)
            }
        }
    }

    /// Run `f` against one read snapshot
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&ReadSnapshot) -> Result<T, E>,
        E: From<StoreError>,
    {
        let snapshot = self.begin_read()?;
        f(&snapshot)
    }
}

fn setup_schema(conn: &Connection) -> rusqlite::Result<()> {
    // WAL: readers see a snapshot and never block the writer
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;

         CREATE TABLE IF NOT EXISTS records (
             bucket TEXT NOT NULL,
             key TEXT NOT NULL,
             value BLOB NOT NULL,
             checksum TEXT NOT NULL,
             updated_at TEXT NOT NULL,
             PRIMARY KEY (bucket, key)
         );",
    )
}

fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn read_record(
    conn: &Connection,
    bucket: Bucket,
    key: &str,
    lock_timeout: Duration,
) -> Result<Option<Vec<u8>>, StoreError> {
    let row: Option<(Vec<u8>, String)> = conn
        .query_row(
            "SELECT value, checksum FROM records WHERE bucket = ?1 AND key = ?2",
            params![bucket.as_str(), key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|e| StoreError::from_sqlite(e, lock_timeout))?;

    match row {
        None => Ok(None),
        Some((value, stored)) => {
            if checksum(&value) != stored {
                return Err(StoreError::Corrupt {
                    bucket: bucket.as_str(),
                    key: key.to_string(),
                    reason: "checksum mismatch".to_string(),
                });
            }
            Ok(Some(value))
        }
    }
}

// ============================================================================
// WRITE TRANSACTION
// ============================================================================

/// Exclusive write transaction. Dropping it without `commit` rolls back.
pub struct WriteTxn {
    conn: Connection,
    lock_timeout: Duration,
    finished: bool,
}

impl WriteTxn {
    pub fn get(&self, bucket: Bucket, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        read_record(&self.conn, bucket, key, self.lock_timeout)
    }

    pub fn put(&mut self, bucket: Bucket, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO records (bucket, key, value, checksum, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(bucket, key) DO UPDATE SET
                     value = excluded.value,
                     checksum = excluded.checksum,
                     updated_at = excluded.updated_at",
                params![
                    bucket.as_str(),
                    key,
                    value,
                    checksum(value),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::from_sqlite(e, self.lock_timeout))?;
        Ok(())
    }

    pub fn commit(mut self) -> Result<(), StoreError> {
        self.finished = true;
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| StoreError::from_sqlite(e, self.lock_timeout))
    }

    pub fn abort(mut self) -> Result<(), StoreError> {
        self.finished = true;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| StoreError::from_sqlite(e, self.lock_timeout))
    }
}

impl Drop for WriteTxn {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("rollback of abandoned write transaction failed: {}", e);
            }
        }
    }
}

// ============================================================================
// READ SNAPSHOT
// ============================================================================

pub struct ReadSnapshot {
    conn: Connection,
    lock_timeout: Duration,
}

impl ReadSnapshot {
    pub fn get(&self, bucket: Bucket, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        read_record(&self.conn, bucket, key, self.lock_timeout)
    }
}

impl Drop for ReadSnapshot {
    fn drop(&mut self) {
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            log::debug!("closing read snapshot: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> RecordStore {
        RecordStore::open(&Config::in_dir(dir.path())).unwrap()
    }

    #[test]
    fn test_put_commit_get() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut txn = store.begin_write().unwrap();
        assert_eq!(txn.get(Bucket::Reviews, "k").unwrap(), None);
        txn.put(Bucket::Reviews, "k", b"v1").unwrap();
        assert_eq!(txn.get(Bucket::Reviews, "k").unwrap(), Some(b"v1".to_vec()));
        txn.commit().unwrap();

        let snapshot = store.begin_read().unwrap();
        assert_eq!(snapshot.get(Bucket::Reviews, "k").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(snapshot.get(Bucket::Details, "k").unwrap(), None, "buckets are separate");
    }

    #[test]
    fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        for value in [&b"one"[..], &b"two"[..]] {
            let mut txn = store.begin_write().unwrap();
            txn.put(Bucket::Details, "k", value).unwrap();
            txn.commit().unwrap();
        }

        let snapshot = store.begin_read().unwrap();
        assert_eq!(snapshot.get(Bucket::Details, "k").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn test_abort_and_drop_discard_writes() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut txn = store.begin_write().unwrap();
        txn.put(Bucket::Reviews, "aborted", b"x").unwrap();
        txn.abort().unwrap();

        {
            let mut txn = store.begin_write().unwrap();
            txn.put(Bucket::Reviews, "dropped", b"x").unwrap();
        }

        let snapshot = store.begin_read().unwrap();
        assert_eq!(snapshot.get(Bucket::Reviews, "aborted").unwrap(), None);
        assert_eq!(snapshot.get(Bucket::Reviews, "dropped").unwrap(), None);
    }

    #[test]
    fn test_update_rolls_back_on_error() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let result: Result<(), StoreError> = store.update(|txn| {
            txn.put(Bucket::Reviews, "k", b"partial")?;
            Err(StoreError::Corrupt {
                bucket: "reviews",
                key: "k".to_string(),
                reason: "forced".to_string(),
            })
        });
        assert!(result.is_err());

        let value: Option<Vec<u8>> = store
            .view(|snap| snap.get(Bucket::Reviews, "k"))
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_durable_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir);
            store
                .update(|txn| txn.put(Bucket::Accounts, "id-1", b"account"))
                .unwrap();
        }

        let reopened = open_store(&dir);
        let value = reopened
            .view(|snap| snap.get(Bucket::Accounts, "id-1"))
            .unwrap();
        assert_eq!(value, Some(b"account".to_vec()));
    }

    #[test]
    fn test_snapshot_does_not_see_later_commit() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.update(|txn| txn.put(Bucket::Reviews, "k", b"old")).unwrap();

        let snapshot = store.begin_read().unwrap();
        assert_eq!(snapshot.get(Bucket::Reviews, "k").unwrap(), Some(b"old".to_vec()));

        // Writer is not blocked by the open reader
        store.update(|txn| txn.put(Bucket::Reviews, "k", b"new")).unwrap();

        assert_eq!(snapshot.get(Bucket::Reviews, "k").unwrap(), Some(b"old".to_vec()));
        drop(snapshot);

        let fresh = store.begin_read().unwrap();
        assert_eq!(fresh.get(Bucket::Reviews, "k").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_second_writer_times_out() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let impatient = store.with_lock_timeout(Duration::from_millis(50));

        let held = store.begin_write().unwrap();
        let err = impatient.begin_write().err().expect("lock is held");
        assert!(err.is_timeout(), "expected timeout, got {:?}", err);

        drop(held);
        assert!(impatient.begin_write().is_ok(), "lock is free again");
    }

    #[test]
    fn test_checksum_mismatch_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.update(|txn| txn.put(Bucket::Reviews, "k", b"intact")).unwrap();

        let raw = Connection::open(store.path()).unwrap();
        raw.execute(
            "UPDATE records SET value = ?1 WHERE bucket = 'reviews' AND key = 'k'",
            params![b"tampered".to_vec()],
        )
        .unwrap();

        let err = store
            .view(|snap| snap.get(Bucket::Reviews, "k"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { bucket: "reviews", .. }));
    }

    #[test]
    fn test_every_transaction_syncs_fully() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        // 2 = FULL
        let txn = store.begin_write().unwrap();
        let level: i64 = txn
            .conn
            .query_row("PRAGMA synchronous", [], |row| row.get(0))
            .unwrap();
        assert_eq!(level, 2);

        let snapshot = store.begin_read().unwrap();
        let level: i64 = snapshot
            .conn
            .query_row("PRAGMA synchronous", [], |row| row.get(0))
            .unwrap();
        assert_eq!(level, 2);
    }

    #[test]
    fn test_open_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("data");
        let store = RecordStore::open(&Config::in_dir(&nested)).unwrap();

        assert!(store.path().exists());
        assert_eq!(store.lock_timeout(), Duration::from_secs(1));
    }
}
