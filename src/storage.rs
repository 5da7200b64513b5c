//! Local persistence slot for the cart.
//!
//! The cart is stored as a single serialized value under a named slot. The
//! default backend is a small SQLite key/value table; a JSON file and an
//! in-process slot are available for simpler setups and tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StorageError;
use crate::util::write_atomic;

pub const DEFAULT_SLOT: &str = "shopping-cart";

/// A named slot holding the serialized cart.
pub trait CartStorage {
    fn slot(&self) -> &str;

    /// Read the slot. `Ok(None)` when nothing was ever written.
    fn load(&self) -> Result<Option<String>, StorageError>;

    fn save(&self, payload: &str) -> Result<(), StorageError>;
}

// ── SQLite ───────────────────────────────────────────────────────────────

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS slots (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    checksum BLOB NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);
";

pub struct SqliteStorage {
    conn: Connection,
    slot: String,
}

impl SqliteStorage {
    /// Open or create the database file with its schema.
    pub fn open_or_create(path: &Path, slot: &str) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, slot)
    }

    pub fn in_memory(slot: &str) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?, slot)
    }

    fn with_connection(conn: Connection, slot: &str) -> Result<Self, StorageError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn,
            slot: slot.to_string(),
        })
    }
}

impl CartStorage for SqliteStorage {
    fn slot(&self) -> &str {
        &self.slot
    }

    fn load(&self) -> Result<Option<String>, StorageError> {
        let row: Option<(Vec<u8>, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT value, checksum FROM slots WHERE key = ?",
                params![self.slot],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((value, checksum)) = row else {
            return Ok(None);
        };
        if blake3::hash(&value).as_bytes().as_slice() != checksum.as_slice() {
            return Err(StorageError::Corrupt {
                slot: self.slot.clone(),
            });
        }
        String::from_utf8(value)
            .map(Some)
            .map_err(|_| StorageError::Corrupt {
                slot: self.slot.clone(),
            })
    }

    fn save(&self, payload: &str) -> Result<(), StorageError> {
        let checksum = blake3::hash(payload.as_bytes());
        self.conn.execute(
            "INSERT INTO slots (key, value, checksum, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                checksum = excluded.checksum,
                updated_at = excluded.updated_at",
            params![
                self.slot,
                payload.as_bytes(),
                checksum.as_bytes().as_slice(),
                Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }
}

// ── JSON file ────────────────────────────────────────────────────────────

pub struct FileStorage {
    path: PathBuf,
    slot: String,
}

impl FileStorage {
    /// Slot stored as `<dir>/<slot>.json`.
    pub fn in_dir(dir: &Path, slot: &str) -> Self {
        Self {
            path: dir.join(format!("{slot}.json")),
            slot: slot.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for FileStorage {
    fn slot(&self) -> &str {
        &self.slot
    }

    fn load(&self) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, payload: &str) -> Result<(), StorageError> {
        write_atomic(&self.path, payload.as_bytes()).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

// ── In-process ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemorySlot {
    value: Option<String>,
    writes: usize,
    fail_writes: bool,
}

/// In-process slot. Clones share the same underlying value, so a test can
/// keep a handle while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Rc<RefCell<MemorySlot>>,
}

impl MemoryStorage {
    pub fn contents(&self) -> Option<String> {
        self.inner.borrow().value.clone()
    }

    pub fn set_contents(&self, value: &str) {
        self.inner.borrow_mut().value = Some(value.to_string());
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    /// Make every following write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }
}

impl CartStorage for MemoryStorage {
    fn slot(&self) -> &str {
        DEFAULT_SLOT
    }

    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.contents())
    }

    fn save(&self, payload: &str) -> Result<(), StorageError> {
        let mut slot = self.inner.borrow_mut();
        if slot.fail_writes {
            return Err(StorageError::Unavailable {
                slot: DEFAULT_SLOT.to_string(),
                reason: "writes disabled".to_string(),
            });
        }
        slot.value = Some(payload.to_string());
        slot.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_slot_round_trips() {
        let storage = SqliteStorage::in_memory(DEFAULT_SLOT).unwrap();
        assert_eq!(storage.load().unwrap(), None);
        storage.save("[1]").unwrap();
        storage.save("[1,2]").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("[1,2]"));
    }

    #[test]
    fn sqlite_checksum_mismatch_is_corrupt() {
        let storage = SqliteStorage::in_memory(DEFAULT_SLOT).unwrap();
        storage.save("[]").unwrap();
        storage
            .conn
            .execute(
                "UPDATE slots SET value = ?1 WHERE key = ?2",
                params![b"[tampered]".as_slice(), DEFAULT_SLOT],
            )
            .unwrap();
        assert!(matches!(storage.load(), Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn sqlite_slots_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.sqlite");
        let a = SqliteStorage::open_or_create(&path, "a").unwrap();
        let b = SqliteStorage::open_or_create(&path, "b").unwrap();
        a.save("\"a\"").unwrap();
        assert_eq!(b.load().unwrap(), None);
        assert_eq!(a.load().unwrap().as_deref(), Some("\"a\""));
    }

    #[test]
    fn file_slot_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path(), DEFAULT_SLOT);
        assert_eq!(storage.load().unwrap(), None);
        storage.save("[]").unwrap();
        assert!(storage.path().ends_with("shopping-cart.json"));
        assert_eq!(storage.load().unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn memory_slot_can_fail() {
        let storage = MemoryStorage::default();
        storage.fail_writes(true);
        assert!(storage.save("[]").is_err());
        storage.fail_writes(false);
        storage.save("[]").unwrap();
        assert_eq!(storage.write_count(), 1);
    }
}
