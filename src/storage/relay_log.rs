use rusqlite::{Connection, params};
use std::path::Path;

use super::ensure_parent_dir;
use crate::common::ChatRecord;
use crate::error::Result;

/// Every record this node has seen on the relay topic, replayed to new subscribers.
pub struct RelayLog {
    conn: Connection,
}

impl RelayLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        ensure_parent_dir(path.as_ref())?;
        let conn = Connection::open(path)?;
        let log = Self { conn };
        log.init_schema()?;
        Ok(log)
    }

    pub fn in_memory() -> Result<Self> {
        let log = Self {
            conn: Connection::open_in_memory()?,
        };
        log.init_schema()?;
        Ok(log)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                sender TEXT NOT NULL,
                receiver TEXT,
                message TEXT NOT NULL,
                text TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                signature TEXT,
                verified INTEGER NOT NULL DEFAULT 0,
                received_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
                UNIQUE (sender, timestamp)
            )",
            [],
        )?;
        // Logs written before signatures were tracked lack the column.
        let has_verified: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('records') WHERE name = 'verified'",
            [],
            |row| row.get(0),
        )?;
        if !has_verified {
            self.conn.execute(
                "ALTER TABLE records ADD COLUMN verified INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }
        Ok(())
    }

    /// Store a record. Returns false if one with the same sender and timestamp exists,
    /// unless the stored row is unverified and this one carries a valid signature, in
    /// which case the row is replaced.
    pub fn append(&self, record: &ChatRecord, verified: bool) -> Result<bool> {
        let sql = if verified {
            "INSERT INTO records (id, sender, receiver, message, text, timestamp, signature, verified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)
             ON CONFLICT (sender, timestamp) DO UPDATE SET
                id = excluded.id,
                receiver = excluded.receiver,
                message = excluded.message,
                text = excluded.text,
                signature = excluded.signature,
                verified = 1
             WHERE records.verified = 0"
        } else {
            "INSERT OR IGNORE INTO records (id, sender, receiver, message, text, timestamp, signature, verified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)"
        };
        let changed = self.conn.execute(
            sql,
            params![
                record.id,
                record.sender,
                record.receiver,
                record.message,
                record.text,
                record.timestamp,
                record.signature
            ],
        )?;
        Ok(changed == 1)
    }

    /// All records in arrival order.
    pub fn records(&self) -> Result<Vec<ChatRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sender, receiver, message, text, timestamp, signature
             FROM records
             ORDER BY seq ASC",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(ChatRecord {
                    id: row.get(0)?,
                    sender: row.get(1)?,
                    receiver: row.get(2)?,
                    message: row.get(3)?,
                    text: row.get(4)?,
                    timestamp: row.get(5)?,
                    signature: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_arrival_order_and_ignores_replays() {
        let log = RelayLog::in_memory().unwrap();
        let late = ChatRecord::compose("A", "B", "second", 2000);
        let early = ChatRecord::compose("A", "B", "first", 1000);

        assert!(log.append(&late, false).unwrap());
        assert!(log.append(&early, false).unwrap());
        assert!(!log.append(&late, false).unwrap());

        let records = log.records().unwrap();
        assert_eq!(records, vec![late, early]);
        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn same_millisecond_from_different_senders_is_kept() {
        let log = RelayLog::in_memory().unwrap();
        assert!(log.append(&ChatRecord::compose("A", "C", "x", 5), false).unwrap());
        assert!(log.append(&ChatRecord::compose("B", "C", "y", 5), false).unwrap());
        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/relay.db");
        {
            let log = RelayLog::open(&path).unwrap();
            log.append(&ChatRecord::compose("A", "B", "hi", 1), true).unwrap();
        }
        let log = RelayLog::open(&path).unwrap();
        assert_eq!(log.records().unwrap()[0].body(), "hi");
    }

    #[test]
    fn upgrades_logs_without_a_verified_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "CREATE TABLE records (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL,
                    sender TEXT NOT NULL,
                    receiver TEXT,
                    message TEXT NOT NULL,
                    text TEXT NOT NULL,
                    timestamp INTEGER NOT NULL,
                    signature TEXT,
                    received_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
                    UNIQUE (sender, timestamp)
                )",
                [],
            )
            .unwrap();
        }
        let log = RelayLog::open(&path).unwrap();
        assert!(log.append(&ChatRecord::compose("A", "B", "old", 3), false).unwrap());
        assert!(log.append(&ChatRecord::compose("A", "B", "signed", 3), true).unwrap());
        assert_eq!(log.records().unwrap()[0].body(), "signed");
    }

    #[test]
    fn verified_record_replaces_unverified_row_once() {
        let log = RelayLog::in_memory().unwrap();
        let squatter = ChatRecord::compose("A", "B", "forged", 7);
        let genuine = ChatRecord::compose("A", "B", "real", 7);
        let late_forgery = ChatRecord::compose("A", "B", "again", 7);

        assert!(log.append(&squatter, false).unwrap());
        assert!(log.append(&genuine, true).unwrap());
        assert!(!log.append(&genuine, true).unwrap());
        assert!(!log.append(&late_forgery, false).unwrap());
        assert!(!log.append(&late_forgery, true).unwrap());

        let records = log.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].body(), "real");
    }
}
