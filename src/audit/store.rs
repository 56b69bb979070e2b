//! SQLite persistence for the audit trail.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

/// The persisted summary of one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    /// Inbound HTTP method.
    pub method: String,
    /// Full inbound URL as seen by the proxy.
    pub url: String,
    /// Request body decoded as text, lossy on invalid encoding.
    pub request_body: String,
    /// System prompt extracted from the body, when one was found.
    pub system_prompt: Option<String>,
    /// Upstream status, or 500 when no response was obtained.
    pub response_status: u16,
    /// Wall-clock duration of the exchange in seconds.
    pub duration_secs: f64,
    /// Description of the terminal failure, absent on success.
    pub error_message: Option<String>,
}

/// Append-only store for audit records.
///
/// A single connection guarded by a mutex; writers run on blocking tasks so
/// the async exchanges never wait on SQLite.
pub struct AuditStore {
    conn: Mutex<Connection>,
}

impl AuditStore {
    /// Open (or create) the database and ensure the table exists.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS request_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL DEFAULT (datetime('now')),
                method TEXT NOT NULL,
                url TEXT NOT NULL,
                request_body TEXT,
                system_prompt TEXT,
                response_status INTEGER NOT NULL,
                duration REAL,
                error_message TEXT
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append one record.
    pub fn insert(&self, record: &AuditRecord) -> rusqlite::Result<()> {
        let conn = self.conn.lock().expect("audit store mutex poisoned");
        conn.execute(
            "INSERT INTO request_logs
                (method, url, request_body, system_prompt, response_status, duration, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.method,
                record.url,
                record.request_body,
                record.system_prompt,
                record.response_status,
                record.duration_secs,
                record.error_message,
            ],
        )?;
        Ok(())
    }

    /// Number of records written so far.
    pub fn count(&self) -> rusqlite::Result<i64> {
        let conn = self.conn.lock().expect("audit store mutex poisoned");
        conn.query_row("SELECT COUNT(*) FROM request_logs", [], |row| row.get(0))
    }

    /// The most recent records, newest first.
    pub fn recent(&self, limit: u32) -> rusqlite::Result<Vec<AuditRecord>> {
        let conn = self.conn.lock().expect("audit store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT method, url, request_body, system_prompt, response_status, duration, error_message
             FROM request_logs ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(AuditRecord {
                method: row.get(0)?,
                url: row.get(1)?,
                request_body: row.get(2)?,
                system_prompt: row.get(3)?,
                response_status: row.get::<_, i64>(4)? as u16,
                duration_secs: row.get(5)?,
                error_message: row.get(6)?,
            })
        })?;
        rows.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: u16) -> AuditRecord {
        AuditRecord {
            method: "POST".into(),
            url: "http://localhost:8080/v1/chat/completions".into(),
            request_body: r#"{"messages":[]}"#.into(),
            system_prompt: Some("be brief".into()),
            response_status: status,
            duration_secs: 0.125,
            error_message: None,
        }
    }

    #[test]
    fn insert_and_read_back() {
        let store = AuditStore::open(":memory:").unwrap();
        store.insert(&sample(200)).unwrap();
        store.insert(&sample(502)).unwrap();

        assert_eq!(store.count().unwrap(), 2);
        let recent = store.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first.
        assert_eq!(recent[0].response_status, 502);
        assert_eq!(recent[1], sample(200));
    }

    #[test]
    fn preserves_optional_fields() {
        let store = AuditStore::open(":memory:").unwrap();
        let record = AuditRecord {
            system_prompt: None,
            error_message: Some("connection refused".into()),
            ..sample(500)
        };
        store.insert(&record).unwrap();

        let read = store.recent(1).unwrap().remove(0);
        assert_eq!(read.system_prompt, None);
        assert_eq!(read.error_message.as_deref(), Some("connection refused"));
    }
}
