use std::sync::Mutex;

use rusqlite::{params, Connection, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AuditSink, FraudCheckLog};

/// A persisted audit row, newest first in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudLogRow {
    pub id: i64,
    pub created_at: String,
    pub request_ip: Option<String>,
    pub ip_country_iso: Option<String>,
    pub fingerprint_id: String,
    pub origin: Option<String>,
    pub request_payload: Value,
    pub decision: String,
    pub risk_score: i64,
    pub signals: Value,
    pub captcha_required: bool,
    pub captcha_verified: bool,
    pub challenge_id: Option<String>,
}

pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private on-disk-free store, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS fraud_check_logs (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at        TEXT DEFAULT (datetime('now')),
                request_ip        TEXT,
                ip_country_iso    TEXT,
                fingerprint_id    TEXT NOT NULL,
                origin            TEXT,
                request_payload   TEXT NOT NULL DEFAULT '{}',
                decision          TEXT NOT NULL,
                risk_score        INTEGER NOT NULL,
                signals           TEXT NOT NULL DEFAULT '[]',
                captcha_required  INTEGER NOT NULL DEFAULT 0,
                captcha_verified  INTEGER NOT NULL DEFAULT 0,
                challenge_id      TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_fraud_logs_request_ip
                ON fraud_check_logs (request_ip);
            CREATE INDEX IF NOT EXISTS idx_fraud_logs_fingerprint
                ON fraud_check_logs (fingerprint_id);
            CREATE INDEX IF NOT EXISTS idx_fraud_logs_decision
                ON fraud_check_logs (decision);
            ",
        )
    }

    /// One page of audit rows, newest first, plus the total row count.
    pub fn get_page(&self, page: u64, page_size: u64) -> Result<(Vec<FraudLogRow>, u64)> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");

        let total: u64 =
            conn.query_row("SELECT COUNT(*) FROM fraud_check_logs", [], |row| {
                row.get::<_, i64>(0)
            })? as u64;

        let offset = (page.saturating_sub(1)) * page_size;
        let mut stmt = conn.prepare(
            "SELECT id, created_at, request_ip, ip_country_iso, fingerprint_id, origin,
                    request_payload, decision, risk_score, signals,
                    captcha_required, captcha_verified, challenge_id
             FROM fraud_check_logs
             ORDER BY id DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![page_size as i64, offset as i64], |row| {
            let payload_raw: String = row.get(6)?;
            let signals_raw: String = row.get(9)?;
            Ok(FraudLogRow {
                id: row.get(0)?,
                created_at: row.get(1)?,
                request_ip: row.get(2)?,
                ip_country_iso: row.get(3)?,
                fingerprint_id: row.get(4)?,
                origin: row.get(5)?,
                request_payload: serde_json::from_str(&payload_raw).unwrap_or(Value::Null),
                decision: row.get(7)?,
                risk_score: row.get(8)?,
                signals: serde_json::from_str(&signals_raw).unwrap_or(Value::Null),
                captcha_required: row.get::<_, i64>(10)? != 0,
                captcha_verified: row.get::<_, i64>(11)? != 0,
                challenge_id: row.get(12)?,
            })
        })?;

        Ok((rows.collect::<Result<Vec<_>>>()?, total))
    }
}

impl AuditSink for SqliteAuditStore {
    fn append(&self, log: &FraudCheckLog) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("sqlite mutex poisoned");
        conn.execute(
            "INSERT INTO fraud_check_logs
             (request_ip, ip_country_iso, fingerprint_id, origin, request_payload,
              decision, risk_score, signals, captcha_required, captcha_verified, challenge_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                log.request_ip,
                log.ip_country_iso,
                log.fingerprint_id,
                log.origin,
                log.request_payload.to_string(),
                log.decision,
                log.risk_score as i64,
                log.signals.to_string(),
                log.captcha_required as i64,
                log.captcha_verified as i64,
                log.challenge_id,
            ],
        )?;
        Ok(())
    }
}
