//! libSQL lead store — local file or in-memory database.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database, params};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{LeadRecord, LeadStore};

/// libSQL-backed lead store.
///
/// Holds a single connection reused for all writes; `libsql::Connection` is
/// `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Lead database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("failed to create database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS leads (
                    id TEXT PRIMARY KEY,
                    idempotency_key TEXT NOT NULL UNIQUE,
                    service_id TEXT NOT NULL,
                    zip TEXT NOT NULL,
                    name TEXT,
                    phone TEXT,
                    email TEXT,
                    address TEXT,
                    created_at TEXT NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| StoreError::Connection(format!("schema init failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl LeadStore for LibSqlStore {
    async fn persist(&self, record: &LeadRecord) -> Result<(), StoreError> {
        // The UNIQUE idempotency key makes a retried persist a no-op.
        let written = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO leads
                    (id, idempotency_key, service_id, zip, name, phone, email, address, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id.to_string(),
                    record.idempotency_key.clone(),
                    record.service_id.clone(),
                    record.zip.clone(),
                    record.name.clone(),
                    record.phone.clone(),
                    record.email.clone(),
                    record.address.clone(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Write(format!("insert lead: {e}")))?;

        if written == 0 {
            debug!(key = %record.idempotency_key, "Duplicate persist ignored");
        } else {
            info!(key = %record.idempotency_key, "Lead persisted");
        }
        Ok(())
    }
}
