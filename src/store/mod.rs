//! Lead record persistence.

mod libsql_store;

pub use libsql_store::LibSqlStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;

/// A fully assembled lead, ready to persist. Service id and zip are always
/// present; contact fields are whatever the dialogue collected.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadRecord {
    pub id: Uuid,
    /// Stable for one conversation cycle, so a retried persist of the same
    /// cycle is a no-op.
    pub idempotency_key: String,
    pub service_id: String,
    pub zip: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LeadRecord {
    pub fn new(
        idempotency_key: impl Into<String>,
        service_id: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            idempotency_key: idempotency_key.into(),
            service_id: service_id.into(),
            zip: zip.into(),
            name: None,
            phone: None,
            email: None,
            address: None,
            created_at: Utc::now(),
        }
    }
}

/// Backend-agnostic lead persistence.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Persist a lead. Writing the same idempotency key twice is a no-op.
    async fn persist(&self, record: &LeadRecord) -> Result<(), StoreError>;
}
