//! Persistence port for payment records

use crate::domain::PaymentRecord;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert or update a record. Records without an id get one assigned.
    async fn save(&self, record: PaymentRecord) -> Result<PaymentRecord>;

    /// Most recent record for the order
    async fn find_by_order_id(&self, order_id: u64) -> Result<Option<PaymentRecord>>;

    async fn find_by_payer_id(&self, payer_id: u64) -> Result<Vec<PaymentRecord>>;

    async fn find_all(&self) -> Result<Vec<PaymentRecord>>;
}

/// A thread-safe in-memory store for payment records.
///
/// Ids are assigned from a monotonic counter starting at 1.
#[derive(Default, Clone)]
pub struct InMemoryPaymentRepository {
    records: Arc<RwLock<HashMap<u64, PaymentRecord>>>,
    last_id: Arc<AtomicU64>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, mut record: PaymentRecord) -> Result<PaymentRecord> {
        let id = match record.id() {
            Some(id) => id,
            None => {
                let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
                record.assign_id(id);
                id
            }
        };

        let mut records = self.records.write().await;
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_order_id(&self, order_id: u64) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.order_id() == order_id)
            .max_by_key(|r| r.id())
            .cloned())
    }

    async fn find_by_payer_id(&self, payer_id: u64) -> Result<Vec<PaymentRecord>> {
        let records = self.records.read().await;
        let mut found: Vec<_> = records
            .values()
            .filter(|r| r.payer_id() == payer_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.id());
        Ok(found)
    }

    async fn find_all(&self) -> Result<Vec<PaymentRecord>> {
        let records = self.records.read().await;
        let mut all: Vec<_> = records.values().cloned().collect();
        all.sort_by_key(|r| r.id());
        Ok(all)
    }
}
