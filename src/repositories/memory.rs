// src/repositories/memory.rs
//! In-memory `InventoryStore` for tests. Counts round trips so batching can be asserted.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use crate::error::{ApiError, ApiResult};
use crate::models::{Location, Order};
use super::InventoryStore;

#[derive(Default)]
pub struct MemoryInventoryStore {
    pub locations: Vec<Location>,
    pub orders: Vec<Order>,
    pub stocked: HashSet<i64>,
    pub fail_orders: bool,
    pub fail_locations: bool,
    pub order_queries: AtomicUsize,
    pub stock_queries: AtomicUsize,
}

impl MemoryInventoryStore {
    pub fn new(locations: Vec<Location>, orders: Vec<Order>) -> Self {
        Self {
            locations,
            orders,
            ..Default::default()
        }
    }

    pub fn order_query_count(&self) -> usize {
        self.order_queries.load(Ordering::SeqCst)
    }

    pub fn stock_query_count(&self) -> usize {
        self.stock_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn tracked_locations(&self, warehouse_id: i64, usage: &str) -> ApiResult<Vec<Location>> {
        if self.fail_locations {
            return Err(ApiError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        let mut found: Vec<Location> = self
            .locations
            .iter()
            .filter(|l| l.parent_id == Some(warehouse_id) && l.usage == usage)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.barcode.cmp(&b.barcode)));
        Ok(found)
    }

    async fn location_by_id(&self, id: i64) -> ApiResult<Option<Location>> {
        if self.fail_locations {
            return Err(ApiError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(self.locations.iter().find(|l| l.id == id).cloned())
    }

    async fn active_orders_for_locations(
        &self,
        location_ids: &[i64],
        states: &[String],
    ) -> ApiResult<Vec<Order>> {
        self.order_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_orders {
            return Err(ApiError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .orders
            .iter()
            .filter(|o| location_ids.contains(&o.source_location_id) && states.contains(&o.state))
            .cloned()
            .collect())
    }

    async fn stocked_locations(&self, location_ids: &[i64]) -> ApiResult<HashSet<i64>> {
        self.stock_queries.fetch_add(1, Ordering::SeqCst);
        Ok(location_ids
            .iter()
            .copied()
            .filter(|id| self.stocked.contains(id))
            .collect())
    }
}
