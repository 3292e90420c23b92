// src/repositories/mod.rs
//! Read access to the inventory/order collaborator.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashSet;
use crate::error::ApiResult;
use crate::models::{Location, Order};

#[cfg(test)]
pub mod memory;

/// Everything occupancy needs from the ERP, as batch reads.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Storage locations directly under `warehouse_id`, ordered by name then barcode.
    async fn tracked_locations(&self, warehouse_id: i64, usage: &str) -> ApiResult<Vec<Location>>;

    async fn location_by_id(&self, id: i64) -> ApiResult<Option<Location>>;

    /// Orders in one of `states` whose source location is in `location_ids`.
    /// A single round trip no matter how many ids are passed.
    async fn active_orders_for_locations(
        &self,
        location_ids: &[i64],
        states: &[String],
    ) -> ApiResult<Vec<Order>>;

    /// Subset of `location_ids` holding a positive stock quantity.
    async fn stocked_locations(&self, location_ids: &[i64]) -> ApiResult<HashSet<i64>>;
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

pub struct SqliteInventoryStore {
    pool: SqlitePool,
}

impl SqliteInventoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for SqliteInventoryStore {
    async fn tracked_locations(&self, warehouse_id: i64, usage: &str) -> ApiResult<Vec<Location>> {
        let locations: Vec<Location> = sqlx::query_as(
            r#"SELECT id, name, barcode, parent_id, usage
               FROM stock_locations
               WHERE parent_id = ? AND usage = ? AND active = 1
               ORDER BY name ASC, barcode ASC"#
        )
        .bind(warehouse_id)
        .bind(usage)
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    async fn location_by_id(&self, id: i64) -> ApiResult<Option<Location>> {
        let location: Option<Location> = sqlx::query_as(
            "SELECT id, name, barcode, parent_id, usage FROM stock_locations WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    async fn active_orders_for_locations(
        &self,
        location_ids: &[i64],
        states: &[String],
    ) -> ApiResult<Vec<Order>> {
        if location_ids.is_empty() || states.is_empty() {
            return Ok(Vec::new());
        }

        let state_slots = placeholders(states.len());
        let sql = format!(
            r#"SELECT
                o.id, o.name, o.source_location_id, o.state,
                p.name AS customer,
                o.container_ref, o.external_ref, o.write_date,
                (SELECT MAX(c.changed_at) FROM order_state_changes c
                  WHERE c.order_id = o.id AND c.new_state IN ({states})) AS state_changed_at
            FROM sale_orders o
            LEFT JOIN res_partners p ON p.id = o.partner_id
            WHERE o.source_location_id IN ({ids}) AND o.state IN ({states})
            ORDER BY o.source_location_id, o.write_date DESC, o.id DESC"#,
            states = state_slots,
            ids = placeholders(location_ids.len()),
        );

        let mut query = sqlx::query_as::<_, Order>(&sql);
        for state in states {
            query = query.bind(state);
        }
        for id in location_ids {
            query = query.bind(id);
        }
        for state in states {
            query = query.bind(state);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn stocked_locations(&self, location_ids: &[i64]) -> ApiResult<HashSet<i64>> {
        if location_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let sql = format!(
            "SELECT DISTINCT location_id FROM stock_quants WHERE quantity > 0 AND location_id IN ({})",
            placeholders(location_ids.len())
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for id in location_ids {
            query = query.bind(id);
        }

        Ok(query.fetch_all(&self.pool).await?.into_iter().collect())
    }
}
