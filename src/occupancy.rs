// src/occupancy.rs
//! Occupancy classification for a batch of storage locations.
//!
//! Status is derived live on every call from order/container linkage (or
//! stock presence, depending on policy). One batched order lookup per pass,
//! never one per location.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use crate::config::WarehouseConfig;
use crate::error::ApiResult;
use crate::models::{
    ClassificationPolicy, ClassifiedLocation, Location, OccupancyRecord, OccupancyStatus, Order,
};
use crate::repositories::InventoryStore;

pub const UNKNOWN: &str = "Unknown";

/// Result of the batched collaborator reads for one classification pass.
struct Lookup {
    orders: HashMap<i64, Order>,
    stocked: HashSet<i64>,
}

pub struct OccupancyClassifier<'a> {
    settings: &'a WarehouseConfig,
}

impl<'a> OccupancyClassifier<'a> {
    pub fn new(settings: &'a WarehouseConfig) -> Self {
        Self { settings }
    }

    /// Classify every location, preserving input order. Never fails: a failed
    /// lookup degrades every tracked location to free.
    pub async fn classify(
        &self,
        store: &dyn InventoryStore,
        locations: Vec<Location>,
        now: DateTime<Utc>,
    ) -> Vec<ClassifiedLocation> {
        let tracked_ids: Vec<i64> = locations
            .iter()
            .filter(|l| self.settings.is_tracked(l.id, l.parent_id))
            .map(|l| l.id)
            .collect();

        let lookup = match self.lookup(store, &tracked_ids).await {
            Ok(lookup) => Some(lookup),
            Err(e) => {
                log::error!(
                    "Occupancy lookup failed for {} tracked locations, reporting them as free: {}",
                    tracked_ids.len(),
                    e
                );
                None
            }
        };

        locations
            .into_iter()
            .map(|location| {
                let tracked = self.settings.is_tracked(location.id, location.parent_id);
                let occupancy = match (&lookup, tracked) {
                    (Some(lookup), true) => self.classify_one(location.id, lookup, now),
                    _ => OccupancyRecord::free(),
                };
                ClassifiedLocation { location, tracked, occupancy }
            })
            .collect()
    }

    async fn lookup(&self, store: &dyn InventoryStore, tracked_ids: &[i64]) -> ApiResult<Lookup> {
        let orders = store
            .active_orders_for_locations(tracked_ids, &self.settings.active_order_states)
            .await?;
        log::debug!(
            "Fetched {} active orders for {} tracked locations",
            orders.len(),
            tracked_ids.len()
        );

        let stocked = match self.settings.policy {
            ClassificationPolicy::Stock => store.stocked_locations(tracked_ids).await?,
            ClassificationPolicy::Container => HashSet::new(),
        };

        Ok(Lookup {
            orders: index_orders_by_location(orders),
            stocked,
        })
    }

    fn classify_one(&self, location_id: i64, lookup: &Lookup, now: DateTime<Utc>) -> OccupancyRecord {
        let order = lookup.orders.get(&location_id);

        match self.settings.policy {
            ClassificationPolicy::Container => match order {
                None => OccupancyRecord::free(),
                Some(order) if order.has_container() => {
                    self.with_order(OccupancyStatus::Occupied, order, now)
                }
                Some(order) => self.with_order(OccupancyStatus::Reserved, order, now),
            },
            ClassificationPolicy::Stock => {
                let has_stock = lookup.stocked.contains(&location_id);
                match (has_stock, order) {
                    (true, Some(order)) => self.with_order(OccupancyStatus::Occupied, order, now),
                    (true, None) => OccupancyRecord {
                        status: OccupancyStatus::Occupied,
                        order_ref: Some(UNKNOWN.to_string()),
                        customer: Some(UNKNOWN.to_string()),
                        ..OccupancyRecord::default()
                    },
                    (false, Some(order)) => self.with_order(OccupancyStatus::Reserved, order, now),
                    (false, None) => OccupancyRecord::free(),
                }
            }
        }
    }

    fn with_order(&self, status: OccupancyStatus, order: &Order, now: DateTime<Utc>) -> OccupancyRecord {
        let since = order.since();
        let customer = order
            .customer
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN);

        OccupancyRecord {
            status,
            order_id: Some(order.id),
            order_ref: Some(order.name.clone()),
            external_ref: order.external_ref.clone(),
            customer: Some(customer.to_string()),
            container_ref: if order.has_container() { order.container_ref.clone() } else { None },
            since: Some(since),
            duration: Some(self.settings.duration_unit.between(since, now)),
        }
    }
}

/// One order per location. When several active orders point at the same
/// location the most recently modified one wins (then the highest id).
fn index_orders_by_location(orders: Vec<Order>) -> HashMap<i64, Order> {
    let mut by_location: HashMap<i64, Order> = HashMap::with_capacity(orders.len());

    for order in orders {
        match by_location.get(&order.source_location_id) {
            Some(current) => {
                log::warn!(
                    "Location {} is held by several active orders ({} and {})",
                    order.source_location_id,
                    current.name,
                    order.name
                );
                if (order.write_date, order.id) > (current.write_date, current.id) {
                    by_location.insert(order.source_location_id, order);
                }
            }
            None => {
                by_location.insert(order.source_location_id, order);
            }
        }
    }

    by_location
}
