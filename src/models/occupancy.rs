// src/models/occupancy.rs
//! Derived occupancy state. Nothing here is ever persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr, Default)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OccupancyStatus {
    #[default]
    Free,
    Reserved,
    Occupied,
}

/// Which signal decides between reserved and occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr, Default)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// An active order with a container assigned occupies its location.
    #[default]
    Container,
    /// Positive stock on the location occupies it, regardless of orders.
    Stock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr, Default)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Hours,
    #[default]
    Days,
}

impl DurationUnit {
    pub fn seconds(&self) -> f64 {
        match self {
            DurationUnit::Hours => 3600.0,
            DurationUnit::Days => 86400.0,
        }
    }

    /// Elapsed time from `since` to `now`, never negative.
    pub fn between(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - since).num_seconds().max(0) as f64;
        elapsed / self.seconds()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr, Default)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GridLayoutKind {
    Zones,
    #[default]
    Rows,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct OccupancyRecord {
    pub status: OccupancyStatus,
    pub order_id: Option<i64>,
    pub order_ref: Option<String>,
    pub external_ref: Option<String>,
    pub customer: Option<String>,
    pub container_ref: Option<String>,
    pub since: Option<DateTime<Utc>>,
    /// Time spent in the current status, in the configured unit.
    pub duration: Option<f64>,
}

impl OccupancyRecord {
    pub fn free() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedLocation {
    pub location: Location,
    pub tracked: bool,
    pub occupancy: OccupancyRecord,
}

impl ClassifiedLocation {
    pub fn status(&self) -> OccupancyStatus {
        self.occupancy.status
    }
}
