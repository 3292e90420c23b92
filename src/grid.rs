// src/grid.rs
//! Dashboard grid: groups classified locations by zone or by physical
//! row/level/column and tallies the summary counters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use crate::config::WarehouseConfig;
use crate::error::ApiResult;
use crate::models::{ClassifiedLocation, GridLayoutKind, OccupancyStatus};
use crate::occupancy::OccupancyClassifier;
use crate::repositories::InventoryStore;

// ==================== RESPONSE SHAPES ====================

#[derive(Debug, Serialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct OccupancySummary {
    pub total: usize,
    pub free: usize,
    pub reserved: usize,
    pub occupied: usize,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LocationCell {
    pub id: i64,
    pub name: String,
    pub barcode: Option<String>,
    pub status: OccupancyStatus,
    pub order: Option<String>,
    pub customer: Option<String>,
    pub container: Option<String>,
    pub duration: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ZoneGroup {
    pub name: String,
    pub label: String,
    pub count: usize,
    pub locations: Vec<LocationCell>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LevelGroup {
    pub level: String,
    pub locations: Vec<LocationCell>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RowGroup {
    pub row: String,
    pub label: String,
    pub column_count: u32,
    pub columns: Vec<String>,
    pub levels: Vec<LevelGroup>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum GridLayout {
    Zones(Vec<ZoneGroup>),
    Rows(Vec<RowGroup>),
}

impl GridLayout {
    fn empty(kind: GridLayoutKind) -> Self {
        match kind {
            GridLayoutKind::Zones => GridLayout::Zones(Vec::new()),
            GridLayoutKind::Rows => GridLayout::Rows(Vec::new()),
        }
    }
}

/// Always deserializable by the dashboard: failures keep the same shape.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct GridResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub summary: OccupancySummary,
    #[serde(flatten)]
    pub layout: GridLayout,
}

impl GridResponse {
    pub fn failure(kind: GridLayoutKind, error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            summary: OccupancySummary::default(),
            layout: GridLayout::empty(kind),
        }
    }
}

// ==================== POSITION PARSING ====================

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct GridPosition {
    pub row: String,
    pub level: String,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    TooFewSegments(usize),
    EmptyToken,
    InvalidColumn(String),
    ColumnOutOfRange { column: u32, max: u32 },
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PositionError::TooFewSegments(n) => write!(f, "expected row-level-column, got {} segment(s)", n),
            PositionError::EmptyToken => write!(f, "row or level is empty"),
            PositionError::InvalidColumn(token) => write!(f, "column '{}' is not a number", token),
            PositionError::ColumnOutOfRange { column, max } => {
                write!(f, "column {} is outside 1..={}", column, max)
            }
        }
    }
}

/// `A-E-05` → row `A`, level `E`, column 5. Columns must fall in `1..=max_column`.
pub fn parse_position(name: &str, delimiter: &str, max_column: u32) -> Result<GridPosition, PositionError> {
    let parts: Vec<&str> = name.split(delimiter).map(str::trim).collect();
    if parts.len() < 3 {
        return Err(PositionError::TooFewSegments(parts.len()));
    }
    if parts[0].is_empty() || parts[1].is_empty() {
        return Err(PositionError::EmptyToken);
    }
    let column = parts[2]
        .parse::<u32>()
        .map_err(|_| PositionError::InvalidColumn(parts[2].to_string()))?;
    if column == 0 || column > max_column {
        return Err(PositionError::ColumnOutOfRange { column, max: max_column });
    }

    Ok(GridPosition {
        row: parts[0].to_string(),
        level: parts[1].to_string(),
        column,
    })
}

/// Dense column labels `01..=max_column`.
pub fn column_labels(max_column: u32) -> Vec<String> {
    (1..=max_column).map(|c| format!("{:02}", c)).collect()
}

/// `(key, label)` of the first zone whose prefix matches, else the default zone.
pub fn zone_for<'a>(name: &str, settings: &'a WarehouseConfig) -> (&'a str, &'a str) {
    settings
        .zones
        .iter()
        .find(|z| name.starts_with(&z.prefix))
        .map(|z| (z.key.as_str(), z.label.as_str()))
        .unwrap_or((settings.default_zone.key.as_str(), settings.default_zone.label.as_str()))
}

// ==================== GROUPING ====================

pub fn summarize(classified: &[ClassifiedLocation]) -> OccupancySummary {
    classified.iter().fold(
        OccupancySummary { total: classified.len(), ..Default::default() },
        |mut summary, c| {
            match c.status() {
                OccupancyStatus::Free => summary.free += 1,
                OccupancyStatus::Reserved => summary.reserved += 1,
                OccupancyStatus::Occupied => summary.occupied += 1,
            }
            summary
        },
    )
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl From<&ClassifiedLocation> for LocationCell {
    fn from(c: &ClassifiedLocation) -> Self {
        Self {
            id: c.location.id,
            name: c.location.name.clone(),
            barcode: c.location.barcode.clone(),
            status: c.occupancy.status,
            order: c.occupancy.order_ref.clone(),
            customer: c.occupancy.customer.clone(),
            container: c.occupancy.container_ref.clone(),
            duration: round_one_decimal(c.occupancy.duration.unwrap_or(0.0)),
        }
    }
}

/// Physical order; names that do not parse go last, by name.
fn physical_sort_key(name: &str, settings: &WarehouseConfig) -> (bool, String, String, u32) {
    match parse_position(name, &settings.name_delimiter, settings.max_column) {
        Ok(p) => (false, p.row, p.level, p.column),
        Err(_) => (true, name.to_string(), String::new(), 0),
    }
}

pub fn group_by_zone(classified: &[ClassifiedLocation], settings: &WarehouseConfig) -> Vec<ZoneGroup> {
    let mut groups: Vec<ZoneGroup> = settings
        .zones
        .iter()
        .map(|z| (z.key.as_str(), z.label.as_str()))
        .chain(std::iter::once((
            settings.default_zone.key.as_str(),
            settings.default_zone.label.as_str(),
        )))
        .map(|(key, label)| ZoneGroup {
            name: key.to_string(),
            label: label.to_string(),
            count: 0,
            locations: Vec::new(),
        })
        .collect();

    for c in classified {
        let (key, _) = zone_for(&c.location.name, settings);
        if let Some(group) = groups.iter_mut().find(|g| g.name == key) {
            group.locations.push(LocationCell::from(c));
        }
    }

    for group in &mut groups {
        group
            .locations
            .sort_by_cached_key(|cell| physical_sort_key(&cell.name, settings));
        group.count = group.locations.len();
    }

    // the catch-all zone only shows up when something landed in it
    if groups.last().map(|g| g.count == 0).unwrap_or(false) {
        groups.pop();
    }

    groups
}

fn ordered_keys<'a, V>(
    configured: &'a [String],
    seen: &'a BTreeMap<String, V>,
    reverse_unknown: bool,
) -> Vec<&'a str> {
    let mut keys: Vec<&str> = configured.iter().map(String::as_str).collect();
    let mut extra: Vec<&str> = seen
        .keys()
        .map(String::as_str)
        .filter(|k| !configured.iter().any(|c| c == k))
        .collect();
    if reverse_unknown {
        extra.reverse();
    }
    keys.extend(extra);
    keys
}

pub fn group_by_row(classified: &[ClassifiedLocation], settings: &WarehouseConfig) -> Vec<RowGroup> {
    let mut buckets: BTreeMap<String, BTreeMap<String, Vec<(u32, LocationCell)>>> = BTreeMap::new();

    for c in classified {
        match parse_position(&c.location.name, &settings.name_delimiter, settings.max_column) {
            Ok(position) => buckets
                .entry(position.row)
                .or_default()
                .entry(position.level)
                .or_default()
                .push((position.column, LocationCell::from(c))),
            Err(e) => log::warn!(
                "Skipping location {} ('{}') in grid layout: {}",
                c.location.id,
                c.location.name,
                e
            ),
        }
    }

    let no_levels = BTreeMap::new();
    ordered_keys(&settings.row_order, &buckets, false)
        .into_iter()
        .map(|row| {
            let levels = buckets.get(row).unwrap_or(&no_levels);
            let column_count = levels
                .values()
                .flatten()
                .map(|(column, _)| *column)
                .max()
                .unwrap_or(0);

            let level_groups = ordered_keys(&settings.level_order, levels, true)
                .into_iter()
                .map(|level| {
                    let mut cells: Vec<&(u32, LocationCell)> =
                        levels.get(level).map(|v| v.iter().collect()).unwrap_or_default();
                    cells.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));
                    LevelGroup {
                        level: level.to_string(),
                        locations: cells.into_iter().map(|(_, cell)| cell.clone()).collect(),
                    }
                })
                .collect();

            RowGroup {
                row: row.to_string(),
                label: format!("Row {}", row),
                column_count,
                columns: column_labels(column_count),
                levels: level_groups,
            }
        })
        .collect()
}

// ==================== ENTRY POINT ====================

/// Fetch, classify once, group. Failures are folded into the response.
#[tracing::instrument(skip_all, fields(layout = %kind))]
pub async fn build_grid(
    store: &dyn InventoryStore,
    settings: &WarehouseConfig,
    kind: GridLayoutKind,
    now: DateTime<Utc>,
) -> GridResponse {
    match try_build_grid(store, settings, kind, now).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("❌ Error fetching grid data: {:?}", e);
            GridResponse::failure(kind, e.to_string())
        }
    }
}

async fn try_build_grid(
    store: &dyn InventoryStore,
    settings: &WarehouseConfig,
    kind: GridLayoutKind,
    now: DateTime<Utc>,
) -> ApiResult<GridResponse> {
    let locations = store
        .tracked_locations(settings.location_id, &settings.location_usage)
        .await?;
    log::info!("📦 Found {} tracked locations", locations.len());

    let classified = OccupancyClassifier::new(settings)
        .classify(store, locations, now)
        .await;
    let summary = summarize(&classified);

    let layout = match kind {
        GridLayoutKind::Zones => GridLayout::Zones(group_by_zone(&classified, settings)),
        GridLayoutKind::Rows => GridLayout::Rows(group_by_row(&classified, settings)),
    };

    log::info!(
        "✅ Grid data prepared: total={} free={} reserved={} occupied={}",
        summary.total, summary.free, summary.reserved, summary.occupied
    );

    Ok(GridResponse {
        success: true,
        error: None,
        summary,
        layout,
    })
}
