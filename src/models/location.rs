// src/models/location.rs
//! Storage locations as read from the inventory collaborator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Location {
    pub id: i64,
    /// Structured position code: `Row-Level-Column` (`A-E-05`) or `Prefix-Number` (`M-001`).
    pub name: String,
    pub barcode: Option<String>,
    pub parent_id: Option<i64>,
    pub usage: String,
}

#[cfg(test)]
impl Location {
    pub fn new(id: i64, name: &str, parent_id: Option<i64>) -> Self {
        Self {
            id,
            name: name.to_string(),
            barcode: None,
            parent_id,
            usage: "internal".to_string(),
        }
    }
}
