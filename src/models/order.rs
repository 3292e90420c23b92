// src/models/order.rs
//! Sale orders that hold a source location while they move through production.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    /// Human-readable order number, e.g. `SO04211`.
    pub name: String,
    pub source_location_id: i64,
    pub state: String,
    /// Partner display name, absent when the order has no customer attached.
    pub customer: Option<String>,
    /// Box / transport unit the goods were collected into.
    pub container_ref: Option<String>,
    /// Marketplace order reference.
    pub external_ref: Option<String>,
    pub write_date: DateTime<Utc>,
    /// Most recent transition into one of the active states.
    pub state_changed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// When the order started holding its location.
    pub fn since(&self) -> DateTime<Utc> {
        self.state_changed_at.unwrap_or(self.write_date)
    }

    pub fn has_container(&self) -> bool {
        self.container_ref
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order() -> Order {
        Order {
            id: 1,
            name: "SO001".to_string(),
            source_location_id: 100,
            state: "manufactured".to_string(),
            customer: None,
            container_ref: None,
            external_ref: None,
            write_date: Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap(),
            state_changed_at: None,
        }
    }

    #[test]
    fn test_since_prefers_state_change() {
        let mut o = order();
        assert_eq!(o.since(), o.write_date);

        let changed = Utc.with_ymd_and_hms(2026, 9, 30, 12, 0, 0).unwrap();
        o.state_changed_at = Some(changed);
        assert_eq!(o.since(), changed);
    }

    #[test]
    fn test_blank_container_is_not_a_container() {
        let mut o = order();
        assert!(!o.has_container());
        o.container_ref = Some("   ".to_string());
        assert!(!o.has_container());
        o.container_ref = Some("BOX-17".to_string());
        assert!(o.has_container());
    }
}
