//! Data models
//!
//! Rust structs representing database rows and the field sets
//! written by each mutating statement. Timestamps are stamped by
//! the database and decoded as UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Site settings (singleton row, id = 1)
// =============================================================================

/// Site-wide presentation settings
///
/// Only the row with the highest id is ever read.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SiteSettings {
    pub id: i64,
    pub site_name: String,
    pub site_description: String,
    /// Telegram contact shown on the landing page (e.g. "t.me/handle")
    pub contact_telegram: String,
    pub updated_at: DateTime<Utc>,
}

/// Replacement values for the singleton settings row
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SettingsUpdate {
    pub site_name: String,
    pub site_description: String,
    pub contact_telegram: String,
}

// =============================================================================
// Service
// =============================================================================

/// A purchasable levelling service
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub requirements: String,
    /// Price in roubles
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a service
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceFields {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub price: f64,
}

/// Full replacement of an existing service
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceUpdate {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub price: f64,
}

// =============================================================================
// Order
// =============================================================================

/// Status assigned to every newly created order
pub const INITIAL_ORDER_STATUS: &str = "pending";

/// A customer order for a service
///
/// `service_id` is a weak reference: it is never checked against
/// the services table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub service_id: i64,
    pub phone: String,
    /// In-game account UID
    pub uid: String,
    pub telegram: String,
    /// Free text: pending, accepted, completed, cancelled, rejected
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order row joined with the title of its service
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderWithService {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    /// None when the referenced service does not exist
    pub service_title: Option<String>,
}

/// Fields supplied by a customer placing an order
///
/// No status field: orders always start in [`INITIAL_ORDER_STATUS`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewOrder {
    pub service_id: i64,
    pub phone: String,
    pub uid: String,
    pub telegram: String,
}

/// Status change for one order
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderStatusUpdate {
    pub order_id: i64,
    pub status: String,
}
