//! API layer
//!
//! HTTP handlers for:
//! - The storefront dispatch endpoint
//! - Metrics (Prometheus)

mod dispatch;
pub mod metrics;

pub use dispatch::{dispatch_router, not_found};
pub use metrics::metrics_router;
