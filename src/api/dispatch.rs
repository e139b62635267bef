//! Dispatch endpoint
//!
//! Every storefront operation is served from one path; the HTTP
//! method and the `action` query parameter select what happens:
//!
//! - OPTIONS ?action=*            - CORS preflight
//! - GET     ?action=settings     - Latest site settings (or `{}`)
//! - GET     ?action=services     - All services, newest first
//! - GET     ?action=orders       - All orders with service title, newest first
//! - POST    ?action=order        - Place an order (status "pending")
//! - POST    ?action=service      - Create a service
//! - PUT     ?action=settings     - Overwrite site settings
//! - PUT     ?action=order_status - Change an order's status
//! - PUT     ?action=service      - Replace a service
//! - DELETE  ?action=service&id=N - Acknowledge deletion (row is kept)

use std::collections::HashMap;

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::Method,
    routing::any,
};

use crate::AppState;
use crate::error::AppError;
use crate::service::Reply;

/// Create dispatch router
///
/// Routes:
/// - ANY / - dispatched on method + `action`
pub fn dispatch_router() -> Router<AppState> {
    Router::new().route("/", any(dispatch))
}

/// ANY /?action=...
async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Reply, AppError> {
    state.dispatcher.handle(&method, &params, &body).await
}

/// Fallback for paths other than the dispatch endpoint
pub async fn not_found() -> AppError {
    AppError::NotFound
}
