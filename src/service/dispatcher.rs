//! Request dispatcher
//!
//! Executes one [`Command`] against the database and produces the
//! reply envelope. Holds no state between requests beyond the
//! database handle.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};

use super::command::Command;
use crate::data::Database;
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;

/// Methods advertised to preflight requests
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
/// Request headers advertised to preflight requests
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, X-Admin-Auth";
/// Preflight cache lifetime in seconds (24h)
pub const CORS_MAX_AGE: &str = "86400";

/// Successful outcome of a dispatched command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// 200, CORS preflight headers, empty body
    Preflight,
    /// 200 with a JSON body
    Json(Value),
}

impl Reply {
    fn json<T: Serialize>(value: T) -> Result<Self, AppError> {
        serde_json::to_value(value)
            .map(Reply::Json)
            .map_err(|e| AppError::Internal(e.into()))
    }

    fn success() -> Self {
        Reply::Json(json!({ "success": true }))
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let allow_origin = (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );

        match self {
            Reply::Preflight => (
                StatusCode::OK,
                [
                    allow_origin,
                    (
                        header::ACCESS_CONTROL_ALLOW_METHODS,
                        HeaderValue::from_static(CORS_ALLOW_METHODS),
                    ),
                    (
                        header::ACCESS_CONTROL_ALLOW_HEADERS,
                        HeaderValue::from_static(CORS_ALLOW_HEADERS),
                    ),
                    (
                        header::ACCESS_CONTROL_MAX_AGE,
                        HeaderValue::from_static(CORS_MAX_AGE),
                    ),
                ],
            )
                .into_response(),
            Reply::Json(body) => (StatusCode::OK, [allow_origin], axum::Json(body)).into_response(),
        }
    }
}

/// Routes commands to single database statements
pub struct Dispatcher {
    db: Arc<Database>,
}

impl Dispatcher {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Parse and execute one request.
    ///
    /// Every outcome is counted under the command name, or `rejected`
    /// when the request never became a command.
    pub async fn handle(
        &self,
        method: &Method,
        params: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<Reply, AppError> {
        let (route, result) = match Command::parse(method, params, body) {
            Ok(command) => {
                let route = command.name();
                (route, self.execute(command).await)
            }
            Err(error) => ("rejected", Err(error)),
        };

        let status = match &result {
            Ok(_) => StatusCode::OK,
            Err(error) => error.status(),
        };
        HTTP_REQUESTS_TOTAL
            .with_label_values(&[method.as_str(), route, status.as_str()])
            .inc();

        if let Err(error) = &result {
            tracing::debug!(%method, route, error = %error, "Request rejected");
        }

        result
    }

    /// Execute a parsed command.
    ///
    /// Each variant maps to exactly one database operation, except
    /// `Preflight` and `RouteNotFound` which perform none.
    pub async fn execute(&self, command: Command) -> Result<Reply, AppError> {
        tracing::debug!(command = command.name(), "Dispatching");

        match command {
            Command::Preflight => Ok(Reply::Preflight),
            Command::RouteNotFound => Err(AppError::NotFound),

            Command::GetSettings => match self.db.get_settings().await? {
                Some(settings) => Reply::json(settings),
                None => Ok(Reply::Json(json!({}))),
            },
            Command::ListServices => Reply::json(self.db.list_services().await?),
            Command::ListOrders => Reply::json(self.db.list_orders().await?),

            Command::CreateOrder(order) => {
                let order_id = self.db.create_order(&order).await?;
                tracing::info!(order_id, service_id = order.service_id, "Order created");
                Ok(Reply::Json(json!({ "success": true, "order_id": order_id })))
            }
            Command::CreateService(fields) => {
                let service_id = self.db.create_service(&fields).await?;
                tracing::info!(service_id, title = %fields.title, "Service created");
                Ok(Reply::Json(json!({ "success": true, "service_id": service_id })))
            }
            Command::UpdateSettings(update) => {
                let affected = self.db.update_settings(&update).await?;
                tracing::info!(affected, "Site settings updated");
                Ok(Reply::success())
            }
            Command::UpdateOrderStatus(update) => {
                let affected = self.db.update_order_status(&update).await?;
                tracing::info!(
                    order_id = update.order_id,
                    status = %update.status,
                    affected,
                    "Order status updated"
                );
                Ok(Reply::success())
            }
            Command::UpdateService(update) => {
                let affected = self.db.update_service(&update).await?;
                tracing::info!(service_id = update.id, affected, "Service updated");
                Ok(Reply::success())
            }
            Command::DeleteService { id } => {
                let matched = self.db.delete_service(id).await?;
                tracing::info!(service_id = id, matched, "Service delete requested; row kept");
                Ok(Reply::success())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StatementStats;
    use tempfile::TempDir;

    async fn create_dispatcher() -> (Dispatcher, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", temp_dir.path().join("test.db").display());
        let db = Arc::new(Database::connect(&url, true).await.unwrap());
        (Dispatcher::new(db.clone()), db, temp_dir)
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn delta(before: StatementStats, after: StatementStats) -> (u64, u64, u64) {
        (
            after.connections - before.connections,
            after.statements - before.statements,
            after.commits - before.commits,
        )
    }

    #[tokio::test]
    async fn each_route_runs_one_statement_and_commits_writes() {
        let (dispatcher, db, _temp_dir) = create_dispatcher().await;

        let cases: Vec<(Method, Vec<(&str, &str)>, &str, bool)> = vec![
            (Method::GET, vec![("action", "settings")], "", false),
            (Method::GET, vec![("action", "services")], "", false),
            (Method::GET, vec![("action", "orders")], "", false),
            (
                Method::POST,
                vec![("action", "service")],
                r#"{"title":"Leveling","description":"desc","requirements":"req","price":10}"#,
                true,
            ),
            (
                Method::POST,
                vec![("action", "order")],
                r#"{"service_id":1,"phone":"+7","uid":"42","telegram":"@me"}"#,
                true,
            ),
            (
                Method::PUT,
                vec![("action", "settings")],
                r#"{"site_name":"A","site_description":"B","contact_telegram":"C"}"#,
                true,
            ),
            (
                Method::PUT,
                vec![("action", "order_status")],
                r#"{"order_id":1,"status":"accepted"}"#,
                true,
            ),
            (
                Method::PUT,
                vec![("action", "service")],
                r#"{"id":1,"title":"T","description":"D","requirements":"R","price":2}"#,
                true,
            ),
            (
                Method::DELETE,
                vec![("action", "service"), ("id", "1")],
                "",
                true,
            ),
        ];

        for (method, pairs, body, mutating) in cases {
            let before = db.stats();
            let reply = dispatcher
                .handle(&method, &query(&pairs), body.as_bytes())
                .await
                .unwrap();
            assert!(matches!(reply, Reply::Json(_)));
            let expected = if mutating { (1, 1, 1) } else { (1, 1, 0) };
            assert_eq!(delta(before, db.stats()), expected, "{method} {pairs:?}");
        }
    }

    #[tokio::test]
    async fn preflight_and_unmatched_routes_touch_nothing() {
        let (dispatcher, db, _temp_dir) = create_dispatcher().await;

        let reply = dispatcher
            .handle(&Method::OPTIONS, &query(&[("action", "orders")]), b"")
            .await
            .unwrap();
        assert_eq!(reply, Reply::Preflight);

        let error = dispatcher
            .handle(&Method::GET, &query(&[("action", "nothing")]), b"")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::NotFound));

        let error = dispatcher
            .handle(&Method::POST, &query(&[("action", "order")]), b"{}")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::MissingField(_)));

        assert_eq!(db.stats(), StatementStats::default());
    }

    #[tokio::test]
    async fn handle_counts_requests_by_route_and_status() {
        let (dispatcher, _db, _temp_dir) = create_dispatcher().await;
        let count = |method: &str, route: &str, status: &str| {
            HTTP_REQUESTS_TOTAL
                .with_label_values(&[method, route, status])
                .get()
        };

        let listed = count("GET", "list_services", "200");
        let unmatched = count("PATCH", "not_found", "404");
        let rejected = count("PUT", "rejected", "400");

        dispatcher
            .handle(&Method::GET, &query(&[("action", "services")]), b"")
            .await
            .unwrap();
        dispatcher
            .handle(&Method::PATCH, &query(&[("action", "service")]), b"")
            .await
            .unwrap_err();
        dispatcher
            .handle(&Method::PUT, &query(&[("action", "settings")]), b"[1]")
            .await
            .unwrap_err();

        assert!(count("GET", "list_services", "200") > listed);
        assert!(count("PATCH", "not_found", "404") > unmatched);
        assert!(count("PUT", "rejected", "400") > rejected);
    }

    #[tokio::test]
    async fn empty_settings_reply_is_empty_object() {
        let (dispatcher, _db, _temp_dir) = create_dispatcher().await;

        let reply = dispatcher.execute(Command::GetSettings).await.unwrap();
        assert_eq!(reply, Reply::Json(json!({})));
    }

    #[tokio::test]
    async fn create_replies_carry_generated_ids() {
        let (dispatcher, _db, _temp_dir) = create_dispatcher().await;

        let body = br#"{"title":"Leveling","description":"desc","requirements":"req","price":10}"#;
        let reply = dispatcher
            .handle(&Method::POST, &query(&[("action", "service")]), body)
            .await
            .unwrap();
        let Reply::Json(value) = reply else {
            panic!("expected JSON reply");
        };
        assert_eq!(value["success"], json!(true));
        let service_id = value["service_id"].as_i64().unwrap();

        let body = format!(
            r#"{{"service_id":{service_id},"phone":"+7","uid":"42","telegram":"@me","status":"done"}}"#
        );
        let reply = dispatcher
            .handle(&Method::POST, &query(&[("action", "order")]), body.as_bytes())
            .await
            .unwrap();
        let Reply::Json(value) = reply else {
            panic!("expected JSON reply");
        };
        assert!(value["order_id"].as_i64().is_some());

        let Reply::Json(orders) = dispatcher.execute(Command::ListOrders).await.unwrap() else {
            panic!("expected JSON reply");
        };
        assert_eq!(orders[0]["status"], json!("pending"));
        assert_eq!(orders[0]["service_title"], json!("Leveling"));
    }

    #[test]
    fn preflight_response_headers() {
        let response = Reply::Preflight.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], CORS_ALLOW_METHODS);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], CORS_ALLOW_HEADERS);
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], CORS_MAX_AGE);
        assert!(!headers.contains_key(header::CONTENT_TYPE));
    }

    #[test]
    fn json_response_headers() {
        let response = Reply::success().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }
}
