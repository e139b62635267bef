//! Request commands
//!
//! Turns the (method, `action` query parameter, body) triple into a
//! closed set of typed commands before anything touches the database.

use std::collections::HashMap;

use axum::http::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::data::{
    NewOrder, OrderStatusUpdate, ServiceFields, ServiceUpdate, SettingsUpdate,
};
use crate::error::AppError;

const NEW_ORDER_FIELDS: &[&str] = &["service_id", "phone", "uid", "telegram"];
const SERVICE_FIELDS: &[&str] = &["title", "description", "requirements", "price"];
const SERVICE_UPDATE_FIELDS: &[&str] = &["id", "title", "description", "requirements", "price"];
const SETTINGS_FIELDS: &[&str] = &["site_name", "site_description", "contact_telegram"];
const ORDER_STATUS_FIELDS: &[&str] = &["order_id", "status"];

/// One dispatchable operation
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// CORS preflight; never reaches the database
    Preflight,
    GetSettings,
    ListServices,
    ListOrders,
    CreateOrder(NewOrder),
    CreateService(ServiceFields),
    UpdateSettings(SettingsUpdate),
    UpdateOrderStatus(OrderStatusUpdate),
    UpdateService(ServiceUpdate),
    DeleteService { id: i64 },
    /// Method + action combination with no route
    RouteNotFound,
}

impl Command {
    /// Parse a request into a command.
    ///
    /// The route is chosen from method and action alone; the body is
    /// only read once a body-carrying route matched, so an unknown route
    /// is reported as such even when its body is garbage.
    ///
    /// # Errors
    /// - `InvalidBody` if the body is not a JSON object
    /// - `MissingField` if a required key is absent
    /// - `Validation` if a value has the wrong type, or `id` is not an integer
    pub fn parse(
        method: &Method,
        params: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<Self, AppError> {
        let action = params.get("action").map(String::as_str).unwrap_or_default();

        let command = match (method.as_str(), action) {
            ("OPTIONS", _) => Command::Preflight,
            ("GET", "settings") => Command::GetSettings,
            ("GET", "services") => Command::ListServices,
            ("GET", "orders") => Command::ListOrders,
            ("POST", "order") => Command::CreateOrder(fields(body, NEW_ORDER_FIELDS)?),
            ("POST", "service") => Command::CreateService(fields(body, SERVICE_FIELDS)?),
            ("PUT", "settings") => Command::UpdateSettings(fields(body, SETTINGS_FIELDS)?),
            ("PUT", "order_status") => {
                Command::UpdateOrderStatus(fields(body, ORDER_STATUS_FIELDS)?)
            }
            ("PUT", "service") => Command::UpdateService(fields(body, SERVICE_UPDATE_FIELDS)?),
            ("DELETE", "service") => match params.get("id").filter(|id| !id.is_empty()) {
                Some(raw) => Command::DeleteService {
                    id: raw.parse().map_err(|_| {
                        AppError::Validation(format!("id must be an integer, got {raw:?}"))
                    })?,
                },
                None => Command::RouteNotFound,
            },
            _ => Command::RouteNotFound,
        };

        Ok(command)
    }

    /// Whether the command writes (and therefore commits)
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::CreateOrder(_)
                | Command::CreateService(_)
                | Command::UpdateSettings(_)
                | Command::UpdateOrderStatus(_)
                | Command::UpdateService(_)
                | Command::DeleteService { .. }
        )
    }

    /// Stable route name for logs and metric labels
    pub fn name(&self) -> &'static str {
        match self {
            Command::Preflight => "preflight",
            Command::GetSettings => "get_settings",
            Command::ListServices => "list_services",
            Command::ListOrders => "list_orders",
            Command::CreateOrder(_) => "create_order",
            Command::CreateService(_) => "create_service",
            Command::UpdateSettings(_) => "update_settings",
            Command::UpdateOrderStatus(_) => "update_order_status",
            Command::UpdateService(_) => "update_service",
            Command::DeleteService { .. } => "delete_service",
            Command::RouteNotFound => "not_found",
        }
    }
}

/// Body as a JSON object; an empty body reads as `{}`.
fn body_object(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::InvalidBody(
            "request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::InvalidBody(e.to_string())),
    }
}

fn fields<T: DeserializeOwned>(body: &[u8], required: &[&str]) -> Result<T, AppError> {
    let map = body_object(body)?;

    if let Some(missing) = required.iter().find(|key| !map.contains_key(**key)) {
        return Err(AppError::MissingField((*missing).to_string()));
    }

    serde_json::from_value(Value::Object(map)).map_err(|e| AppError::Validation(e.to_string()))
}
