//! Service layer
//!
//! Request parsing and dispatch, separated from the HTTP handlers.
//! A request becomes a [`Command`]; the [`Dispatcher`] runs it as a
//! single database statement.

mod command;
mod dispatcher;

pub use command::Command;
pub use dispatcher::{CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_MAX_AGE, Dispatcher, Reply};
