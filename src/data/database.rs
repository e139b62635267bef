//! SQLite database operations
//!
//! All database access goes through this module. There is no pool:
//! every operation opens its own connection, runs exactly one
//! statement (inside a transaction that is committed right away when
//! the statement writes), and releases the connection when the guard
//! drops, on success and error paths alike.

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection, Sqlite, Transaction};

use super::models::*;
use crate::error::AppError;
use crate::metrics::{DB_CONNECTIONS_ACTIVE, DB_QUERIES_TOTAL, DB_QUERY_DURATION_SECONDS};

const SCHEMA: &str = include_str!("schema.sql");

/// Snapshot of the work a [`Database`] has performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementStats {
    /// Connections opened for dispatched operations
    pub connections: u64,
    /// Domain statements executed (transaction control excluded)
    pub statements: u64,
    /// Transactions committed
    pub commits: u64,
}

#[derive(Debug, Default)]
struct Counters {
    connections: AtomicU64,
    statements: AtomicU64,
    commits: AtomicU64,
    open: AtomicU64,
}

/// Connection held for the lifetime of one operation.
///
/// Dropping the guard closes the underlying SQLite connection.
struct ScopedConnection<'a> {
    conn: SqliteConnection,
    open: &'a AtomicU64,
}

impl Deref for ScopedConnection<'_> {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for ScopedConnection<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for ScopedConnection<'_> {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::Relaxed);
        DB_CONNECTIONS_ACTIVE.dec();
    }
}

/// Database handle: connection settings plus statement statistics.
#[derive(Debug)]
pub struct Database {
    options: SqliteConnectOptions,
    counters: Counters,
}

impl Database {
    /// Prepare a database from a `sqlite:` connection string.
    ///
    /// Opens one connection up front to fail fast on a bad location.
    /// When `bootstrap_schema` is set, `schema.sql` is applied on that
    /// connection. Neither step is counted in [`StatementStats`].
    pub async fn connect(url: &str, bootstrap_schema: bool) -> Result<Self, AppError> {
        if let Some(path) = database_file_path(url) {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
            }
        }

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let mut conn = options.connect().await?;
        if bootstrap_schema {
            for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                sqlx::query(statement).execute(&mut conn).await?;
            }
            tracing::info!("Database schema bootstrapped");
        }
        conn.close().await?;

        tracing::info!("Database reachable");

        Ok(Self {
            options,
            counters: Counters::default(),
        })
    }

    /// Current statement statistics.
    pub fn stats(&self) -> StatementStats {
        StatementStats {
            connections: self.counters.connections.load(Ordering::Relaxed),
            statements: self.counters.statements.load(Ordering::Relaxed),
            commits: self.counters.commits.load(Ordering::Relaxed),
        }
    }

    /// Connections currently held by in-flight operations.
    pub fn open_connections(&self) -> u64 {
        self.counters.open.load(Ordering::Relaxed)
    }

    async fn acquire(&self) -> Result<ScopedConnection<'_>, AppError> {
        let conn = self.options.connect().await?;
        self.counters.connections.fetch_add(1, Ordering::Relaxed);
        self.counters.open.fetch_add(1, Ordering::Relaxed);
        DB_CONNECTIONS_ACTIVE.inc();
        Ok(ScopedConnection {
            conn,
            open: &self.counters.open,
        })
    }

    fn record_statement(&self, operation: &str, table: &str, started: Instant) {
        self.counters.statements.fetch_add(1, Ordering::Relaxed);
        DB_QUERIES_TOTAL
            .with_label_values(&[operation, table])
            .inc();
        DB_QUERY_DURATION_SECONDS
            .with_label_values(&[operation, table])
            .observe(started.elapsed().as_secs_f64());
    }

    async fn commit(&self, tx: Transaction<'_, Sqlite>) -> Result<(), AppError> {
        tx.commit().await?;
        self.counters.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    // =========================================================================
    // Site settings
    // =========================================================================

    /// Latest settings row, if any
    pub async fn get_settings(&self) -> Result<Option<SiteSettings>, AppError> {
        let mut conn = self.acquire().await?;
        let started = Instant::now();
        let settings = sqlx::query_as::<_, SiteSettings>(
            "SELECT * FROM site_settings ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&mut *conn)
        .await;
        self.record_statement("select", "site_settings", started);
        Ok(settings?)
    }

    /// Overwrite the singleton row (id = 1). Returns rows affected.
    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<u64, AppError> {
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await?;
        let started = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE site_settings
            SET site_name = ?, site_description = ?, contact_telegram = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = 1
            "#,
        )
        .bind(&update.site_name)
        .bind(&update.site_description)
        .bind(&update.contact_telegram)
        .execute(&mut *tx)
        .await;
        self.record_statement("update", "site_settings", started);
        let affected = result?.rows_affected();
        self.commit(tx).await?;
        Ok(affected)
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// All services, newest first
    pub async fn list_services(&self) -> Result<Vec<Service>, AppError> {
        let mut conn = self.acquire().await?;
        let started = Instant::now();
        let services = sqlx::query_as::<_, Service>(
            "SELECT * FROM services ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&mut *conn)
        .await;
        self.record_statement("select", "services", started);
        Ok(services?)
    }

    /// Insert a service and return its id
    pub async fn create_service(&self, fields: &ServiceFields) -> Result<i64, AppError> {
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await?;
        let started = Instant::now();
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO services (title, description, requirements, price)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.requirements)
        .bind(fields.price)
        .fetch_one(&mut *tx)
        .await;
        self.record_statement("insert", "services", started);
        let id = id?;
        self.commit(tx).await?;
        Ok(id)
    }

    /// Replace every editable field of one service. Returns rows affected.
    pub async fn update_service(&self, update: &ServiceUpdate) -> Result<u64, AppError> {
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await?;
        let started = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE services
            SET title = ?, description = ?, requirements = ?, price = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(&update.requirements)
        .bind(update.price)
        .bind(update.id)
        .execute(&mut *tx)
        .await;
        self.record_statement("update", "services", started);
        let affected = result?.rows_affected();
        self.commit(tx).await?;
        Ok(affected)
    }

    /// Handle a service deletion request.
    ///
    /// The row is neither removed nor flagged: the statement assigns
    /// `title` to itself and leaves every column (including
    /// `updated_at`) untouched. Returns rows matched.
    pub async fn delete_service(&self, id: i64) -> Result<u64, AppError> {
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await?;
        let started = Instant::now();
        let result = sqlx::query("UPDATE services SET title = title WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await;
        self.record_statement("update", "services", started);
        let affected = result?.rows_affected();
        self.commit(tx).await?;
        Ok(affected)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// All orders with their service title, newest first
    pub async fn list_orders(&self) -> Result<Vec<OrderWithService>, AppError> {
        let mut conn = self.acquire().await?;
        let started = Instant::now();
        let orders = sqlx::query_as::<_, OrderWithService>(
            r#"
            SELECT o.*, s.title AS service_title
            FROM orders o
            LEFT JOIN services s ON o.service_id = s.id
            ORDER BY o.created_at DESC, o.id DESC
            "#,
        )
        .fetch_all(&mut *conn)
        .await;
        self.record_statement("select", "orders", started);
        Ok(orders?)
    }

    /// Insert an order in the initial status and return its id
    pub async fn create_order(&self, order: &NewOrder) -> Result<i64, AppError> {
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await?;
        let started = Instant::now();
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO orders (service_id, phone, uid, telegram, status)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(order.service_id)
        .bind(&order.phone)
        .bind(&order.uid)
        .bind(&order.telegram)
        .bind(INITIAL_ORDER_STATUS)
        .fetch_one(&mut *tx)
        .await;
        self.record_statement("insert", "orders", started);
        let id = id?;
        self.commit(tx).await?;
        Ok(id)
    }

    /// Set the status of one order. Returns rows affected.
    pub async fn update_order_status(&self, update: &OrderStatusUpdate) -> Result<u64, AppError> {
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await?;
        let started = Instant::now();
        let result = sqlx::query(
            "UPDATE orders SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(&update.status)
        .bind(update.order_id)
        .execute(&mut *tx)
        .await;
        self.record_statement("update", "orders", started);
        let affected = result?.rows_affected();
        self.commit(tx).await?;
        Ok(affected)
    }
}

/// File backing a `sqlite:` URL, if it names one.
fn database_file_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}
