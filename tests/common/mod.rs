//! Common test utilities for E2E tests

#![allow(dead_code)]

use easyadventure::{AppState, config};
use sqlx::{Connection, SqliteConnection};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub database_url: String,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server backed by a fresh schema
    pub async fn new() -> Self {
        Self::start(true).await
    }

    /// Create a test server whose database has no tables
    pub async fn without_schema() -> Self {
        Self::start(false).await
    }

    async fn start(bootstrap_schema: bool) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let database_url = format!("sqlite://{}", temp_dir.path().join("test.db").display());

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                max_body_bytes: 64 * 1024,
            },
            database: config::DatabaseConfig {
                url: database_url.clone(),
                bootstrap_schema,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = easyadventure::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            database_url,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// URL of the dispatch endpoint for an action
    pub fn action_url(&self, action: &str) -> String {
        self.url(&format!("/?action={action}"))
    }

    /// Insert the singleton settings row directly
    pub async fn seed_settings(&self, site_name: &str) {
        let mut conn = SqliteConnection::connect(&self.database_url).await.unwrap();
        sqlx::query(
            "INSERT INTO site_settings (id, site_name, site_description, contact_telegram)
             VALUES (1, ?, 'Account levelling', 't.me/easy')",
        )
        .bind(site_name)
        .execute(&mut conn)
        .await
        .unwrap();
    }

    /// Create a service through the API and return its id
    pub async fn create_service(&self, title: &str) -> i64 {
        let response = self
            .client
            .post(self.action_url("service"))
            .json(&serde_json::json!({
                "title": title,
                "description": "desc",
                "requirements": "req",
                "price": 10,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        body["service_id"].as_i64().unwrap()
    }
}
