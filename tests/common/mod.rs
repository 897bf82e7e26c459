//! Common test infrastructure
//!
//! Spawns an isolated server per test with its own temporary database, and
//! provides a thin HTTP client around reqwest. Tests should only import
//! from this module.

use clipflow_server::engagement::{
    AuthToken, AuthTokenStore, AuthTokenValue, CatalogStore, SqliteEngagementStore,
};
use clipflow_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

const REQUEST_TIMEOUT_SECS: u64 = 5;
const SERVER_READY_TIMEOUT_MS: u64 = 2000;

/// Test server instance with an isolated database.
///
/// When dropped, the server task shuts down and temp resources are
/// cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Store handle for direct database access in tests
    pub store: Arc<SqliteEngagementStore>,

    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port and waits until it
    /// answers.
    pub async fn spawn() -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_db_dir.path().join("platform.db");
        let store =
            Arc::new(SqliteEngagementStore::new(&db_path).expect("Failed to open platform store"));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            metrics_port: None,
            requests_logging_level: RequestsLoggingLevel::None,
        };
        let app = make_app(config, store.clone()).expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;
        server
    }

    /// Creates a user directly in the store and returns its id.
    pub fn create_user(&self, username: &str) -> usize {
        self.store
            .create_user(username, None)
            .expect("Failed to create user")
    }

    /// Creates a published video and returns its id.
    pub fn create_video(&self, owner_id: usize, title: &str) -> String {
        self.store
            .create_video(owner_id, title, None, None, Some(120.0))
            .expect("Failed to create video")
    }

    /// Mints a bearer token for a user (the identity-provider seam).
    pub fn issue_token(&self, user_id: usize) -> String {
        let token = AuthToken {
            user_id,
            value: AuthTokenValue::generate(),
        };
        self.store
            .add_auth_token(token.clone())
            .expect("Failed to add auth token");
        token.value.0
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);
        loop {
            if client.get(&self.base_url).send().await.is_ok() {
                return;
            }
            if start.elapsed() > timeout {
                panic!("Server did not become ready within {:?}", timeout);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// HTTP test client carrying a bearer token.
pub struct TestClient {
    pub client: reqwest::Client,
    pub base_url: String,
    token: Option<String>,
}

impl TestClient {
    /// Creates an unauthenticated client (anonymous viewer).
    pub fn anonymous(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");
        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client authenticated as the given user.
    pub fn authenticated(server: &TestServer, user_id: usize) -> Self {
        let mut client = Self::anonymous(server.base_url.clone());
        client.token = Some(server.issue_token(user_id));
        client
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", token);
        }
        builder
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::GET, path)
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::POST, path)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.request(reqwest::Method::POST, path)
            .json(&body)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn patch_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.request(reqwest::Method::PATCH, path)
            .json(&body)
            .send()
            .await
            .expect("PATCH request failed")
    }

    pub async fn put(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::PUT, path)
            .send()
            .await
            .expect("PUT request failed")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::DELETE, path)
            .send()
            .await
            .expect("DELETE request failed")
    }
}
