//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use shrink_core::config::{AppConfig, MetadataConfig, StorageConfig};
use shrink_metadata::{MetadataStore, SqliteStore};
use shrink_server::{AppState, create_router};
use shrink_signer::{CapabilitySigner, ServerSecret};
use shrink_storage::{FileStore, FilesystemBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Public base URL every test server advertises unless overridden.
#[allow(dead_code)]
pub const TEST_BASE_URL: &str = "http://shrink.test";

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    uploads_dir: PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let uploads_dir = temp_dir.path().join("uploads");
        let db_path = temp_dir.path().join("urls.db");

        let mut config = AppConfig::for_testing();
        config.server.public_url = Some(TEST_BASE_URL.to_string());
        config.storage = StorageConfig::Filesystem {
            path: uploads_dir.clone(),
        };
        config.metadata = MetadataConfig::Sqlite {
            path: db_path.clone(),
        };
        modifier(&mut config);

        let storage: Arc<dyn FileStore> = Arc::new(
            FilesystemBackend::new(&uploads_dir)
                .await
                .expect("Failed to create storage backend"),
        );
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );
        let secret = ServerSecret::from_config(&config.secret).expect("Failed to load secret");
        let signer = CapabilitySigner::new(secret).expect("Failed to create signer");

        let state = AppState::new(config, storage, metadata, signer);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            uploads_dir,
            _temp_dir: temp_dir,
        }
    }

    /// Directory holding stored uploads.
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Get access to the underlying metadata.
    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send a request and decode the JSON body (`Null` when empty or not JSON).
    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.send(request).await;
        let status = response.status();
        let body = read_body(response).await;
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// GET a path and decode the JSON body.
    pub async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send_json(request).await
    }
}

/// Collect a response body.
#[allow(dead_code)]
pub async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Strip the test base URL from a returned link, leaving the request path.
#[allow(dead_code)]
pub fn path_of(url: &str) -> &str {
    url.strip_prefix(TEST_BASE_URL)
        .unwrap_or_else(|| panic!("{url} does not start with {TEST_BASE_URL}"))
}
