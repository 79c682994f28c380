use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use wiremock::MockServer;

use llmq::api::http::HttpQueryApi;
use llmq::app::App;
use llmq::config::{ApiConfig, ChatConfig};
use llmq::session::store::{MemorySessionStore, SessionStore};

/// HTTP client pointed at the mock server's `/api/v1` root.
#[allow(dead_code)]
pub fn api_for(server: &MockServer) -> HttpQueryApi {
    HttpQueryApi::new(&ApiConfig {
        base_url: format!("{}/api/v1", server.uri()),
        timeout_seconds: Some(5),
    })
    .expect("failed to build http client")
}

/// App over the mock server with the given session store.
#[allow(dead_code)]
pub fn app_with_store(server: &MockServer, store: Box<dyn SessionStore>) -> App {
    App::new(Arc::new(api_for(server)), store, ChatConfig::default())
}

/// App over the mock server with a fresh in-memory store, plus a handle on
/// that store for inspecting what was persisted.
#[allow(dead_code)]
pub fn memory_app(server: &MockServer) -> (App, MemorySessionStore) {
    let store = MemorySessionStore::new();
    let app = app_with_store(server, Box::new(store.clone()));
    (app, store)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
