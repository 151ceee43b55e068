//! Test utilities for handler and integration tests.

use crate::config::{ClientConfig, Config, UploadsConfig};
use crate::{AppState, build_router};
use axum_test::TestServer;
use std::path::Path;
use tempfile::TempDir;

pub fn create_test_config(upload_dir: &Path) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        uploads: UploadsConfig {
            dir: upload_dir.to_path_buf(),
            path_prefix: "/uploads".to_string(),
            token_length: 9,
        },
        client: ClientConfig {
            public_base_uri: "http://localhost:4000".to_string(),
            title: "Uploads".to_string(),
        },
        ..Default::default()
    }
}

/// App state over a fresh temporary upload directory. Keep the directory alive for the test.
pub async fn create_test_state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let state = AppState::from_config(create_test_config(dir.path()))
        .await
        .expect("Failed to create app state");
    (state, dir)
}

pub fn create_test_server_from(state: AppState) -> TestServer {
    let router = build_router(&state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

pub async fn create_test_server() -> (TestServer, TempDir) {
    let (state, dir) = create_test_state().await;
    (create_test_server_from(state), dir)
}
