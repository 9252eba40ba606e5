//! Shared helpers for the integration tests.

use std::time::Duration;

use tempfile::TempDir;

use crate::{Application, Config};

/// Config pointed at a mock upstream, spooling into a private temp dir.
pub fn create_test_config(upstream_url: &str, upload_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.upload_dir = upload_dir.path().to_path_buf();
    config.upstream.url = format!("{upstream_url}/analyze").parse().expect("test upstream url");
    config.upstream.timeout = Duration::from_secs(2);
    config
}

pub async fn spawn_test_server(config: Config) -> axum_test::TestServer {
    Application::new(config)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// Number of spooled files currently on disk.
pub fn spool_entries(upload_dir: &TempDir) -> usize {
    std::fs::read_dir(upload_dir.path()).expect("read upload dir").count()
}
