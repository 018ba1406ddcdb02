use std::fs;

use portal::{cache::QueryOptions, config::load_config_from};
use tempfile::TempDir;

#[tokio::test]
async fn loads_yaml_from_disk() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("portal.yaml");
    fs::write(
        &path,
        "server:\n  host: 0.0.0.0\n  port: 4100\napi:\n  base_url: http://backend:9000/api/v1\n  top_k: 25\ncache:\n  refetch_on_focus: true\n  retry: 3\n  stale_time_secs: 60\nfallback:\n  synthetic_data: false\n",
    )?;

    let config = load_config_from(&path).await?;

    assert_eq!(config.server.port, 4100);
    assert_eq!(config.api.base_url, "http://backend:9000/api/v1");
    assert_eq!(config.api.top_k, 25);
    assert_eq!(config.api.applications_limit, 50);
    assert!(!config.fallback.synthetic_data);

    let options = QueryOptions::from(&config.cache);
    assert!(options.refetch_on_focus);
    assert_eq!(options.retry, 3);
    assert_eq!(options.stale_time.as_secs(), 60);
    Ok(())
}

#[tokio::test]
async fn missing_file_names_the_path() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("absent.yaml");
    let err = load_config_from(&path).await.unwrap_err();
    assert!(format!("{err:#}").contains("absent.yaml"));
}

#[tokio::test]
async fn malformed_yaml_is_rejected() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("portal.yaml");
    fs::write(&path, "server: [not, a, map]\n").expect("write config");
    let err = load_config_from(&path).await.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config file"));
}
