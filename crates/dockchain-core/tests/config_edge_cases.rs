use std::fs;
use std::path::PathBuf;

use dockchain_core::config::{Config, ConfigError, Endpoint, EngineProfile};
use tempfile::TempDir;

/// Returns true if running as root (euid == 0). Used to skip permission tests.
#[cfg(unix)]
fn is_root() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim() == "0")
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// 1. Missing config directory / nonexistent path
// ---------------------------------------------------------------------------

#[test]
fn load_from_nonexistent_path_returns_default_config() {
    let path = PathBuf::from("/tmp/dockchain-test-nonexistent/does/not/exist/config.toml");
    assert!(!path.exists());

    let config = Config::load_from_path(&path).expect("should not error on missing path");

    assert!(config.profiles.is_empty());
    assert!(config.default_profile.is_none());
}

// ---------------------------------------------------------------------------
// 2. Empty config file
// ---------------------------------------------------------------------------

#[test]
fn load_empty_config_file_returns_default_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();

    let config = Config::load_from_path(&config_path).expect("empty file should parse as default");

    assert!(config.profiles.is_empty());
    assert!(config.default_profile.is_none());
}

// ---------------------------------------------------------------------------
// 3. Corrupt / invalid TOML
// ---------------------------------------------------------------------------

#[test]
fn load_corrupt_toml_returns_parse_error() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[[[broken").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
    assert!(
        err.to_string().contains("parse"),
        "error should mention parsing: {err}"
    );
}

// ---------------------------------------------------------------------------
// 4. Profile missing required fields
// ---------------------------------------------------------------------------

#[test]
fn http_profile_without_url_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[profiles.remote]
endpoint = "http"
"#,
    )
    .unwrap();

    assert!(Config::load_from_path(&config_path).is_err());
}

#[test]
fn profile_without_endpoint_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[profiles.nothing]
timeout_secs = 10
"#,
    )
    .unwrap();

    assert!(Config::load_from_path(&config_path).is_err());
}

// ---------------------------------------------------------------------------
// 5. Save / load round trip through nested directories
// ---------------------------------------------------------------------------

#[test]
fn save_creates_parent_directories_and_reloads() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("nested").join("deeper").join("config.toml");

    let mut config = Config::default();
    config.set_profile(
        "sock".to_string(),
        EngineProfile::new(Endpoint::Unix {
            path: "/run/docker.sock".to_string(),
        })
        .with_timeout_secs(15),
    );
    config.default_profile = Some("sock".to_string());
    config.save_to_path(&config_path).unwrap();

    let loaded = Config::load_from_path(&config_path).unwrap();
    assert_eq!(loaded.default_profile.as_deref(), Some("sock"));
    let profile = loaded.profile("sock").unwrap();
    assert_eq!(profile.timeout_secs, 15);
    assert_eq!(
        profile.endpoint,
        Endpoint::Unix {
            path: "/run/docker.sock".to_string()
        }
    );
}

// ---------------------------------------------------------------------------
// 6. Env expansion applies on load
// ---------------------------------------------------------------------------

#[test]
#[serial_test::serial]
fn load_expands_env_defaults() {
    unsafe {
        std::env::remove_var("DOCKCHAIN_EDGE_HOST");
    }
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
[profiles.remote]
endpoint = "http"
url = "${DOCKCHAIN_EDGE_HOST:-tcp://127.0.0.1:2375}"
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&config_path).unwrap();
    assert_eq!(
        config.profile("remote").unwrap().endpoint,
        Endpoint::Http {
            url: "tcp://127.0.0.1:2375".to_string()
        }
    );
}

// ---------------------------------------------------------------------------
// 7. Unreadable file
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn load_unreadable_file_returns_load_error() {
    use std::os::unix::fs::PermissionsExt;

    if is_root() {
        return;
    }

    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[profiles]").unwrap();
    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o000)).unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::LoadError { .. }));

    fs::set_permissions(&config_path, fs::Permissions::from_mode(0o644)).unwrap();
}
