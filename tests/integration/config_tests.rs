use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;
use vcpkg_cache::config::{Config, ENV_PREFIX};

#[test]
fn test_config_load_defaults() {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config.packages_dir, PathBuf::from("vcpkg/packages"));
    assert_eq!(config.cache_dir, PathBuf::from("vcpkg-cache"));
    assert!(config.known_triplets.is_empty());
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
packages_dir = "/opt/vcpkg/packages"
known_triplets = ["x64-linux", "x64-linux-dynamic"]
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(config.packages_dir, PathBuf::from("/opt/vcpkg/packages"));
    assert_eq!(config.cache_dir, PathBuf::from("vcpkg-cache"));
    assert_eq!(config.known_triplets, vec!["x64-linux", "x64-linux-dynamic"]);
}

#[test]
fn test_env_overrides_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "cache_dir = \"/from/file\"\n").unwrap();

    // A private prefix keeps this test from leaking into Config::load calls
    // running in parallel.
    std::env::set_var("VCPKG_CACHE_TEST_CACHE_DIR", "/from/env");
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed("VCPKG_CACHE_TEST_"))
        .extract()
        .unwrap();
    std::env::remove_var("VCPKG_CACHE_TEST_CACHE_DIR");

    assert_eq!(config.cache_dir, PathBuf::from("/from/env"));
    assert_eq!(ENV_PREFIX, "VCPKG_CACHE_");
}

#[test]
fn test_config_invalid_toml_is_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "packages_dir = [unterminated").unwrap();

    assert!(Config::load(Some(&config_path)).is_err());
}

#[test]
fn test_config_to_toml_lists_every_field() {
    let text = Config::default().to_toml().unwrap();
    assert!(text.contains("packages_dir = \"vcpkg/packages\""));
    assert!(text.contains("cache_dir = \"vcpkg-cache\""));
    assert!(text.contains("known_triplets = []"));
}
