mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./geoscout.toml",
        "~/.config/geoscout/config.toml",
        "/etc/geoscout/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.crawl.root_url.trim().is_empty() {
        anyhow::bail!("crawl.root_url cannot be empty");
    }

    if config.crawl.extension.trim_start_matches('.').is_empty() {
        anyhow::bail!("crawl.extension cannot be empty");
    }

    if config.crawl.max_concurrency == 0 {
        anyhow::bail!("crawl.max_concurrency must be at least 1");
    }

    if config.crawl.request_timeout_secs == 0 {
        anyhow::bail!("crawl.request_timeout_secs must be at least 1");
    }

    if config.enrich.limit == Some(0) {
        anyhow::bail!("enrich.limit must be at least 1 when set");
    }

    if config.enrich.checkpoint_every == 0 {
        anyhow::bail!("enrich.checkpoint_every must be at least 1");
    }

    if config.extract.timeout_secs == 0 {
        anyhow::bail!("extract.timeout_secs must be at least 1");
    }

    if let Some(ref ts) = config.publish.item_datetime {
        chrono::DateTime::parse_from_rfc3339(ts)
            .with_context(|| format!("publish.item_datetime is not RFC 3339: {ts}"))?;
    }

    if let Some(ref path) = config.extract.duckdb_path {
        if !path.exists() {
            tracing::warn!("Configured duckdb binary does not exist: {:?}", path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.crawl.extension, "parquet");
        assert_eq!(config.crawl.request_timeout_secs, 10);
        assert_eq!(config.enrich.limit, None);
        assert_eq!(config.enrich.checkpoint_every, 1);
        assert_eq!(
            config.catalog.path,
            std::path::PathBuf::from("results/parquet_result.json")
        );
    }

    #[test]
    fn sections_override_defaults() {
        let file = write_config(
            r#"
[crawl]
root_url = "http://localhost:9000/data/"
extension = "pmtiles"
max_concurrency = 4

[enrich]
limit = 3

[publish]
item_datetime = "2023-07-26T00:00:00Z"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.crawl.root_url, "http://localhost:9000/data/");
        assert_eq!(config.crawl.extension, "pmtiles");
        assert_eq!(config.crawl.max_concurrency, 4);
        assert_eq!(config.enrich.limit, Some(3));
        assert_eq!(
            config.publish.item_datetime.as_deref(),
            Some("2023-07-26T00:00:00Z")
        );
    }

    #[test]
    fn zero_limit_is_rejected() {
        let file = write_config("[enrich]\nlimit = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("enrich.limit"));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let file = write_config("[crawl]\nmax_concurrency = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn bad_datetime_is_rejected() {
        let file = write_config("[publish]\nitem_datetime = \"yesterday\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_or_default(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }
}
