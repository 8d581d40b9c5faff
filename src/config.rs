//! Runtime configuration: the source registry and pipeline limits.
//!
//! Configuration is optional. Without a file the built-in registry of four
//! RSSHub JSON endpoints is used with the defaults below. A YAML file may
//! override any subset of keys:
//!
//! ```yaml
//! output_path: public/hot.json
//! timeout_secs: 8
//! retries: 1
//! sources:
//!   - name: Hacker News
//!     url: https://hnrss.org/frontpage
//!     format: rss
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

/// Payload shape returned by a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    /// A JSON object with an `items` or `data` array.
    #[default]
    Json,
    /// An RSS 2.0 or Atom document.
    #[serde(alias = "xml", alias = "atom")]
    Rss,
    /// Decide from the first non-whitespace byte of the body.
    Auto,
}

/// One upstream feed endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    /// Display label copied onto every item from this source.
    pub name: String,
    /// Fetch endpoint.
    pub url: String,
    /// Expected payload shape.
    #[serde(default)]
    pub format: FeedFormat,
}

impl SourceConfig {
    pub fn new(name: &str, url: &str, format: FeedFormat) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            format,
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Sources in registry order; dedup keeps the earliest source's item.
    pub sources: Vec<SourceConfig>,
    /// Where the snapshot is written.
    pub output_path: PathBuf,
    /// Maximum number of items in the snapshot.
    pub max_items: usize,
    /// Maximum number of items taken from each source.
    pub items_per_source: usize,
    /// Maximum description length, in characters.
    pub description_length: usize,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Extra attempts per source after a failed fetch.
    pub retries: usize,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            output_path: PathBuf::from("public/hot.json"),
            max_items: 50,
            items_per_source: 15,
            description_length: 90,
            timeout_secs: 8,
            retries: 0,
            user_agent: concat!("hot_topics/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// The built-in registry.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "新浪新闻",
            "https://rsshub.rssforever.com/sina/news?format=json",
            FeedFormat::Json,
        ),
        SourceConfig::new(
            "百度热搜",
            "https://rsshub.rssforever.com/baidu/tieba/hot?format=json",
            FeedFormat::Json,
        ),
        SourceConfig::new(
            "36Kr 快讯",
            "https://rsshub.rssforever.com/36kr/newsflashes?format=json",
            FeedFormat::Json,
        ),
        SourceConfig::new(
            "知乎热榜",
            "https://rsshub.rssforever.com/zhihu/hot?format=json",
            FeedFormat::Json,
        ),
    ]
}

impl Config {
    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, Box<dyn Error>> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or fall back to the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            info!("No config file given; using built-in sources");
            return Ok(Self::default());
        };

        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
        let config = Self::from_yaml(&yaml)
            .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
        info!(sources = config.sources.len(), "Loaded configuration");
        Ok(config)
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.sources.is_empty() {
            return Err("at least one source is required".into());
        }
        if self.max_items == 0 {
            return Err("max_items must be greater than zero".into());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than zero".into());
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(format!("source with url {} has an empty name", source.url).into());
            }
            if !names.insert(source.name.as_str()) {
                return Err(format!("duplicate source name: {}", source.name).into());
            }
            let url = Url::parse(&source.url)
                .map_err(|e| format!("source {}: invalid url {}: {e}", source.name, source.url))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(format!(
                    "source {}: unsupported scheme {}",
                    source.name,
                    url.scheme()
                )
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.sources.len(), 4);
        assert_eq!(config.max_items, 50);
        assert_eq!(config.items_per_source, 15);
        assert_eq!(config.description_length, 90);
        assert_eq!(config.timeout(), Duration::from_secs(8));
        assert_eq!(config.retries, 0);
        assert_eq!(config.output_path, PathBuf::from("public/hot.json"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("retries: 2\ntimeout_secs: 3\n").unwrap();
        assert_eq!(config.retries, 2);
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.sources, default_sources());
    }

    #[test]
    fn test_yaml_sources() {
        let yaml = r#"
sources:
  - name: HN
    url: https://hnrss.org/frontpage
    format: rss
  - name: Local
    url: http://localhost:1200/zhihu/hot?format=json
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].format, FeedFormat::Rss);
        assert_eq!(config.sources[1].format, FeedFormat::Json);
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_yaml(include_str!("../sources.example.yaml")).unwrap();
        assert_eq!(config.sources.len(), 4);
        assert_eq!(config.sources[2].format, FeedFormat::Rss);
        assert_eq!(config.sources[3].format, FeedFormat::Auto);
    }

    #[test]
    fn test_format_aliases() {
        let yaml = "sources:\n  - {name: A, url: 'https://a.example/feed', format: atom}\n  - {name: B, url: 'https://b.example/feed', format: auto}\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.sources[0].format, FeedFormat::Rss);
        assert_eq!(config.sources[1].format, FeedFormat::Auto);
    }

    #[test]
    fn test_rejects_bad_sources() {
        assert!(Config::from_yaml("sources: []").is_err());
        assert!(Config::from_yaml("sources:\n  - {name: '', url: 'https://a.example'}\n").is_err());
        assert!(Config::from_yaml("sources:\n  - {name: A, url: 'not a url'}\n").is_err());
        assert!(Config::from_yaml("sources:\n  - {name: A, url: 'ftp://a.example/x'}\n").is_err());
        assert!(
            Config::from_yaml(
                "sources:\n  - {name: A, url: 'https://a.example'}\n  - {name: A, url: 'https://b.example'}\n"
            )
            .is_err()
        );
    }

    #[test]
    fn test_rejects_unknown_keys_and_zero_limits() {
        assert!(Config::from_yaml("max_item: 10").is_err());
        assert!(Config::from_yaml("max_items: 0").is_err());
        assert!(Config::from_yaml("timeout_secs: 0").is_err());
    }

    #[tokio::test]
    async fn test_load_without_path_uses_defaults() {
        assert_eq!(Config::load(None).await.unwrap(), Config::default());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hot.yaml");
        std::fs::write(&path, "output_path: out/hot.json\n").unwrap();
        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.output_path, PathBuf::from("out/hot.json"));
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.yaml")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }
}
