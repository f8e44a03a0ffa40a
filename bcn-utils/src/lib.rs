//! Shared utility functions for the rainfall crates.

/// Typed configuration read from a TOML file.
pub mod config {
    use anyhow::{bail, Context};
    use log::debug;
    use serde::Deserialize;
    use std::path::{Path, PathBuf};

    pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
    pub const DEFAULT_KMEANS_CLUSTERS: usize = 4;
    pub const MAX_RAINFALL_PRECISION: u32 = 10;

    /// Where the raw monthly rainfall CSV lives.
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    pub struct DatasetConfig {
        pub file_url: String,
        pub local_file_path: Option<PathBuf>,
    }

    /// How the working tables are built.
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    pub struct DataConfig {
        pub start_year: i32,
        pub rainfall_precision: u32,
        #[serde(default = "default_kmeans_clusters")]
        pub kmeans_clusters: usize,
    }

    fn default_kmeans_clusters() -> usize {
        DEFAULT_KMEANS_CLUSTERS
    }

    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    pub struct Config {
        pub dataset: DatasetConfig,
        pub data: DataConfig,
    }

    impl Config {
        /// Parse and validate a configuration from TOML text.
        pub fn parse(text: &str) -> anyhow::Result<Config> {
            let config: Config = toml::from_str(text).context("failed to parse TOML config")?;
            config.validate()?;
            Ok(config)
        }

        pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            let config = Config::parse(&text)?;
            debug!("loaded config from {}: {:?}", path.display(), config);
            Ok(config)
        }

        pub fn validate(&self) -> anyhow::Result<()> {
            if self.dataset.file_url.trim().is_empty() {
                bail!("dataset.file_url must not be empty");
            }
            if self.data.rainfall_precision > MAX_RAINFALL_PRECISION {
                bail!(
                    "data.rainfall_precision must be at most {}, got {}",
                    MAX_RAINFALL_PRECISION,
                    self.data.rainfall_precision
                );
            }
            if self.data.kmeans_clusters == 0 {
                bail!("data.kmeans_clusters must be at least 1");
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        const SAMPLE: &str = r#"
[dataset]
file_url = "https://example.org/rainfall.csv"
local_file_path = "resources/rainfall.csv"

[data]
start_year = 1971
rainfall_precision = 1
"#;

        #[test]
        fn test_parse_with_defaults() {
            let config = Config::parse(SAMPLE).unwrap();
            assert_eq!(config.data.start_year, 1971);
            assert_eq!(config.data.rainfall_precision, 1);
            assert_eq!(config.data.kmeans_clusters, DEFAULT_KMEANS_CLUSTERS);
            assert_eq!(
                config.dataset.local_file_path,
                Some(PathBuf::from("resources/rainfall.csv"))
            );
        }

        #[test]
        fn test_invalid_precision_is_rejected() {
            let text = SAMPLE.replace("rainfall_precision = 1", "rainfall_precision = 12");
            assert!(Config::parse(&text).is_err());
        }

        #[test]
        fn test_zero_clusters_is_rejected() {
            let text = format!("{SAMPLE}kmeans_clusters = 0\n");
            assert!(Config::parse(&text).is_err());
        }

        #[test]
        fn test_missing_section_is_rejected() {
            assert!(Config::parse("[data]\nstart_year = 1971\nrainfall_precision = 1\n").is_err());
        }

        #[test]
        fn test_load_missing_file() {
            let path = std::env::temp_dir().join("bcn_utils_missing_config.toml");
            assert!(Config::load(path).is_err());
        }
    }
}

/// Year range checks done before querying the aggregators.
pub mod years {
    use anyhow::bail;

    /// Ensure `begin..=end` is ordered and lies within `first..=last`.
    pub fn check_range(begin: i32, end: Option<i32>, first: i32, last: i32) -> anyhow::Result<()> {
        if begin < first || begin > last {
            bail!("begin year {begin} is outside {first}-{last}");
        }
        if let Some(end) = end {
            if end < begin {
                bail!("end year {end} is before begin year {begin}");
            }
            if end > last {
                bail!("end year {end} is after the last year {last}");
            }
        }
        Ok(())
    }

}
