//! Loading the configuration and the rainfall dataset.

use anyhow::{bail, Context};
use bcn_core::RawMonthlyTable;
use bcn_data::AllRainfall;
use bcn_utils::config::{Config, DEFAULT_CONFIG_PATH};
use clap::Args;
use log::info;
use std::path::PathBuf;

/// Where to read configuration and data from.
#[derive(Args, Debug, Clone)]
pub struct DataSource {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Read the dataset from the configured local file instead of the URL
    #[arg(long, global = true)]
    pub from_file: bool,
}

impl DataSource {
    /// Load the configuration, then the raw table, then build every aggregator.
    pub async fn load(&self) -> anyhow::Result<(Config, AllRainfall)> {
        let config = Config::load(&self.config)?;
        let raw = self.load_raw(&config).await?;
        let all_rainfall = AllRainfall::new(
            raw,
            config.data.start_year,
            config.data.rainfall_precision,
        );
        if all_rainfall.last_year().is_none() {
            bail!(
                "no rainfall data from {} onwards",
                config.data.start_year
            );
        }
        Ok((config, all_rainfall))
    }

    async fn load_raw(&self, config: &Config) -> anyhow::Result<RawMonthlyTable> {
        if self.from_file {
            let Some(path) = config.dataset.local_file_path.as_ref() else {
                bail!("--from-file needs dataset.local_file_path in the configuration");
            };
            info!("Loading rainfall from {}", path.display());
            return RawMonthlyTable::from_path(path)
                .with_context(|| format!("failed to load {}", path.display()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        info!("Downloading rainfall from {}", config.dataset.file_url);
        RawMonthlyTable::fetch(&client, &config.dataset.file_url)
            .await
            .with_context(|| format!("failed to download {}", config.dataset.file_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"Year,Jan_rain,Feb_rain,Mar_rain,Apr_rain,May_rain,Jun_rain,Jul_rain,Aug_rain,Sep_rain,Oct_rain,Nov_rain,Dec_rain
1970,10.0,20.0,30.0,40.0,50.0,60.0,70.0,80.0,90.0,100.0,110.0,120.0
1971,11.0,21.0,31.0,41.0,51.0,61.0,71.0,81.0,91.0,101.0,111.0,121.0
1972,12.0,22.0,32.0,42.0,52.0,62.0,72.0,82.0,92.0,102.0,112.0,122.0
"#;

    fn write_fixture(name: &str, with_local_path: bool) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let data_path = dir.join("rainfall.csv");
        std::fs::write(&data_path, RAW).unwrap();
        let local = if with_local_path {
            format!("local_file_path = {:?}\n", data_path.display().to_string())
        } else {
            String::new()
        };
        let config = format!(
            "[dataset]\nfile_url = \"https://example.org/rainfall.csv\"\n{local}\n[data]\nstart_year = 1971\nrainfall_precision = 1\n"
        );
        let config_path = dir.join("config.toml");
        std::fs::write(&config_path, config).unwrap();
        config_path
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let config = write_fixture("bcn_cmd_source_ok", true);
        let source = DataSource {
            config,
            from_file: true,
        };
        let (config, all_rainfall) = source.load().await.unwrap();
        assert_eq!(config.data.start_year, 1971);
        assert_eq!(all_rainfall.starting_year(), 1971);
        assert_eq!(all_rainfall.last_year(), Some(1972));
        assert_eq!(all_rainfall.yearly().data().rainfall(), &[792.0, 804.0]);
    }

    #[tokio::test]
    async fn test_from_file_needs_local_path() {
        let config = write_fixture("bcn_cmd_source_no_local", false);
        let source = DataSource {
            config,
            from_file: true,
        };
        assert!(source.load().await.is_err());
    }
}
