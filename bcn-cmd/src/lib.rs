//! Command implementations for the Barcelona rainfall CLI.
//!
//! Provides subcommands computing rainfall metrics for a slice of the year,
//! exporting working tables as CSV and drawing SVG charts.

use bcn_core::{Month, Season, TimeMode};
use bcn_data::SliceSelector;
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod chart;
pub mod export;
pub mod metrics;
pub mod source;

pub use source::DataSource;

/// Which slice of the year to work on.
#[derive(Args, Debug, Clone)]
pub struct SliceArgs {
    /// yearly, monthly or seasonal
    #[arg(long, default_value = "yearly")]
    pub time_mode: TimeMode,

    /// Month name, required with --time-mode monthly
    #[arg(long)]
    pub month: Option<Month>,

    /// winter, spring, summer or fall, required with --time-mode seasonal
    #[arg(long)]
    pub season: Option<Season>,
}

impl SliceArgs {
    pub fn selector(&self) -> SliceSelector {
        SliceSelector {
            time_mode: self.time_mode,
            month: self.month,
            season: self.season,
        }
    }
}

/// Year range; the begin year defaults to the configured start year and
/// the end year to the last year of data.
#[derive(Args, Debug, Clone)]
pub struct YearArgs {
    #[arg(short = 'b', long)]
    pub begin_year: Option<i32>,

    #[arg(short = 'e', long)]
    pub end_year: Option<i32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarMetric {
    Averages,
    Slopes,
    RelativeDistances,
}

#[derive(Subcommand)]
pub enum Command {
    /// Average rainfall over a range of years
    Average {
        #[command(flatten)]
        slice: SliceArgs,
        #[command(flatten)]
        years: YearArgs,
    },

    /// 30-year rainfall normal starting at a given year
    Normal {
        #[command(flatten)]
        slice: SliceArgs,
        #[arg(short = 'b', long)]
        begin_year: Option<i32>,
    },

    /// Relative distance of a range of years to the normal, in percent
    RelativeDistance {
        #[command(flatten)]
        slice: SliceArgs,
        #[command(flatten)]
        years: YearArgs,
        #[arg(short = 'n', long)]
        normal_year: Option<i32>,
        /// Use (years above - years below) / years instead of the average ratio
        #[arg(long)]
        by_year_count: bool,
    },

    /// Standard deviation of rainfall over a range of years
    StandardDeviation {
        #[command(flatten)]
        slice: SliceArgs,
        #[command(flatten)]
        years: YearArgs,
        /// Divide the deviation by the average rainfall
        #[arg(long)]
        weigh_by_average: bool,
    },

    /// Number of years below the normal
    YearsBelowNormal {
        #[command(flatten)]
        slice: SliceArgs,
        #[command(flatten)]
        years: YearArgs,
        #[arg(short = 'n', long)]
        normal_year: Option<i32>,
    },

    /// Number of years above the normal
    YearsAboveNormal {
        #[command(flatten)]
        slice: SliceArgs,
        #[command(flatten)]
        years: YearArgs,
        #[arg(short = 'n', long)]
        normal_year: Option<i32>,
    },

    /// Years above, below and equal to the normal
    NormalComparison {
        #[command(flatten)]
        slice: SliceArgs,
        #[command(flatten)]
        years: YearArgs,
        #[arg(short = 'n', long)]
        normal_year: Option<i32>,
    },

    /// Export one slice as CSV
    Csv {
        #[command(flatten)]
        slice: SliceArgs,
        #[command(flatten)]
        years: YearArgs,
        /// Write to this file instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Export every slice as CSV files under a folder
    ExportAll {
        #[command(flatten)]
        years: YearArgs,
        #[arg(short = 'f', long, default_value = "csv_data")]
        folder: PathBuf,
    },

    /// Draw rainfall by year as SVG
    Chart {
        #[command(flatten)]
        slice: SliceArgs,
        #[command(flatten)]
        years: YearArgs,
        /// Draw the average as a horizontal line
        #[arg(long)]
        average: bool,
        /// Draw the linear regression line
        #[arg(long)]
        linear_regression: bool,
        /// Draw the Savitzky–Golay smoothed series
        #[arg(long)]
        savgol: bool,
        /// Draw percentage of normal per year instead of rainfall
        #[arg(long)]
        percentage_of_normal: bool,
        /// Colour percentage of normal points by k-means cluster
        #[arg(long, requires = "percentage_of_normal")]
        kmeans: bool,
        #[arg(short = 'n', long)]
        normal_year: Option<i32>,
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Draw one bar per month or season as SVG
    BarChart {
        /// monthly or seasonal
        #[arg(long, default_value = "monthly")]
        time_mode: TimeMode,
        #[arg(long, value_enum, default_value_t = BarMetric::Averages)]
        metric: BarMetric,
        #[command(flatten)]
        years: YearArgs,
        #[arg(short = 'n', long)]
        normal_year: Option<i32>,
        #[arg(short = 'o', long)]
        output: PathBuf,
    },
}

pub async fn run(source: DataSource, command: Command) -> anyhow::Result<()> {
    let (config, mut all_rainfall) = source.load().await?;
    match command {
        Command::Average { slice, years } => metrics::run_average(&all_rainfall, &slice, &years),
        Command::Normal { slice, begin_year } => {
            metrics::run_normal(&all_rainfall, &slice, begin_year)
        }
        Command::RelativeDistance {
            slice,
            years,
            normal_year,
            by_year_count,
        } => metrics::run_relative_distance(
            &all_rainfall,
            &slice,
            &years,
            normal_year,
            by_year_count,
        ),
        Command::StandardDeviation {
            slice,
            years,
            weigh_by_average,
        } => metrics::run_standard_deviation(&all_rainfall, &slice, &years, weigh_by_average),
        Command::YearsBelowNormal {
            slice,
            years,
            normal_year,
        } => metrics::run_years_against_normal(
            &all_rainfall,
            &slice,
            &years,
            normal_year,
            metrics::Side::Below,
        ),
        Command::YearsAboveNormal {
            slice,
            years,
            normal_year,
        } => metrics::run_years_against_normal(
            &all_rainfall,
            &slice,
            &years,
            normal_year,
            metrics::Side::Above,
        ),
        Command::NormalComparison {
            slice,
            years,
            normal_year,
        } => metrics::run_normal_comparison(&all_rainfall, &slice, &years, normal_year),
        Command::Csv {
            slice,
            years,
            output,
        } => export::run_csv(&all_rainfall, &slice, &years, output.as_deref()),
        Command::ExportAll { years, folder } => {
            export::run_export_all(&all_rainfall, &years, &folder)
        }
        Command::Chart {
            slice,
            years,
            average,
            linear_regression,
            savgol,
            percentage_of_normal,
            kmeans,
            normal_year,
            output,
        } => chart::run_chart(
            &mut all_rainfall,
            &slice,
            &years,
            chart::ChartRequest {
                average,
                linear_regression,
                savgol_filter: savgol,
                percentage_of_normal,
                kmeans_clusters: kmeans.then_some(config.data.kmeans_clusters),
                normal_year,
            },
            &output,
        ),
        Command::BarChart {
            time_mode,
            metric,
            years,
            normal_year,
            output,
        } => chart::run_bar_chart(&all_rainfall, time_mode, metric, &years, normal_year, &output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(subcommand)]
        command: Command,
    }

    #[test]
    fn test_kmeans_requires_percentage_of_normal() {
        assert!(Cli::try_parse_from(["bcn", "chart", "--kmeans", "-o", "out.svg"]).is_err());
        assert!(Cli::try_parse_from([
            "bcn",
            "chart",
            "--kmeans",
            "--percentage-of-normal",
            "-o",
            "out.svg"
        ])
        .is_ok());
    }

    #[test]
    fn test_chart_accepts_savgol() {
        let cli = Cli::try_parse_from(["bcn", "chart", "--savgol", "-o", "out.svg"]).unwrap();
        assert!(matches!(cli.command, Command::Chart { savgol: true, .. }));
    }
}
