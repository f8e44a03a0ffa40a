//! SVG chart commands.

use crate::metrics::{resolve_normal_year, resolve_years};
use crate::{BarMetric, SliceArgs, YearArgs};
use anyhow::{bail, Context};
use bcn_chart::{
    bar_svg, percentage_of_normal_svg, rainfall_by_year_svg, RainfallChartOptions,
};
use bcn_core::TimeMode;
use bcn_data::AllRainfall;
use log::info;
use std::path::Path;

/// What to draw on the rainfall by year chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartRequest {
    pub average: bool,
    pub linear_regression: bool,
    pub savgol_filter: bool,
    pub percentage_of_normal: bool,
    pub kmeans_clusters: Option<usize>,
    pub normal_year: Option<i32>,
}

fn write_svg(svg: Option<String>, output: &Path) -> anyhow::Result<()> {
    let Some(svg) = svg else {
        bail!("nothing could be plotted for this selection");
    };
    std::fs::write(output, svg)?;
    info!("Chart written to {}", output.display());
    Ok(())
}

fn slice_title(slice: &SliceArgs) -> String {
    match (slice.time_mode, slice.month, slice.season) {
        (TimeMode::Monthly, Some(month), _) => format!("{month} rainfall"),
        (TimeMode::Seasonal, _, Some(season)) => format!("{season} rainfall"),
        _ => "Yearly rainfall".to_string(),
    }
}

/// Annotate the selected slice as requested, then draw the requested years.
pub fn run_chart(
    all_rainfall: &mut AllRainfall,
    slice: &SliceArgs,
    years: &YearArgs,
    request: ChartRequest,
    output: &Path,
) -> anyhow::Result<()> {
    if request.kmeans_clusters.is_some() && !request.percentage_of_normal {
        bail!("k-means clusters are only drawn on the percentage of normal chart");
    }
    let (begin_year, end_year) = resolve_years(all_rainfall, years)?;
    let normal_year = resolve_normal_year(all_rainfall, request.normal_year)?;
    let aggregator = all_rainfall
        .select_mut(&slice.selector())
        .context("no rainfall slice for this selection")?;

    if request.linear_regression && aggregator.add_linear_regression().is_none() {
        bail!("not enough years for a linear regression");
    }
    if request.savgol_filter {
        aggregator.add_savgol_filter()?;
    }
    if request.percentage_of_normal {
        aggregator.add_percentage_of_normal(normal_year, Some(normal_year + 29));
    }
    if let Some(clusters) = request.kmeans_clusters {
        let produced = aggregator.add_kmeans(clusters)?;
        info!("{} clusters computed", produced);
    }

    let table = aggregator.slice(Some(begin_year), Some(end_year));
    let title = format!("{} {}-{}", slice_title(slice), begin_year, end_year);
    let svg = if request.percentage_of_normal {
        percentage_of_normal_svg(&table, &title)
    } else {
        let options = RainfallChartOptions {
            show_average: request.average,
            show_linear_regression: request.linear_regression,
            show_savgol_filter: request.savgol_filter,
        };
        rainfall_by_year_svg(&table, &title, &options)
    };
    write_svg(svg, output)
}

pub fn run_bar_chart(
    all_rainfall: &AllRainfall,
    time_mode: TimeMode,
    metric: BarMetric,
    years: &YearArgs,
    normal_year: Option<i32>,
    output: &Path,
) -> anyhow::Result<()> {
    let (begin_year, end_year) = resolve_years(all_rainfall, years)?;
    let range = format!("{begin_year}-{end_year}");
    let svg = match metric {
        BarMetric::Averages => {
            let data = all_rainfall
                .averages_by_slice(time_mode, begin_year, Some(end_year))
                .context("bar charts need --time-mode monthly or seasonal")?;
            bar_svg(&data, &format!("Average rainfall {range}"), "mm")
        }
        BarMetric::Slopes => {
            let data = all_rainfall
                .linear_regression_slopes(time_mode, begin_year, Some(end_year))
                .context("bar charts need --time-mode monthly or seasonal")?;
            bar_svg(&data, &format!("Linear regression slope {range}"), "mm/year")
        }
        BarMetric::RelativeDistances => {
            let normal_year = resolve_normal_year(all_rainfall, normal_year)?;
            let data = all_rainfall
                .relative_distances_to_normal(time_mode, normal_year, begin_year, Some(end_year))
                .context("bar charts need --time-mode monthly or seasonal")?;
            bar_svg(
                &data,
                &format!("Relative distance to {normal_year} normal {range}"),
                "%",
            )
        }
    };
    write_svg(svg, output)
}
