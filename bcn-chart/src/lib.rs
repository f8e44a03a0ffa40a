//! SVG charts of rainfall working tables.
//!
//! Every renderer returns `Some(svg)` when something was plotted and `None`
//! when the table lacks what the chart needs or drawing failed.

use bcn_core::Label;
use bcn_data::{BarData, WorkingTable};
use log::{debug, warn};
use plotters::prelude::*;

const CHART_SIZE: (u32, u32) = (1000u32, 600u32);
const BAR_HALF_WIDTH: f64 = 0.4;

const CLUSTER_COLORS: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

/// Extra lines drawn over the yearly rainfall bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RainfallChartOptions {
    pub show_average: bool,
    pub show_linear_regression: bool,
    pub show_savgol_filter: bool,
}

fn finish<'a>(result: DrawResult<(), SVGBackend<'a>>, chart: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!("could not draw {chart}: {err:?}");
            false
        }
    }
}

fn y_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min == max {
        return (0.0, 1.0);
    }
    (min * 1.1, max * 1.1)
}

/// Values of a derived column the caller asked to draw.
///
/// `None` when the column was asked for but is missing.
fn overlay(
    table: &WorkingTable,
    label: Label,
    wanted: bool,
    title: &str,
) -> Option<Option<Vec<f64>>> {
    if !wanted {
        return Some(None);
    }
    match table.column(label) {
        Some(values) => Some(Some(values)),
        None => {
            warn!("{title}: {label} column is missing");
            None
        }
    }
}

/// Bars of rainfall per year, optionally with the average, the trend line
/// and the smoothed series.
pub fn rainfall_by_year_svg(
    table: &WorkingTable,
    title: &str,
    options: &RainfallChartOptions,
) -> Option<String> {
    if table.is_empty() {
        debug!("nothing to plot for {title}");
        return None;
    }
    let regression = overlay(
        table,
        Label::LinearRegression,
        options.show_linear_regression,
        title,
    )?;
    let savgol = overlay(
        table,
        Label::SavitzkyGolayFilter,
        options.show_savgol_filter,
        title,
    )?;
    let overlays = Overlays {
        regression: regression.as_deref(),
        savgol: savgol.as_deref(),
    };
    let mut svg = String::new();
    let result = draw_rainfall_by_year(table, title, options, overlays, &mut svg);
    finish(result, title).then_some(svg)
}

#[derive(Clone, Copy)]
struct Overlays<'t> {
    regression: Option<&'t [f64]>,
    savgol: Option<&'t [f64]>,
}

fn draw_rainfall_by_year<'a>(
    table: &WorkingTable,
    title: &str,
    options: &RainfallChartOptions,
    overlays: Overlays<'_>,
    svg: &'a mut String,
) -> DrawResult<(), SVGBackend<'a>> {
    let years: Vec<f64> = table.years().iter().map(|&y| f64::from(y)).collect();
    let rainfall = table.rainfall();
    let x_min = years[0] - 0.5;
    let x_max = years[years.len() - 1] + 0.5;
    let (y_min, y_max) = y_bounds(
        rainfall
            .iter()
            .chain(overlays.regression.unwrap_or_default())
            .chain(overlays.savgol.unwrap_or_default())
            .copied(),
    );

    let root = SVGBackend::with_string(svg, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(20i32)
        .x_label_area_size(40u32)
        .y_label_area_size(60u32)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .x_desc(Label::Year.as_str())
        .y_desc("Rainfall (mm)")
        .x_label_formatter(&|x: &f64| format!("{x:.0}"))
        .draw()?;

    chart.draw_series(years.iter().zip(rainfall).map(|(&year, &value)| {
        Rectangle::new(
            [(year - BAR_HALF_WIDTH, 0.0), (year + BAR_HALF_WIDTH, value)],
            BLUE.mix(0.6).filled(),
        )
    }))?;

    let mut has_legend = false;
    if options.show_average {
        let average = rainfall.iter().sum::<f64>() / rainfall.len() as f64;
        chart
            .draw_series(LineSeries::new(vec![(x_min, average), (x_max, average)], RED))?
            .label(format!("Average ({average:.1} mm)"))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
        has_legend = true;
    }
    if let Some(fitted) = overlays.regression {
        chart
            .draw_series(LineSeries::new(
                years.iter().copied().zip(fitted.iter().copied()),
                GREEN,
            ))?
            .label(Label::LinearRegression.as_str())
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN));
        has_legend = true;
    }
    if let Some(smoothed) = overlays.savgol {
        chart
            .draw_series(LineSeries::new(
                years.iter().copied().zip(smoothed.iter().copied()),
                MAGENTA,
            ))?
            .label(Label::SavitzkyGolayFilter.as_str())
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MAGENTA));
        has_legend = true;
    }
    if has_legend {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    root.present()?;
    Ok(())
}

/// One bar per month or season; missing values leave a gap.
pub fn bar_svg<T>(data: &BarData<T>, title: &str, y_label: &str) -> Option<String>
where
    T: Copy + Into<Option<f64>>,
{
    let values: Vec<Option<f64>> = data.values.iter().map(|&v| v.into()).collect();
    if values.iter().all(Option::is_none) {
        debug!("nothing to plot for {title}");
        return None;
    }
    let mut svg = String::new();
    let result = draw_bars(&data.labels, &values, title, y_label, &mut svg);
    finish(result, title).then_some(svg)
}

fn draw_bars<'a>(
    labels: &[String],
    values: &[Option<f64>],
    title: &str,
    y_label: &str,
    svg: &'a mut String,
) -> DrawResult<(), SVGBackend<'a>> {
    let (y_min, y_max) = y_bounds(values.iter().flatten().copied());
    let x_max = labels.len() as f64 - 0.5;

    let root = SVGBackend::with_string(svg, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(20i32)
        .x_label_area_size(40u32)
        .y_label_area_size(60u32)
        .build_cartesian_2d(-0.5f64..x_max, y_min..y_max)?;
    let label_of = |x: &f64| {
        let index = x.round();
        if (x - index).abs() > 0.01 || index < 0.0 {
            return String::new();
        }
        labels.get(index as usize).cloned().unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&label_of)
        .y_desc(y_label)
        .draw()?;

    chart.draw_series(values.iter().enumerate().filter_map(|(i, value)| {
        let value = (*value)?;
        let x = i as f64;
        let color = if value < 0.0 { RED } else { BLUE };
        Some(Rectangle::new(
            [(x - BAR_HALF_WIDTH, 0.0), (x + BAR_HALF_WIDTH, value)],
            color.mix(0.7).filled(),
        ))
    }))?;
    if y_min < 0.0 {
        chart.draw_series(LineSeries::new(vec![(-0.5, 0.0), (x_max, 0.0)], BLACK))?;
    }
    root.present()?;
    Ok(())
}

/// Percentage of normal per year around a dashed 100% line, coloured by
/// k-means cluster when clustering was run.
pub fn percentage_of_normal_svg(table: &WorkingTable, title: &str) -> Option<String> {
    let Some(percentages) = table.column(Label::PercentageOfNormal) else {
        warn!("{title}: {} column is missing", Label::PercentageOfNormal);
        return None;
    };
    if percentages.is_empty() {
        return None;
    }
    let mut svg = String::new();
    let result = draw_percentage_of_normal(table, &percentages, title, &mut svg);
    finish(result, title).then_some(svg)
}

fn draw_percentage_of_normal<'a>(
    table: &WorkingTable,
    percentages: &[f64],
    title: &str,
    svg: &'a mut String,
) -> DrawResult<(), SVGBackend<'a>> {
    let years: Vec<f64> = table.years().iter().map(|&y| f64::from(y)).collect();
    let x_min = years[0] - 1.0;
    let x_max = years[years.len() - 1] + 1.0;
    let (_, y_max) = y_bounds(percentages.iter().copied().chain([100.0]));

    let root = SVGBackend::with_string(svg, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(20i32)
        .x_label_area_size(40u32)
        .y_label_area_size(60u32)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;
    chart
        .configure_mesh()
        .x_desc(Label::Year.as_str())
        .y_desc(format!("{} (%)", Label::PercentageOfNormal))
        .x_label_formatter(&|x: &f64| format!("{x:.0}"))
        .draw()?;

    let dash = (x_max - x_min) / 80.0;
    chart.draw_series((0..40).map(|i| {
        let start = x_min + 2.0 * dash * f64::from(i);
        PathElement::new(vec![(start, 100.0), (start + dash, 100.0)], BLACK)
    }))?;

    let clusters = table.clusters();
    chart.draw_series(years.iter().zip(percentages).enumerate().map(
        |(row, (&year, &percentage))| {
            let color = clusters
                .map(|labels| CLUSTER_COLORS[labels[row] % CLUSTER_COLORS.len()])
                .unwrap_or(CLUSTER_COLORS[0]);
            Circle::new((year, percentage), 4, color.filled())
        },
    ))?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcn_core::{RawMonthlyTable, YearRow};
    use bcn_data::Aggregator;

    fn yearly() -> Aggregator {
        let rows = (0..20)
            .map(|i| YearRow {
                year: 1990 + i,
                months: [30.0 + (i % 5) as f64; 12],
            })
            .collect();
        Aggregator::yearly(&RawMonthlyTable::new(rows).unwrap(), 1990, 1)
    }

    #[test]
    fn test_rainfall_by_year() {
        let mut agg = yearly();
        let plain = rainfall_by_year_svg(
            agg.data(),
            "Rainfall",
            &RainfallChartOptions::default(),
        );
        assert!(plain.unwrap().contains("<svg"));

        let options = RainfallChartOptions {
            show_average: true,
            show_linear_regression: true,
            ..RainfallChartOptions::default()
        };
        assert!(rainfall_by_year_svg(agg.data(), "Rainfall", &options).is_none());
        agg.add_linear_regression().unwrap();
        assert!(rainfall_by_year_svg(agg.data(), "Rainfall", &options).is_some());
    }

    #[test]
    fn test_rainfall_by_year_with_savgol_filter() {
        let mut agg = yearly();
        let options = RainfallChartOptions {
            show_savgol_filter: true,
            ..RainfallChartOptions::default()
        };
        assert!(rainfall_by_year_svg(agg.data(), "Rainfall", &options).is_none());
        agg.add_savgol_filter().unwrap();
        let svg = rainfall_by_year_svg(agg.data(), "Rainfall", &options).unwrap();
        assert!(svg.contains("Golay"));
    }

    #[test]
    fn test_empty_table_is_not_plotted() {
        let agg = yearly();
        let empty = agg.slice(Some(2050), None);
        let options = RainfallChartOptions::default();
        assert!(rainfall_by_year_svg(&empty, "Empty", &options).is_none());
    }

    #[test]
    fn test_bar_svg() {
        let data = BarData {
            labels: vec!["winter".to_string(), "spring".to_string()],
            values: vec![Some(-1.5), None],
        };
        assert!(bar_svg(&data, "Slopes", "mm/year").is_some());
        let missing = BarData {
            labels: vec!["winter".to_string()],
            values: vec![None::<f64>],
        };
        assert!(bar_svg(&missing, "Slopes", "mm/year").is_none());
    }

    #[test]
    fn test_percentage_of_normal() {
        let mut agg = yearly();
        assert!(percentage_of_normal_svg(agg.data(), "Percentage").is_none());
        agg.add_percentage_of_normal(1990, None);
        agg.add_kmeans(3).unwrap();
        assert!(percentage_of_normal_svg(agg.data(), "Percentage").is_some());
    }
}
