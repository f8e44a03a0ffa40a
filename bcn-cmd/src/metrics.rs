//! Scalar rainfall metrics printed as JSON.

use crate::{SliceArgs, YearArgs};
use anyhow::{bail, Context};
use bcn_core::{Label, Month, Season, TimeMode};
use bcn_data::{Aggregator, AllRainfall};
use bcn_utils::years::check_range;
use serde::Serialize;

/// A computed metric together with the query that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct RainfallModel<T> {
    pub name: String,
    pub value: T,
    pub begin_year: i32,
    pub end_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_year: Option<i32>,
    pub time_mode: TimeMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<Month>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<Season>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Below,
    Above,
}

/// Validated request shared by every metric command.
pub(crate) struct Query<'a> {
    pub aggregator: &'a Aggregator,
    pub slice: &'a SliceArgs,
    pub begin_year: i32,
    pub end_year: i32,
}

impl<'a> Query<'a> {
    pub(crate) fn model<T>(
        &self,
        name: &str,
        value: T,
        normal_year: Option<i32>,
    ) -> RainfallModel<T> {
        RainfallModel {
            name: name.to_string(),
            value,
            begin_year: self.begin_year,
            end_year: self.end_year,
            normal_year,
            time_mode: self.slice.time_mode,
            month: self.slice.month,
            season: self.slice.season,
        }
    }
}

/// Resolve the slice and check the years against the loaded data.
pub(crate) fn prepare<'a>(
    all_rainfall: &'a AllRainfall,
    slice: &'a SliceArgs,
    years: &YearArgs,
) -> anyhow::Result<Query<'a>> {
    let (begin_year, end_year) = resolve_years(all_rainfall, years)?;
    let aggregator = resolve_slice(all_rainfall, slice)?;
    Ok(Query {
        aggregator,
        slice,
        begin_year,
        end_year,
    })
}

pub(crate) fn resolve_slice<'a>(
    all_rainfall: &'a AllRainfall,
    slice: &SliceArgs,
) -> anyhow::Result<&'a Aggregator> {
    all_rainfall.select(&slice.selector()).with_context(|| {
        format!(
            "no rainfall slice for time mode {} (month: {:?}, season: {:?})",
            slice.time_mode, slice.month, slice.season
        )
    })
}

pub(crate) fn resolve_years(
    all_rainfall: &AllRainfall,
    years: &YearArgs,
) -> anyhow::Result<(i32, i32)> {
    let first = all_rainfall.starting_year();
    let Some(last) = all_rainfall.last_year() else {
        bail!("no rainfall data loaded");
    };
    let begin_year = years.begin_year.unwrap_or(first);
    check_range(begin_year, years.end_year, first, last)?;
    Ok((begin_year, years.end_year.unwrap_or(last)))
}

pub(crate) fn resolve_normal_year(
    all_rainfall: &AllRainfall,
    normal_year: Option<i32>,
) -> anyhow::Result<i32> {
    let first = all_rainfall.starting_year();
    let normal_year = normal_year.unwrap_or(first);
    match all_rainfall.max_normal_year() {
        Some(max) if (first..=max).contains(&normal_year) => Ok(normal_year),
        Some(max) => bail!("normal year {normal_year} is outside {first}-{max}"),
        None => bail!("no rainfall data loaded"),
    }
}

fn print<T: Serialize>(model: &RainfallModel<T>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(model)?);
    Ok(())
}

pub fn run_average(
    all_rainfall: &AllRainfall,
    slice: &SliceArgs,
    years: &YearArgs,
) -> anyhow::Result<()> {
    let query = prepare(all_rainfall, slice, years)?;
    let value = query
        .aggregator
        .average(query.begin_year, Some(query.end_year));
    print(&query.model("rainfall average (mm)", value, None))
}

pub fn run_normal(
    all_rainfall: &AllRainfall,
    slice: &SliceArgs,
    begin_year: Option<i32>,
) -> anyhow::Result<()> {
    let begin_year = resolve_normal_year(all_rainfall, begin_year)?;
    let aggregator = resolve_slice(all_rainfall, slice)?;
    let query = Query {
        aggregator,
        slice,
        begin_year,
        end_year: begin_year + 29,
    };
    print(&query.model("rainfall normal (mm)", aggregator.normal(begin_year), None))
}

pub fn run_relative_distance(
    all_rainfall: &AllRainfall,
    slice: &SliceArgs,
    years: &YearArgs,
    normal_year: Option<i32>,
    by_year_count: bool,
) -> anyhow::Result<()> {
    let normal_year = resolve_normal_year(all_rainfall, normal_year)?;
    let query = prepare(all_rainfall, slice, years)?;
    let (name, value) = if by_year_count {
        (
            "relative distance to normal by year count (%)",
            query.aggregator.relative_distance_by_year_count(
                normal_year,
                query.begin_year,
                Some(query.end_year),
            ),
        )
    } else {
        (
            "relative distance to normal (%)",
            query.aggregator.relative_distance_to_normal(
                normal_year,
                query.begin_year,
                Some(query.end_year),
            ),
        )
    };
    print(&query.model(name, value, Some(normal_year)))
}

pub fn run_standard_deviation(
    all_rainfall: &AllRainfall,
    slice: &SliceArgs,
    years: &YearArgs,
    weigh_by_average: bool,
) -> anyhow::Result<()> {
    let query = prepare(all_rainfall, slice, years)?;
    let value = query.aggregator.standard_deviation(
        query.begin_year,
        Some(query.end_year),
        Label::Rainfall,
        weigh_by_average,
    );
    let name = if weigh_by_average {
        "rainfall standard deviation weighted by average"
    } else {
        "rainfall standard deviation (mm)"
    };
    print(&query.model(name, value, None))
}

pub fn run_years_against_normal(
    all_rainfall: &AllRainfall,
    slice: &SliceArgs,
    years: &YearArgs,
    normal_year: Option<i32>,
    side: Side,
) -> anyhow::Result<()> {
    let normal_year = resolve_normal_year(all_rainfall, normal_year)?;
    let query = prepare(all_rainfall, slice, years)?;
    let aggregator = query.aggregator;
    let (name, value) = match side {
        Side::Below => (
            "years below rainfall normal",
            aggregator.years_below_normal(normal_year, query.begin_year, Some(query.end_year)),
        ),
        Side::Above => (
            "years above rainfall normal",
            aggregator.years_above_normal(normal_year, query.begin_year, Some(query.end_year)),
        ),
    };
    print(&query.model(name, value, Some(normal_year)))
}

pub fn run_normal_comparison(
    all_rainfall: &AllRainfall,
    slice: &SliceArgs,
    years: &YearArgs,
    normal_year: Option<i32>,
) -> anyhow::Result<()> {
    let normal_year = resolve_normal_year(all_rainfall, normal_year)?;
    let query = prepare(all_rainfall, slice, years)?;
    let value = all_rainfall
        .normal_comparison(
            &slice.selector(),
            normal_year,
            query.begin_year,
            Some(query.end_year),
        )
        .context("no rainfall slice for this selection")?;
    print(&query.model("years compared with rainfall normal", value, Some(normal_year)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcn_core::{RawMonthlyTable, YearRow};

    fn all_rainfall() -> AllRainfall {
        let rows = (0..50)
            .map(|i| YearRow {
                year: 1960 + i,
                months: [10.0 + (i % 3) as f64; 12],
            })
            .collect();
        AllRainfall::new(RawMonthlyTable::new(rows).unwrap(), 1971, 1)
    }

    fn yearly() -> SliceArgs {
        SliceArgs {
            time_mode: TimeMode::Yearly,
            month: None,
            season: None,
        }
    }

    fn years(begin_year: Option<i32>, end_year: Option<i32>) -> YearArgs {
        YearArgs {
            begin_year,
            end_year,
        }
    }

    #[test]
    fn test_years_default_to_data_bounds() {
        let all = all_rainfall();
        assert_eq!(resolve_years(&all, &years(None, None)).unwrap(), (1971, 2009));
        assert!(resolve_years(&all, &years(Some(1960), None)).is_err());
        assert!(resolve_years(&all, &years(Some(2000), Some(1990))).is_err());
    }

    #[test]
    fn test_normal_year_bounds() {
        let all = all_rainfall();
        assert_eq!(resolve_normal_year(&all, None).unwrap(), 1971);
        assert_eq!(resolve_normal_year(&all, Some(1980)).unwrap(), 1980);
        assert!(resolve_normal_year(&all, Some(1981)).is_err());
    }

    #[test]
    fn test_unresolvable_slice_fails() {
        let all = all_rainfall();
        let slice = SliceArgs {
            time_mode: TimeMode::Seasonal,
            month: Some(Month::May),
            season: None,
        };
        assert!(prepare(&all, &slice, &years(None, None)).is_err());
        assert!(run_average(&all, &slice, &years(None, None)).is_err());
    }

    #[test]
    fn test_model_serialization() {
        let all = all_rainfall();
        let slice = yearly();
        let query = prepare(&all, &slice, &years(Some(1980), Some(1989))).unwrap();
        let model = query.model("rainfall average (mm)", 132.0, None);
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["begin_year"], 1980);
        assert_eq!(json["end_year"], 1989);
        assert_eq!(json["time_mode"], "yearly");
        assert!(json.get("month").is_none());
        assert!(json.get("normal_year").is_none());
    }
}
