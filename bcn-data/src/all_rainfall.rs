//! Facade over the yearly, monthly and seasonal aggregators.

use crate::aggregator::{Aggregator, NORMAL_SPAN};
use bcn_core::{Label, Month, RawMonthlyTable, Result, Season, TimeMode};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A slice of the year as requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SliceSelector {
    pub time_mode: TimeMode,
    pub month: Option<Month>,
    pub season: Option<Season>,
}

impl SliceSelector {
    pub fn yearly() -> Self {
        SliceSelector {
            time_mode: TimeMode::Yearly,
            month: None,
            season: None,
        }
    }

    pub fn month(month: Month) -> Self {
        SliceSelector {
            time_mode: TimeMode::Monthly,
            month: Some(month),
            season: None,
        }
    }

    pub fn season(season: Season) -> Self {
        SliceSelector {
            time_mode: TimeMode::Seasonal,
            month: None,
            season: Some(season),
        }
    }
}

/// Parallel label/value arrays for one bar per month or season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarData<T> {
    pub labels: Vec<String>,
    pub values: Vec<T>,
}

/// Years of a range compared with a normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalComparison {
    pub above: usize,
    pub below: usize,
    pub equal: usize,
    pub total: usize,
}

/// Owns the raw table and the 17 aggregators built from it: one for the
/// whole year, one per month in calendar order, one per season starting
/// with winter.
#[derive(Debug, Clone)]
pub struct AllRainfall {
    raw: RawMonthlyTable,
    starting_year: i32,
    round_precision: u32,
    yearly: Aggregator,
    monthly: Vec<(Month, Aggregator)>,
    seasonal: Vec<(Season, Aggregator)>,
}

impl AllRainfall {
    pub fn new(raw: RawMonthlyTable, starting_year: i32, round_precision: u32) -> Self {
        let yearly = Aggregator::yearly(&raw, starting_year, round_precision);
        let monthly = Month::ALL
            .iter()
            .map(|&month| {
                (
                    month,
                    Aggregator::monthly(&raw, starting_year, round_precision, month),
                )
            })
            .collect();
        let seasonal = Season::ALL
            .iter()
            .map(|&season| {
                (
                    season,
                    Aggregator::seasonal(&raw, starting_year, round_precision, season),
                )
            })
            .collect();
        info!(
            "built yearly, 12 monthly and 4 seasonal aggregators from {} (precision {})",
            starting_year, round_precision
        );
        AllRainfall {
            raw,
            starting_year,
            round_precision,
            yearly,
            monthly,
            seasonal,
        }
    }

    pub fn raw(&self) -> &RawMonthlyTable {
        &self.raw
    }

    pub fn starting_year(&self) -> i32 {
        self.starting_year
    }

    pub fn round_precision(&self) -> u32 {
        self.round_precision
    }

    /// Last year shared by every slice.
    pub fn last_year(&self) -> Option<i32> {
        self.yearly.last_year()
    }

    /// Latest year a full 30-year normal can start from.
    pub fn max_normal_year(&self) -> Option<i32> {
        self.last_year().map(|last| last.saturating_sub(NORMAL_SPAN - 1))
    }

    pub fn yearly(&self) -> &Aggregator {
        &self.yearly
    }

    pub fn monthly(&self) -> impl Iterator<Item = (Month, &Aggregator)> {
        self.monthly.iter().map(|(month, agg)| (*month, agg))
    }

    pub fn seasonal(&self) -> impl Iterator<Item = (Season, &Aggregator)> {
        self.seasonal.iter().map(|(season, agg)| (*season, agg))
    }

    /// The aggregator for a slice, `None` when the month or season the mode
    /// needs is missing.
    pub fn resolve(
        &self,
        time_mode: TimeMode,
        month: Option<Month>,
        season: Option<Season>,
    ) -> Option<&Aggregator> {
        match time_mode {
            TimeMode::Yearly => Some(&self.yearly),
            TimeMode::Monthly => {
                let month = month?;
                self.monthly
                    .iter()
                    .find(|(m, _)| *m == month)
                    .map(|(_, agg)| agg)
            }
            TimeMode::Seasonal => {
                let season = season?;
                self.seasonal
                    .iter()
                    .find(|(s, _)| *s == season)
                    .map(|(_, agg)| agg)
            }
        }
    }

    pub fn resolve_mut(
        &mut self,
        time_mode: TimeMode,
        month: Option<Month>,
        season: Option<Season>,
    ) -> Option<&mut Aggregator> {
        match time_mode {
            TimeMode::Yearly => Some(&mut self.yearly),
            TimeMode::Monthly => {
                let month = month?;
                self.monthly
                    .iter_mut()
                    .find(|(m, _)| *m == month)
                    .map(|(_, agg)| agg)
            }
            TimeMode::Seasonal => {
                let season = season?;
                self.seasonal
                    .iter_mut()
                    .find(|(s, _)| *s == season)
                    .map(|(_, agg)| agg)
            }
        }
    }

    /// Resolve from untyped names; any unrecognized name resolves to `None`.
    pub fn resolve_by_name(
        &self,
        time_mode: &str,
        month: Option<&str>,
        season: Option<&str>,
    ) -> Option<&Aggregator> {
        let time_mode = time_mode.parse::<TimeMode>().ok()?;
        let month = match month {
            Some(name) => Some(name.parse::<Month>().ok()?),
            None => None,
        };
        let season = match season {
            Some(name) => Some(name.parse::<Season>().ok()?),
            None => None,
        };
        self.resolve(time_mode, month, season)
    }

    pub fn select(&self, selector: &SliceSelector) -> Option<&Aggregator> {
        self.resolve(selector.time_mode, selector.month, selector.season)
    }

    pub fn select_mut(&mut self, selector: &SliceSelector) -> Option<&mut Aggregator> {
        self.resolve_mut(selector.time_mode, selector.month, selector.season)
    }

    pub fn average(
        &self,
        selector: &SliceSelector,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<f64> {
        self.select(selector)
            .map(|agg| agg.average(begin_year, end_year))
    }

    pub fn normal(&self, selector: &SliceSelector, begin_year: i32) -> Option<f64> {
        self.select(selector).map(|agg| agg.normal(begin_year))
    }

    pub fn relative_distance_to_normal(
        &self,
        selector: &SliceSelector,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<f64> {
        self.select(selector)?
            .relative_distance_to_normal(normal_year, begin_year, end_year)
    }

    pub fn relative_distance_by_year_count(
        &self,
        selector: &SliceSelector,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<f64> {
        self.select(selector)?
            .relative_distance_by_year_count(normal_year, begin_year, end_year)
    }

    pub fn standard_deviation(
        &self,
        selector: &SliceSelector,
        begin_year: i32,
        end_year: Option<i32>,
        label: Label,
        weigh_by_average: bool,
    ) -> Option<f64> {
        self.select(selector)?
            .standard_deviation(begin_year, end_year, label, weigh_by_average)
    }

    pub fn years_below_normal(
        &self,
        selector: &SliceSelector,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<usize> {
        self.select(selector)
            .map(|agg| agg.years_below_normal(normal_year, begin_year, end_year))
    }

    pub fn years_above_normal(
        &self,
        selector: &SliceSelector,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<usize> {
        self.select(selector)
            .map(|agg| agg.years_above_normal(normal_year, begin_year, end_year))
    }

    pub fn normal_comparison(
        &self,
        selector: &SliceSelector,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<NormalComparison> {
        let agg = self.select(selector)?;
        let below = agg.years_below_normal(normal_year, begin_year, end_year);
        let above = agg.years_above_normal(normal_year, begin_year, end_year);
        let total = agg.slice(Some(begin_year), end_year).len();
        Some(NormalComparison {
            above,
            below,
            equal: total - above - below,
            total,
        })
    }

    /// CSV of one slice; `Ok(None)` when the slice cannot be resolved.
    pub fn export_csv(
        &self,
        selector: &SliceSelector,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Result<Option<String>> {
        self.select(selector)
            .map(|agg| agg.export_csv(Some(begin_year), end_year))
            .transpose()
    }

    /// Write every slice for the years given under `folder`.
    pub fn export_all_to_csv(
        &self,
        begin_year: i32,
        end_year: i32,
        folder: &Path,
    ) -> Result<PathBuf> {
        let months_dir = folder.join("months");
        let seasons_dir = folder.join("seasons");
        fs::create_dir_all(&months_dir)?;
        fs::create_dir_all(&seasons_dir)?;

        let prefix = format!("{begin_year}_{end_year}");
        fs::write(
            folder.join(format!("{prefix}_rainfall.csv")),
            self.yearly.export_csv(Some(begin_year), Some(end_year))?,
        )?;
        for (month, agg) in self.monthly() {
            let name = format!("{prefix}_{}_rainfall.csv", month.name().to_lowercase());
            fs::write(
                months_dir.join(name),
                agg.export_csv(Some(begin_year), Some(end_year))?,
            )?;
        }
        for (season, agg) in self.seasonal() {
            let name = format!("{prefix}_{}_rainfall.csv", season.name());
            fs::write(
                seasons_dir.join(name),
                agg.export_csv(Some(begin_year), Some(end_year))?,
            )?;
        }
        info!("exported 17 CSV files to {}", folder.display());
        Ok(folder.to_path_buf())
    }

    fn slices_of(&self, time_mode: TimeMode) -> Option<Vec<(String, &Aggregator)>> {
        match time_mode {
            TimeMode::Yearly => None,
            TimeMode::Monthly => Some(
                self.monthly()
                    .map(|(month, agg)| (month.name().to_string(), agg))
                    .collect(),
            ),
            TimeMode::Seasonal => Some(
                self.seasonal()
                    .map(|(season, agg)| (season.title().to_string(), agg))
                    .collect(),
            ),
        }
    }

    fn bar_data<T>(
        &self,
        time_mode: TimeMode,
        value: impl Fn(&Aggregator) -> T,
    ) -> Option<BarData<T>> {
        let (labels, values): (Vec<String>, Vec<T>) = self
            .slices_of(time_mode)?
            .into_iter()
            .map(|(label, agg)| (label, value(agg)))
            .unzip();
        Some(BarData { labels, values })
    }

    /// Average of every month or season; `None` for the yearly mode.
    pub fn averages_by_slice(
        &self,
        time_mode: TimeMode,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<BarData<f64>> {
        self.bar_data(time_mode, |agg| agg.average(begin_year, end_year))
    }

    /// Trend slope of every month or season, leaving the aggregators untouched.
    pub fn linear_regression_slopes(
        &self,
        time_mode: TimeMode,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<BarData<Option<f64>>> {
        self.bar_data(time_mode, |agg| {
            agg.linear_regression(begin_year, end_year)
                .map(|(_, slope)| slope)
        })
    }

    pub fn relative_distances_to_normal(
        &self,
        time_mode: TimeMode,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<BarData<Option<f64>>> {
        self.bar_data(time_mode, |agg| {
            agg.relative_distance_to_normal(normal_year, begin_year, end_year)
        })
    }
}
