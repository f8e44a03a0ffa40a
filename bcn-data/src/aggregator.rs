//! Per-slice rainfall aggregation.
//!
//! An [`Aggregator`] owns the working table of one slice of the year (the
//! whole year, a month or a season) and answers every metric about it.

use crate::kmeans::{self, DEFAULT_SEED};
use crate::regression::{r_squared, savgol_full_window, LinearFit};
use crate::stats::{mean, round_to, sample_std};
use crate::working_table::{ColumnValues, WorkingTable};
use bcn_core::{Label, Month, RainfallError, RawMonthlyTable, Result, Season, TimeMode, YearRow};
use log::{debug, info};
use serde::Serialize;

/// Length of the window a normal is computed over.
pub const NORMAL_SPAN: i32 = 30;

/// Inclusive range of months summed into one value per year.
///
/// `end == None` selects `start` alone. An `end` earlier than `start` wraps
/// around the calendar while staying in the same row, so December of year Y
/// is added to January and February of year Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthSpan {
    pub start: Month,
    pub end: Option<Month>,
}

impl MonthSpan {
    pub fn yearly() -> Self {
        MonthSpan {
            start: Month::January,
            end: Some(Month::December),
        }
    }

    pub fn monthly(month: Month) -> Self {
        MonthSpan {
            start: month,
            end: None,
        }
    }

    pub fn seasonal(season: Season) -> Self {
        let months = season.months();
        MonthSpan {
            start: months[0],
            end: Some(months[2]),
        }
    }

    pub fn aggregate(&self, row: &YearRow) -> f64 {
        let start = self.start.rank();
        match self.end.map(Month::rank) {
            None => row.value(self.start),
            Some(end) if end >= start => row.months[start - 1..end].iter().sum(),
            Some(end) => row.value(self.start) + row.months[..end].iter().sum::<f64>(),
        }
    }
}

/// Which slice of the year an aggregator covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SliceTag {
    Year,
    Month(Month),
    Season(Season),
}

impl SliceTag {
    pub fn span(self) -> MonthSpan {
        match self {
            SliceTag::Year => MonthSpan::yearly(),
            SliceTag::Month(month) => MonthSpan::monthly(month),
            SliceTag::Season(season) => MonthSpan::seasonal(season),
        }
    }

    pub fn time_mode(self) -> TimeMode {
        match self {
            SliceTag::Year => TimeMode::Yearly,
            SliceTag::Month(_) => TimeMode::Monthly,
            SliceTag::Season(_) => TimeMode::Seasonal,
        }
    }

    pub fn name(self) -> String {
        match self {
            SliceTag::Year => "year".to_string(),
            SliceTag::Month(month) => month.name().to_lowercase(),
            SliceTag::Season(season) => season.name().to_string(),
        }
    }
}

/// Rainfall of one slice per year, with metrics and annotations.
#[derive(Debug, Clone)]
pub struct Aggregator {
    tag: SliceTag,
    starting_year: i32,
    round_precision: u32,
    data: WorkingTable,
}

impl Aggregator {
    pub fn yearly(raw: &RawMonthlyTable, starting_year: i32, round_precision: u32) -> Self {
        Self::new(raw, starting_year, round_precision, SliceTag::Year)
    }

    pub fn monthly(
        raw: &RawMonthlyTable,
        starting_year: i32,
        round_precision: u32,
        month: Month,
    ) -> Self {
        Self::new(raw, starting_year, round_precision, SliceTag::Month(month))
    }

    pub fn seasonal(
        raw: &RawMonthlyTable,
        starting_year: i32,
        round_precision: u32,
        season: Season,
    ) -> Self {
        Self::new(raw, starting_year, round_precision, SliceTag::Season(season))
    }

    /// Build the working table once from the raw table.
    ///
    /// The raw table guarantees the year plus twelve months per row, so
    /// construction itself cannot fail.
    pub fn new(
        raw: &RawMonthlyTable,
        starting_year: i32,
        round_precision: u32,
        tag: SliceTag,
    ) -> Self {
        let span = tag.span();
        let (years, rainfall): (Vec<i32>, Vec<f64>) = raw
            .rows()
            .iter()
            .filter(|row| row.year >= starting_year)
            .map(|row| (row.year, round_to(span.aggregate(row), round_precision)))
            .unzip();
        debug!(
            "built {} aggregator with {} years from {}",
            tag.name(),
            years.len(),
            starting_year
        );
        Aggregator {
            tag,
            starting_year,
            round_precision,
            data: WorkingTable::new(years, rainfall),
        }
    }

    pub fn tag(&self) -> SliceTag {
        self.tag
    }

    pub fn starting_year(&self) -> i32 {
        self.starting_year
    }

    pub fn round_precision(&self) -> u32 {
        self.round_precision
    }

    pub fn data(&self) -> &WorkingTable {
        &self.data
    }

    pub fn last_year(&self) -> Option<i32> {
        self.data.years().iter().max().copied()
    }

    fn round(&self, value: f64) -> f64 {
        round_to(value, self.round_precision)
    }

    pub fn slice(&self, begin_year: Option<i32>, end_year: Option<i32>) -> WorkingTable {
        self.data.slice(begin_year, end_year)
    }

    /// Mean rainfall over the years, `0.0` when no year matches.
    pub fn average(&self, begin_year: i32, end_year: Option<i32>) -> f64 {
        let slice = self.slice(Some(begin_year), end_year);
        mean(slice.rainfall()).map_or(0.0, |value| self.round(value))
    }

    /// Average over the 30 years starting at `begin_year`.
    pub fn normal(&self, begin_year: i32) -> f64 {
        self.average(begin_year, Some(begin_year.saturating_add(NORMAL_SPAN - 1)))
    }

    /// Sample standard deviation of a column, `None` when the column is absent
    /// or holds fewer than two values.
    pub fn standard_deviation(
        &self,
        begin_year: i32,
        end_year: Option<i32>,
        label: Label,
        weigh_by_average: bool,
    ) -> Option<f64> {
        let values = self.slice(Some(begin_year), end_year).column(label)?;
        let mut deviation = sample_std(&values)?;
        if weigh_by_average {
            let average = mean(&values)?;
            if average == 0.0 {
                return None;
            }
            deviation /= average;
        }
        Some(self.round(deviation))
    }

    fn resolved_gap(&self, begin_year: i32, end_year: Option<i32>) -> Option<(i32, i32)> {
        let end_year = end_year.or_else(|| self.last_year())?;
        let gap = end_year.checked_sub(begin_year)?.checked_add(1)?;
        (gap > 0).then_some((end_year, gap))
    }

    /// `(average - normal) / normal * 100` for the years given.
    ///
    /// `None` when the range is empty or the normal is zero.
    pub fn relative_distance_to_normal(
        &self,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<f64> {
        let (end_year, _) = self.resolved_gap(begin_year, end_year)?;
        let normal = self.normal(normal_year);
        if normal == 0.0 {
            return None;
        }
        let average = self.average(begin_year, Some(end_year));
        Some(self.round((average - normal) / normal * 100.0))
    }

    /// `(years above - years below) / years in range * 100`, bounded to [-100, 100].
    pub fn relative_distance_by_year_count(
        &self,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> Option<f64> {
        let (end_year, gap) = self.resolved_gap(begin_year, end_year)?;
        let above = self.years_above_normal(normal_year, begin_year, Some(end_year)) as f64;
        let below = self.years_below_normal(normal_year, begin_year, Some(end_year)) as f64;
        Some(self.round((above - below) / f64::from(gap) * 100.0))
    }

    fn count_against_normal(
        &self,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
        keep: impl Fn(f64, f64) -> bool,
    ) -> usize {
        let normal = self.normal(normal_year);
        self.slice(Some(begin_year), end_year)
            .rainfall()
            .iter()
            .filter(|&&value| keep(value, normal))
            .count()
    }

    pub fn years_below_normal(
        &self,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> usize {
        self.count_against_normal(normal_year, begin_year, end_year, |value, normal| {
            value < normal
        })
    }

    pub fn years_above_normal(
        &self,
        normal_year: i32,
        begin_year: i32,
        end_year: Option<i32>,
    ) -> usize {
        self.count_against_normal(normal_year, begin_year, end_year, |value, normal| {
            value > normal
        })
    }

    /// `(r_squared, slope)` of rainfall against year, without touching the table.
    ///
    /// `end_year` defaults to the last year; `None` with fewer than two years.
    pub fn linear_regression(&self, begin_year: i32, end_year: Option<i32>) -> Option<(f64, f64)> {
        let end_year = end_year.or_else(|| self.last_year())?;
        let slice = self.slice(Some(begin_year), Some(end_year));
        self.fit_trend(&slice).map(|(r2, slope, _)| (r2, slope))
    }

    fn fit_trend(&self, table: &WorkingTable) -> Option<(f64, f64, Vec<f64>)> {
        let years: Vec<f64> = table.years().iter().map(|&y| f64::from(y)).collect();
        let fit = LinearFit::fit(&years, table.rainfall())?;
        let predicted: Vec<f64> = years.iter().map(|&y| self.round(fit.predict(y))).collect();
        let r2 = r_squared(table.rainfall(), &predicted);
        Some((r2, self.round(fit.slope), predicted))
    }

    pub fn export_csv(&self, begin_year: Option<i32>, end_year: Option<i32>) -> Result<String> {
        self.slice(begin_year, end_year).to_csv()
    }

    /// Highest cluster label plus one, `0` before clustering.
    pub fn clusters_number(&self) -> usize {
        self.data
            .clusters()
            .and_then(|labels| labels.iter().max())
            .map_or(0, |max| max + 1)
    }

    /// Add rainfall as a percentage of the average over the years given.
    ///
    /// Returns `false` and leaves the table alone when that average is zero.
    pub fn add_percentage_of_normal(&mut self, begin_year: i32, end_year: Option<i32>) -> bool {
        let normal = self.average(begin_year, end_year);
        if normal == 0.0 {
            return false;
        }
        let values = self
            .data
            .rainfall()
            .iter()
            .map(|value| self.round(value / normal * 100.0))
            .collect();
        self.data
            .set_column(Label::PercentageOfNormal, ColumnValues::Float(values));
        true
    }

    /// Fit rainfall against year over the whole table and store the fitted values.
    pub fn add_linear_regression(&mut self) -> Option<(f64, f64)> {
        let (r2, slope, predicted) = self.fit_trend(&self.data)?;
        self.data
            .set_column(Label::LinearRegression, ColumnValues::Float(predicted));
        info!("{} linear regression: r2 {:.3}, slope {}", self.tag.name(), r2, slope);
        Some((r2, slope))
    }

    /// Smooth rainfall with a Savitzky–Golay filter spanning the whole series.
    ///
    /// The polynomial order is a tenth of the series length, so at least ten
    /// years are required.
    pub fn add_savgol_filter(&mut self) -> Result<()> {
        let found = self.data.len();
        let polyorder = found / 10;
        if polyorder < 1 {
            return Err(RainfallError::SeriesTooShort { needed: 10, found });
        }
        let values = savgol_full_window(self.data.rainfall(), polyorder)
            .into_iter()
            .map(|value| self.round(value))
            .collect();
        self.data
            .set_column(Label::SavitzkyGolayFilter, ColumnValues::Float(values));
        Ok(())
    }

    /// Cluster (year, rainfall) pairs and store the label of every year.
    pub fn add_kmeans(&mut self, n_clusters: usize) -> Result<usize> {
        let points: Vec<kmeans::Point> = self
            .data
            .years()
            .iter()
            .zip(self.data.rainfall())
            .map(|(&year, &rainfall)| [f64::from(year), rainfall])
            .collect();
        let clustering = kmeans::kmeans(&points, n_clusters, DEFAULT_SEED)?;
        self.data
            .set_column(Label::Kmeans, ColumnValues::Cluster(clustering.labels));
        info!(
            "{} k-means: {} clusters, inertia {:.1}",
            self.tag.name(),
            n_clusters,
            clustering.inertia
        );
        Ok(n_clusters)
    }

    pub fn remove_column(&mut self, label: Label) -> bool {
        self.data.remove_column(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(year: i32, months: [f64; 12]) -> YearRow {
        YearRow { year, months }
    }

    /// Five years where May is 10, 20, 30, 40, 51 and every other month is 1 + year offset.
    fn five_years() -> RawMonthlyTable {
        let rows = (0..5)
            .map(|i| {
                let mut months = [1.0 + i as f64; 12];
                months[4] = [10.0, 20.0, 30.0, 40.0, 51.0][i];
                row(2000 + i as i32, months)
            })
            .collect();
        RawMonthlyTable::new(rows).unwrap()
    }

    /// Sixty years of yearly totals following a gentle wave.
    fn sixty_years() -> RawMonthlyTable {
        let rows = (0..60)
            .map(|i| {
                let base = 40.0 + 15.0 * ((i as f64) / 3.0).sin() + (i % 7) as f64;
                row(1960 + i, [base; 12])
            })
            .collect();
        RawMonthlyTable::new(rows).unwrap()
    }

    #[test]
    fn test_winter_keeps_december_in_same_row() {
        let mut y2000 = [0.0; 12];
        y2000[11] = 10.0;
        let mut y2001 = [0.0; 12];
        y2001[0] = 5.0;
        y2001[1] = 3.0;
        y2001[11] = 7.0;
        let raw = RawMonthlyTable::new(vec![row(2000, y2000), row(2001, y2001)]).unwrap();
        let winter = Aggregator::seasonal(&raw, 2000, 1, Season::Winter);
        assert_eq!(winter.data().rainfall(), &[10.0, 15.0]);
    }

    #[test]
    fn test_spans() {
        let months: [f64; 12] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        let r = row(2000, months);
        assert_eq!(MonthSpan::yearly().aggregate(&r), 78.0);
        assert_eq!(MonthSpan::monthly(Month::May).aggregate(&r), 5.0);
        assert_eq!(MonthSpan::seasonal(Season::Fall).aggregate(&r), 30.0);
        assert_eq!(MonthSpan::seasonal(Season::Winter).aggregate(&r), 15.0);
    }

    #[test]
    fn test_starting_year_filters_rows() {
        let may = Aggregator::monthly(&five_years(), 2002, 1, Month::May);
        assert_eq!(may.data().years(), &[2002, 2003, 2004]);
        assert_eq!(may.last_year(), Some(2004));
    }

    #[test]
    fn test_may_average_over_five_years() {
        let may = Aggregator::monthly(&five_years(), 2000, 1, Month::May);
        assert_eq!(may.average(2000, Some(2004)), 30.2);
        assert_eq!(may.average(2002, Some(2002)), 30.0);
        assert_eq!(may.average(2010, None), 0.0);
        assert_eq!(may.average(2004, Some(2000)), 0.0);
    }

    #[test]
    fn test_slice_length() {
        let yearly = Aggregator::yearly(&sixty_years(), 1960, 1);
        assert_eq!(yearly.slice(Some(1970), Some(1989)).len(), 20);
        assert_eq!(yearly.slice(Some(1970), None).len(), 50);
    }

    #[test]
    fn test_normal_is_thirty_year_average() {
        let yearly = Aggregator::yearly(&sixty_years(), 1960, 1);
        for begin in [1960, 1971, 1990] {
            assert_eq!(yearly.normal(begin), yearly.average(begin, Some(begin + 29)));
        }
    }

    #[test]
    fn test_years_below_and_above_normal() {
        let yearly = Aggregator::yearly(&sixty_years(), 1960, 1);
        let below = yearly.years_below_normal(1960, 1990, Some(2019));
        let above = yearly.years_above_normal(1960, 1990, Some(2019));
        assert!(below + above <= 30);
        assert!(below > 0 && above > 0);
    }

    #[test]
    fn test_relative_distance_to_normal() {
        let may = Aggregator::monthly(&five_years(), 2000, 1, Month::May);
        // Normal over the available years is 30.2, average of 2003-2004 is 45.5.
        assert_eq!(may.relative_distance_to_normal(2000, 2003, Some(2004)), Some(50.7));
        assert_eq!(may.relative_distance_to_normal(2000, 2003, None), Some(50.7));
        assert_eq!(may.relative_distance_to_normal(2000, 2004, Some(2003)), None);
        assert_eq!(may.relative_distance_to_normal(2050, 2000, None), None);
    }

    #[test]
    fn test_extreme_years_yield_sentinels() {
        let raw = RawMonthlyTable::new(vec![row(2000, [1.0; 12])]).unwrap();
        let yearly = Aggregator::yearly(&raw, 2000, 1);
        assert_eq!(yearly.normal(i32::MAX - 5), 0.0);
        assert_eq!(
            yearly.relative_distance_to_normal(2000, i32::MIN, Some(2000)),
            None
        );
        assert_eq!(
            yearly.relative_distance_by_year_count(2000, i32::MIN, Some(i32::MAX)),
            None
        );
    }

    #[test]
    fn test_year_equal_to_normal_is_neither_below_nor_above() {
        // 2000-2029 alternate 12 and 36 mm, so the normal is 24 mm; 2030 sits on it.
        let rows = (0..31)
            .map(|i| {
                let monthly = match i {
                    30 => 2.0,
                    i if i % 2 == 0 => 1.0,
                    _ => 3.0,
                };
                row(2000 + i, [monthly; 12])
            })
            .collect();
        let yearly = Aggregator::yearly(&RawMonthlyTable::new(rows).unwrap(), 2000, 1);
        assert_eq!(yearly.normal(2000), 24.0);
        let below = yearly.years_below_normal(2000, 2000, None);
        let above = yearly.years_above_normal(2000, 2000, None);
        assert_eq!((below, above), (15, 15));
        assert!(below + above < yearly.data().len());
    }

    #[test]
    fn test_relative_distance_by_year_count() {
        let may = Aggregator::monthly(&five_years(), 2000, 1, Month::May);
        // 30.2 normal: 2000-2002 below, 2003-2004 above.
        assert_eq!(may.relative_distance_by_year_count(2000, 2000, None), Some(-20.0));
        assert_eq!(may.relative_distance_by_year_count(2000, 2003, Some(2002)), None);
    }

    #[test]
    fn test_standard_deviation() {
        let mut may = Aggregator::monthly(&five_years(), 2000, 2, Month::May);
        assert_eq!(
            may.standard_deviation(2000, None, Label::LinearRegression, false),
            None
        );
        let std = may
            .standard_deviation(2000, None, Label::Rainfall, false)
            .unwrap();
        assert_eq!(std, 16.13);
        let weighed = may
            .standard_deviation(2000, None, Label::Rainfall, true)
            .unwrap();
        assert_eq!(weighed, 0.53);
        may.add_linear_regression().unwrap();
        assert!(may
            .standard_deviation(2000, None, Label::LinearRegression, false)
            .is_some());
    }

    #[test]
    fn test_linear_regression_does_not_mutate() {
        let yearly = Aggregator::yearly(&sixty_years(), 1960, 1);
        let (r2, _) = yearly.linear_regression(1960, None).unwrap();
        assert!((0.0..=1.0).contains(&r2));
        assert_eq!(yearly.data().labels(), vec![Label::Year, Label::Rainfall]);
        assert_eq!(yearly.linear_regression(2019, None), None);
    }

    #[test]
    fn test_add_linear_regression() {
        let rows = (0..4)
            .map(|i| row(2000 + i, [1.0 + i as f64; 12]))
            .collect();
        let mut yearly = Aggregator::yearly(&RawMonthlyTable::new(rows).unwrap(), 2000, 1);
        let (r2, slope) = yearly.add_linear_regression().unwrap();
        assert_eq!(slope, 12.0);
        assert!((r2 - 1.0).abs() < 1e-9);
        assert_eq!(
            yearly.data().column(Label::LinearRegression),
            Some(vec![12.0, 24.0, 36.0, 48.0])
        );
    }

    #[test]
    fn test_add_percentage_of_normal() {
        let mut may = Aggregator::monthly(&five_years(), 2000, 1, Month::May);
        assert!(may.add_percentage_of_normal(2000, Some(2001)));
        assert_eq!(
            may.data().column(Label::PercentageOfNormal),
            Some(vec![66.7, 133.3, 200.0, 266.7, 340.0])
        );
        assert!(!may.add_percentage_of_normal(2030, None));
    }

    #[test]
    fn test_add_savgol_filter() {
        let mut yearly = Aggregator::yearly(&sixty_years(), 1960, 1);
        yearly.add_savgol_filter().unwrap();
        let smoothed = yearly.data().column(Label::SavitzkyGolayFilter).unwrap();
        assert_eq!(smoothed.len(), 60);

        let mut may = Aggregator::monthly(&five_years(), 2000, 1, Month::May);
        assert!(matches!(
            may.add_savgol_filter(),
            Err(RainfallError::SeriesTooShort { needed: 10, found: 5 })
        ));
    }

    #[test]
    fn test_add_kmeans() {
        let rows = (0..40)
            .map(|i| row(1980 + i, [20.0 + (i * 37 % 11) as f64; 12]))
            .collect();
        let mut yearly = Aggregator::yearly(&RawMonthlyTable::new(rows).unwrap(), 1980, 1);
        assert_eq!(yearly.clusters_number(), 0);
        assert_eq!(yearly.add_kmeans(3).unwrap(), 3);
        let labels = yearly.data().clusters().unwrap();
        assert_eq!(labels.len(), 40);
        assert!(labels.iter().all(|label| *label < 3));
        assert_eq!(yearly.clusters_number(), 3);
    }

    #[test]
    fn test_remove_column() {
        let mut yearly = Aggregator::yearly(&sixty_years(), 1960, 1);
        yearly.add_linear_regression().unwrap();
        assert!(!yearly.remove_column(Label::Year));
        assert!(!yearly.remove_column(Label::Rainfall));
        assert_eq!(yearly.data().labels().len(), 3);
        assert!(yearly.remove_column(Label::LinearRegression));
        assert_eq!(yearly.data().labels().len(), 2);
    }

    #[test]
    fn test_export_csv_round_trip() {
        let yearly = Aggregator::yearly(&sixty_years(), 1960, 1);
        let csv = yearly.export_csv(Some(1980), Some(1989)).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let parsed: Vec<(i32, f64)> = reader
            .records()
            .map(|record| {
                let record = record.unwrap();
                (record[0].parse().unwrap(), record[1].parse().unwrap())
            })
            .collect();
        let slice = yearly.slice(Some(1980), Some(1989));
        let expected: Vec<(i32, f64)> = slice
            .years()
            .iter()
            .copied()
            .zip(slice.rainfall().iter().copied())
            .collect();
        assert_eq!(parsed, expected);
    }
}
