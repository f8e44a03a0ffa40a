use crate::error::{RainfallError, Result};
use crate::month::Month;
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[cfg(feature = "api")]
use reqwest::{Client, StatusCode};

/// Expected number of columns in a raw rainfall CSV row: year + 12 months.
pub const CSV_ROW_LENGTH: usize = 13;

/// One year of monthly rainfall, in millimeters.
#[derive(Debug, Clone, PartialEq)]
pub struct YearRow {
    pub year: i32,
    pub months: [f64; 12],
}

impl YearRow {
    pub fn value(&self, month: Month) -> f64 {
        self.months[month.rank() - 1]
    }
}

impl TryFrom<&StringRecord> for YearRow {
    type Error = RainfallError;

    fn try_from(record: &StringRecord) -> Result<Self> {
        if record.len() != CSV_ROW_LENGTH {
            return Err(RainfallError::DataFormat(format!(
                "expected {} columns, found {}",
                CSV_ROW_LENGTH,
                record.len()
            )));
        }
        let year_field = &record[0];
        let year = year_field
            .parse::<i32>()
            .map_err(|_| RainfallError::DataFormat(format!("invalid year: {year_field}")))?;
        let mut months = [0.0; 12];
        for (slot, field) in months.iter_mut().zip(record.iter().skip(1)) {
            *slot = field.parse::<f64>().map_err(|_| {
                RainfallError::DataFormat(format!("invalid rainfall value for {year}: {field}"))
            })?;
        }
        Ok(YearRow { year, months })
    }
}

/// Immutable table of monthly rainfall, one row per year.
///
/// Years are strictly increasing and every value is a finite, non-negative
/// number of millimeters.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMonthlyTable {
    rows: Vec<YearRow>,
}

impl RawMonthlyTable {
    pub fn new(rows: Vec<YearRow>) -> Result<Self> {
        for pair in rows.windows(2) {
            if pair[1].year <= pair[0].year {
                return Err(RainfallError::DataFormat(format!(
                    "years must be strictly increasing: {} follows {}",
                    pair[1].year, pair[0].year
                )));
            }
        }
        if let Some(row) = rows
            .iter()
            .find(|row| row.months.iter().any(|v| !v.is_finite() || *v < 0.0))
        {
            return Err(RainfallError::DataFormat(format!(
                "negative or non-finite rainfall in year {}",
                row.year
            )));
        }
        Ok(RawMonthlyTable { rows })
    }

    /// Parse a CSV body with a `Year, <month>_rain, ...` header.
    pub fn parse_csv(body: &str) -> Result<Self> {
        Self::from_reader(body.as_bytes())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("reading rainfall table from {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let header_len = csv_reader.headers()?.len();
        if header_len != CSV_ROW_LENGTH {
            return Err(RainfallError::DataFormat(format!(
                "expected {} columns in header, found {}",
                CSV_ROW_LENGTH, header_len
            )));
        }
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(YearRow::try_from(&record)?);
        }
        let table = RawMonthlyTable::new(rows)?;
        info!(
            "loaded {} years of rainfall ({:?} - {:?})",
            table.len(),
            table.first_year(),
            table.last_year()
        );
        Ok(table)
    }

    /// Download the CSV at `url` and parse it.
    #[cfg(feature = "api")]
    pub async fn fetch(client: &Client, url: &str) -> Result<Self> {
        info!("fetching rainfall table from {url}");
        let response = client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(RainfallError::DataFormat(format!(
                "bad response status for {url}: {}",
                response.status()
            )));
        }
        let body = response.text().await?;
        Self::parse_csv(&body)
    }

    pub fn rows(&self) -> &[YearRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.rows.first().map(|row| row.year)
    }

    pub fn last_year(&self) -> Option<i32> {
        self.rows.last().map(|row| row.year)
    }
}
