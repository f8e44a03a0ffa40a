//! CSV exports of working tables.

use crate::metrics::{prepare, resolve_years};
use crate::{SliceArgs, YearArgs};
use bcn_data::AllRainfall;
use log::info;
use std::path::Path;

/// Write one slice as CSV to `output`, or to stdout when no path is given.
pub fn run_csv(
    all_rainfall: &AllRainfall,
    slice: &SliceArgs,
    years: &YearArgs,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let query = prepare(all_rainfall, slice, years)?;
    let csv = query
        .aggregator
        .export_csv(Some(query.begin_year), Some(query.end_year))?;
    match output {
        Some(path) => {
            std::fs::write(path, csv)?;
            info!("CSV written to {}", path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

pub fn run_export_all(
    all_rainfall: &AllRainfall,
    years: &YearArgs,
    folder: &Path,
) -> anyhow::Result<()> {
    let (begin_year, end_year) = resolve_years(all_rainfall, years)?;
    let written = all_rainfall.export_all_to_csv(begin_year, end_year, folder)?;
    info!("Export complete. Output: {}", written.display());
    println!("{}", written.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcn_core::{Month, RawMonthlyTable, TimeMode, YearRow};

    fn all_rainfall() -> AllRainfall {
        let rows = (0..10)
            .map(|i| YearRow {
                year: 2000 + i,
                months: [5.5; 12],
            })
            .collect();
        AllRainfall::new(RawMonthlyTable::new(rows).unwrap(), 2000, 1)
    }

    #[test]
    fn test_run_csv_to_file() {
        let all = all_rainfall();
        let slice = SliceArgs {
            time_mode: TimeMode::Monthly,
            month: Some(Month::March),
            season: None,
        };
        let years = YearArgs {
            begin_year: Some(2003),
            end_year: Some(2004),
        };
        let path = std::env::temp_dir().join("bcn_cmd_march.csv");
        run_csv(&all, &slice, &years, Some(&path)).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Year,Rainfall\n2003,5.5\n2004,5.5\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_run_export_all() {
        let all = all_rainfall();
        let folder = std::env::temp_dir().join("bcn_cmd_export_all");
        let years = YearArgs {
            begin_year: None,
            end_year: None,
        };
        run_export_all(&all, &years, &folder).unwrap();
        assert!(folder.join("2000_2009_rainfall.csv").exists());
        assert!(folder.join("seasons/2000_2009_fall_rainfall.csv").exists());
        std::fs::remove_dir_all(&folder).unwrap();
    }
}
