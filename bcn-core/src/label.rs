use serde::{Deserialize, Serialize};
use std::fmt;

/// Column labels of a working rainfall table.
///
/// `Year` and `Rainfall` are always present; the other labels name derived
/// columns added on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Year,
    Rainfall,
    PercentageOfNormal,
    LinearRegression,
    SavitzkyGolayFilter,
    Kmeans,
}

impl Label {
    /// Header text used for CSV exports and chart axes.
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Year => "Year",
            Label::Rainfall => "Rainfall",
            Label::PercentageOfNormal => "Percentage of normal",
            Label::LinearRegression => "Linear regression",
            Label::SavitzkyGolayFilter => "Savitzky–Golay filter",
            Label::Kmeans => "K-Means",
        }
    }

    /// Whether the column can never be removed from a working table.
    pub fn is_protected(self) -> bool {
        matches!(self, Label::Year | Label::Rainfall)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
