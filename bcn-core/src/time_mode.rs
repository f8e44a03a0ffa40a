use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How rainfall is sliced within a year: whole year, one month or one season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    Yearly,
    Monthly,
    Seasonal,
}

impl TimeMode {
    pub fn name(self) -> &'static str {
        match self {
            TimeMode::Yearly => "yearly",
            TimeMode::Monthly => "monthly",
            TimeMode::Seasonal => "seasonal",
        }
    }
}

impl fmt::Display for TimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yearly" => Ok(TimeMode::Yearly),
            "monthly" => Ok(TimeMode::Monthly),
            "seasonal" => Ok(TimeMode::Seasonal),
            other => Err(format!("unknown time mode: {other}")),
        }
    }
}
