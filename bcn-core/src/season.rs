use crate::month::Month;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Meteorological seasons, each made of three consecutive months.
///
/// Winter wraps around the end of the calendar: December, January, February.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// All seasons, winter first.
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    /// The three months of the season, in the order they occur.
    pub fn months(self) -> [Month; 3] {
        match self {
            Season::Winter => [Month::December, Month::January, Month::February],
            Season::Spring => [Month::March, Month::April, Month::May],
            Season::Summer => [Month::June, Month::July, Month::August],
            Season::Fall => [Month::September, Month::October, Month::November],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }

    /// Capitalized name, for chart labels next to month names.
    pub fn title(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|season| season.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown season: {needle}"))
    }
}

#[cfg(test)]
mod tests {
    use super::Season;
    use crate::month::Month;

    #[test]
    fn test_winter_wraps_year_boundary() {
        assert_eq!(
            Season::Winter.months(),
            [Month::December, Month::January, Month::February]
        );
    }

    #[test]
    fn test_seasons_cover_every_month_once() {
        let mut ranks: Vec<usize> = Season::ALL
            .iter()
            .flat_map(|season| season.months())
            .map(Month::rank)
            .collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn test_title_matches_name() {
        for season in Season::ALL {
            assert_eq!(season.title().to_lowercase(), season.name());
        }
        assert_eq!(Season::Winter.title(), "Winter");
    }

    #[test]
    fn test_parse() {
        assert_eq!("Fall".parse::<Season>(), Ok(Season::Fall));
        assert!("autumn".parse::<Season>().is_err());
    }
}
