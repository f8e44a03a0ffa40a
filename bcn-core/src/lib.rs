pub mod error;
pub mod label;
pub mod month;
pub mod raw_table;
pub mod season;
pub mod time_mode;

pub use error::{RainfallError, Result};
pub use label::Label;
pub use month::Month;
pub use raw_table::{RawMonthlyTable, YearRow};
pub use season::Season;
pub use time_mode::TimeMode;
