use bcn_core::{Label, RainfallError, Result};
use csv::WriterBuilder;
use log::warn;

/// Values of a derived column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Float(Vec<f64>),
    Cluster(Vec<usize>),
}

impl ColumnValues {
    fn len(&self) -> usize {
        match self {
            ColumnValues::Float(values) => values.len(),
            ColumnValues::Cluster(values) => values.len(),
        }
    }

    fn select(&self, keep: &[usize]) -> ColumnValues {
        match self {
            ColumnValues::Float(values) => {
                ColumnValues::Float(keep.iter().map(|&i| values[i]).collect())
            }
            ColumnValues::Cluster(values) => {
                ColumnValues::Cluster(keep.iter().map(|&i| values[i]).collect())
            }
        }
    }

    fn format(&self, row: usize) -> String {
        match self {
            ColumnValues::Float(values) => format_float(values[row]),
            ColumnValues::Cluster(values) => values[row].to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedColumn {
    pub label: Label,
    pub values: ColumnValues,
}

/// Year-indexed rainfall of one slice plus the columns derived from it.
///
/// `Year` and `Rainfall` always exist; derived columns keep the order in
/// which they were first added.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingTable {
    years: Vec<i32>,
    rainfall: Vec<f64>,
    derived: Vec<DerivedColumn>,
}

impl WorkingTable {
    pub fn new(years: Vec<i32>, rainfall: Vec<f64>) -> Self {
        debug_assert_eq!(years.len(), rainfall.len());
        WorkingTable {
            years,
            rainfall,
            derived: Vec::new(),
        }
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn rainfall(&self) -> &[f64] {
        &self.rainfall
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn labels(&self) -> Vec<Label> {
        let mut labels = vec![Label::Year, Label::Rainfall];
        labels.extend(self.derived.iter().map(|column| column.label));
        labels
    }

    pub fn has_column(&self, label: Label) -> bool {
        label.is_protected() || self.derived.iter().any(|column| column.label == label)
    }

    pub fn derived(&self, label: Label) -> Option<&ColumnValues> {
        self.derived
            .iter()
            .find(|column| column.label == label)
            .map(|column| &column.values)
    }

    /// Any column as floats, `None` when it is absent.
    pub fn column(&self, label: Label) -> Option<Vec<f64>> {
        match label {
            Label::Year => Some(self.years.iter().map(|&y| f64::from(y)).collect()),
            Label::Rainfall => Some(self.rainfall.clone()),
            _ => match self.derived(label)? {
                ColumnValues::Float(values) => Some(values.clone()),
                ColumnValues::Cluster(values) => Some(values.iter().map(|&v| v as f64).collect()),
            },
        }
    }

    pub fn clusters(&self) -> Option<&[usize]> {
        match self.derived(Label::Kmeans)? {
            ColumnValues::Cluster(values) => Some(values),
            ColumnValues::Float(_) => None,
        }
    }

    /// Add a derived column, replacing any existing column with the same label.
    ///
    /// Returns `false` when the label is protected or the length does not match.
    pub fn set_column(&mut self, label: Label, values: ColumnValues) -> bool {
        if label.is_protected() {
            warn!("refusing to overwrite protected column {label}");
            return false;
        }
        if values.len() != self.len() {
            warn!(
                "skipping column {label}: {} values for {} rows",
                values.len(),
                self.len()
            );
            return false;
        }
        match self.derived.iter_mut().find(|column| column.label == label) {
            Some(column) => column.values = values,
            None => self.derived.push(DerivedColumn { label, values }),
        }
        true
    }

    pub fn remove_column(&mut self, label: Label) -> bool {
        if label.is_protected() {
            return false;
        }
        let before = self.derived.len();
        self.derived.retain(|column| column.label != label);
        self.derived.len() != before
    }

    /// Copy of the rows whose year lies within the optional bounds.
    pub fn slice(&self, begin_year: Option<i32>, end_year: Option<i32>) -> WorkingTable {
        let keep: Vec<usize> = self
            .years
            .iter()
            .enumerate()
            .filter(|&(_, year)| {
                begin_year.map_or(true, |b| *year >= b) && end_year.map_or(true, |e| *year <= e)
            })
            .map(|(i, _)| i)
            .collect();
        WorkingTable {
            years: keep.iter().map(|&i| self.years[i]).collect(),
            rainfall: keep.iter().map(|&i| self.rainfall[i]).collect(),
            derived: self
                .derived
                .iter()
                .map(|column| DerivedColumn {
                    label: column.label,
                    values: column.values.select(&keep),
                })
                .collect(),
        }
    }

    /// Serialize every column to CSV text, header row first.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(self.labels().iter().map(|label| label.as_str()))?;
        for row in 0..self.len() {
            let mut record = vec![self.years[row].to_string(), format_float(self.rainfall[row])];
            record.extend(self.derived.iter().map(|column| column.values.format(row)));
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| RainfallError::Io(err.into_error()))?;
        String::from_utf8(bytes).map_err(|err| RainfallError::DataFormat(err.to_string()))
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
