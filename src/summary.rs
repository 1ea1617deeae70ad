//! Raw column samples taken from an uploaded data file.
//!
//! The API sends a summary as `{column: {rowIndex: value}}`; files may also
//! provide `{column: [values]}`. Both deserialize into the same ordered
//! column list, with row-keyed cells ordered by numeric index.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::data::RawValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColumnSummary {
    columns: IndexMap<String, Vec<RawValue>>,
}

impl ColumnSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns<I, K>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<RawValue>)>,
        K: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, values)| (name.into(), values))
                .collect(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, values: Vec<RawValue>) -> Self {
        self.columns.insert(name.into(), values);
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[RawValue])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&[RawValue]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Length of the longest column.
    pub fn row_count(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn truncate(&self, rows: usize) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), values.iter().take(rows).cloned().collect()))
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for ColumnSummary {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ColumnRepr {
            Values(Vec<RawValue>),
            Rows(IndexMap<String, RawValue>),
        }

        let raw = IndexMap::<String, ColumnRepr>::deserialize(deserializer)?;
        let columns = raw
            .into_iter()
            .map(|(name, repr)| {
                let values = match repr {
                    ColumnRepr::Values(values) => values,
                    ColumnRepr::Rows(rows) => {
                        let mut rows: Vec<(String, RawValue)> = rows.into_iter().collect();
                        rows.sort_by(|(a, _), (b, _)| compare_row_keys(a, b));
                        rows.into_iter().map(|(_, value)| value).collect()
                    }
                };
                (name, values)
            })
            .collect();
        Ok(Self { columns })
    }
}

/// Integer-like keys ascend numerically ahead of any other keys.
pub(crate) fn compare_row_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
