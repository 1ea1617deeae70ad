//! Column mappings: rules that turn raw file columns into canonical ones.
//!
//! A [`Mapping`] keys [`MapEntry`] rules by raw column name. Each rule names a
//! [`ColumnType`] and may rename the column and rescale numeric values as
//! `(value + addition) * multiplier`. Raw columns without a rule are passed
//! through unmapped.
//!
//! Mappings persist with column types referenced by id ([`DbMapping`]); the
//! in-memory form carries the resolved [`ColumnType`]. Rule order is kept
//! because rename collision resolution depends on it.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet, map::Entry};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    columns::{ColumnType, DataType, find_by_id},
    data::{
        RawValue, Value, datetime_from_millis, parse_datetime, parse_float_prefix,
        parse_int_prefix,
    },
    error::MappingError,
    summary::ColumnSummary,
};

pub const DEFAULT_REQUIRED_COLUMNS: [&str; 3] = ["ElapsedTime_s", "Voltage_V", "Current_A"];

/// Canonical column names every valid mapping must cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredColumns {
    names: Vec<String>,
}

impl Default for RequiredColumns {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_COLUMNS)
    }
}

impl RequiredColumns {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|required| required == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Rule for one raw column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry<C = ColumnType> {
    #[serde(default, alias = "new_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addition: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    pub column_type: C,
}

impl<C> MapEntry<C> {
    pub fn new(column_type: C) -> Self {
        Self {
            name: None,
            addition: None,
            multiplier: None,
            column_type,
        }
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn rescaled(mut self, addition: f64, multiplier: f64) -> Self {
        self.addition = Some(addition);
        self.multiplier = Some(multiplier);
        self
    }

    fn with_column_type<D>(&self, column_type: D) -> MapEntry<D> {
        MapEntry {
            name: self.name.clone(),
            addition: self.addition,
            multiplier: self.multiplier,
            column_type,
        }
    }

    fn rescale(&self, value: f64) -> f64 {
        (value + self.addition.unwrap_or(0.0)) * self.multiplier.unwrap_or(1.0)
    }
}

impl MapEntry<ColumnType> {
    /// Output column name: the rename if set, else the column type's name.
    pub fn output_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.column_type.name,
        }
    }
}

pub type ColumnMap<C = ColumnType> = IndexMap<String, MapEntry<C>>;
pub type DbMapEntry = MapEntry<u64>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub create: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping<C = ColumnType> {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default = "IndexMap::new")]
    pub map: ColumnMap<C>,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default = "default_read_access_level")]
    pub read_access_level: i32,
    #[serde(default = "default_write_access_level")]
    pub edit_access_level: i32,
    #[serde(default = "default_write_access_level")]
    pub delete_access_level: i32,
    #[serde(default)]
    pub missing_required_columns: Vec<String>,
    #[serde(default)]
    pub in_use: bool,
}

pub type DbMapping = Mapping<u64>;

fn default_read_access_level() -> i32 {
    2
}

fn default_write_access_level() -> i32 {
    3
}

impl<C> Mapping<C> {
    /// Unsaved mapping the current user may edit.
    pub fn blank() -> Self {
        Self {
            id: String::new(),
            url: None,
            name: String::new(),
            map: IndexMap::new(),
            is_valid: false,
            team: None,
            permissions: Permissions {
                read: true,
                write: true,
                create: true,
            },
            read_access_level: default_read_access_level(),
            edit_access_level: default_write_access_level(),
            delete_access_level: default_write_access_level(),
            missing_required_columns: Vec::new(),
            in_use: false,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }
}

impl<C: PartialEq> Mapping<C> {
    /// Rule order is significant.
    pub fn map_has_changed(&self, original: Option<&Self>) -> bool {
        match original {
            Some(original) => !self.map.iter().eq(original.map.iter()),
            None => true,
        }
    }

    pub fn has_changed(&self, original: Option<&Self>) -> bool {
        let Some(original) = original else {
            return true;
        };
        self.map_has_changed(Some(original))
            || self.name != original.name
            || self.team != original.team
            || self.read_access_level != original.read_access_level
            || self.edit_access_level != original.edit_access_level
            || self.delete_access_level != original.delete_access_level
    }

    /// New mappings are dirty once they have a rule; saved ones once changed.
    pub fn is_dirty(&self, original: Option<&Self>) -> bool {
        if self.is_new() {
            !self.map.is_empty()
        } else {
            self.has_changed(original)
        }
    }

    pub fn can_be_saved(&self, original: Option<&Self>) -> bool {
        self.is_dirty(original)
            && !self.name.is_empty()
            && self.team.as_deref().is_some_and(|team| !team.is_empty())
            && self.permissions.write
    }

    /// Editing the map of a mapping already applied to files forces a
    /// re-import of their data.
    pub fn requires_reimport_warning(&self, original: Option<&Self>) -> bool {
        self.in_use && self.map_has_changed(original)
    }
}

impl Mapping<ColumnType> {
    /// Resolves column type ids; rules naming an unknown id are dropped.
    pub fn from_db(db: &DbMapping, types: &[ColumnType]) -> Self {
        let map = db
            .map
            .iter()
            .filter_map(|(column, entry)| match find_by_id(types, entry.column_type) {
                Some(column_type) => {
                    Some((column.clone(), entry.with_column_type(column_type.clone())))
                }
                None => {
                    warn!(
                        "Column type {} for column '{column}' not found among {} known type(s); dropping it",
                        entry.column_type,
                        types.len()
                    );
                    None
                }
            })
            .collect();
        db.with_map(map)
    }

    pub fn to_db(&self) -> DbMapping {
        let map = self
            .map
            .iter()
            .map(|(column, entry)| (column.clone(), entry.with_column_type(entry.column_type.id)))
            .collect();
        self.with_map(map)
    }

    pub fn missing_required_columns(&self, required: &RequiredColumns) -> Vec<String> {
        missing_required_columns(&self.map, required)
    }

    pub fn is_valid_for(&self, required: &RequiredColumns) -> bool {
        self.missing_required_columns(required).is_empty()
    }

    /// Copy with `is_valid` and `missing_required_columns` recomputed.
    pub fn validated(&self, required: &RequiredColumns) -> Self {
        let missing = self.missing_required_columns(required);
        Self {
            is_valid: missing.is_empty(),
            missing_required_columns: missing,
            ..self.clone()
        }
    }

    /// Copy with `map` replaced through [`safe_set_mapping`].
    pub fn with_safe_map(&self, map: ColumnMap, raw_columns: &[&str]) -> Self {
        Self {
            map: safe_set_mapping(&map, raw_columns),
            ..self.clone()
        }
    }

    pub fn has_numeric_columns(&self) -> bool {
        self.map
            .values()
            .any(|entry| entry.column_type.data_type.is_numeric())
    }

    pub fn renameable_columns(&self) -> impl Iterator<Item = &str> {
        self.map
            .iter()
            .filter(|(_, entry)| mapped_column_is_renameable(entry))
            .map(|(column, _)| column.as_str())
    }
}

impl<C: Clone> Mapping<C> {
    fn with_map<D>(&self, map: ColumnMap<D>) -> Mapping<D> {
        Mapping {
            id: self.id.clone(),
            url: self.url.clone(),
            name: self.name.clone(),
            map,
            is_valid: self.is_valid,
            team: self.team.clone(),
            permissions: self.permissions,
            read_access_level: self.read_access_level,
            edit_access_level: self.edit_access_level,
            delete_access_level: self.delete_access_level,
            missing_required_columns: self.missing_required_columns.clone(),
            in_use: self.in_use,
        }
    }
}

/// Required canonical names no rule maps onto, in required-set order.
pub fn missing_required_columns(map: &ColumnMap, required: &RequiredColumns) -> Vec<String> {
    let covered: HashSet<&str> = map
        .values()
        .map(|entry| entry.column_type.name.as_str())
        .collect();
    required
        .iter()
        .filter(|name| !covered.contains(name))
        .map(str::to_string)
        .collect()
}

/// Required column types keep their canonical name.
pub fn mapped_column_is_renameable(entry: &MapEntry) -> bool {
    !entry.column_type.is_required
}

/// Converts one raw column through its rule. Without a rule the cells pass
/// through; empty and unparseable cells come back as `None`.
pub fn convert_column(
    values: &[RawValue],
    entry: Option<&MapEntry>,
) -> Result<Vec<Option<Value>>, MappingError> {
    let Some(entry) = entry else {
        return Ok(values.iter().map(RawValue::passthrough).collect());
    };
    let converted = match &entry.column_type.data_type {
        DataType::Bool => values
            .iter()
            .map(|value| match value {
                RawValue::Null => None,
                other => Some(Value::Boolean(is_true_cell(other))),
            })
            .collect(),
        DataType::Float => values
            .iter()
            .map(|value| {
                numeric_cell(value, parse_float_prefix).map(|v| Value::Float(entry.rescale(v)))
            })
            .collect(),
        DataType::Int => values
            .iter()
            .map(|value| {
                numeric_cell(value, parse_int_prefix)
                    .map(|v| Value::from_number(entry.rescale(v)))
            })
            .collect(),
        DataType::Str => values
            .iter()
            .map(|value| match value {
                RawValue::Null => None,
                other => Some(Value::String(other.as_display())),
            })
            .collect(),
        DataType::DateTime => values.iter().map(datetime_cell).collect(),
        DataType::Unknown(token) => {
            return Err(MappingError::UnknownColumnType {
                column_type: entry.column_type.name.clone(),
                data_type: token.clone(),
            });
        }
    };
    Ok(converted)
}

fn is_true_cell(value: &RawValue) -> bool {
    match value {
        RawValue::Boolean(b) => *b,
        RawValue::String(s) => s == "true",
        RawValue::Integer(i) => *i == 1,
        RawValue::Float(f) => *f == 1.0,
        RawValue::Null => false,
    }
}

fn numeric_cell(value: &RawValue, parse: fn(&str) -> Option<f64>) -> Option<f64> {
    match value {
        RawValue::Null => None,
        other => parse(&other.as_display()),
    }
}

fn datetime_cell(value: &RawValue) -> Option<Value> {
    let parsed = match value {
        RawValue::String(s) => parse_datetime(s).ok(),
        RawValue::Integer(i) => datetime_from_millis(*i as f64),
        RawValue::Float(f) => datetime_from_millis(*f),
        RawValue::Boolean(_) | RawValue::Null => None,
    };
    parsed.map(Value::DateTime)
}

/// Renames rules so no two output columns share a name.
///
/// Leading underscores are stripped from renames first. A name is taken once
/// it has been assigned, or when it belongs to a different raw column of the
/// file. A rule whose name is taken gets one underscore per taken name
/// containing it, then more until the prefixed name is free too.
pub fn safe_set_mapping(map: &ColumnMap, raw_columns: &[&str]) -> ColumnMap {
    let raw: HashSet<&str> = raw_columns.iter().copied().collect();
    let mut used: IndexSet<String> = IndexSet::with_capacity(map.len());
    let mut resolved = ColumnMap::with_capacity(map.len());

    for (column, entry) in map {
        let mut entry = entry.clone();
        entry.name = base_rename(&entry);
        let name = entry.output_name().to_string();

        if raw.contains(name.as_str()) && *column != name {
            used.insert(name.clone());
        }
        if used.contains(&name) {
            let underscores = used.iter().filter(|taken| taken.contains(&name)).count();
            let mut renamed = format!("{}{name}", "_".repeat(underscores));
            while used.contains(&renamed) || (raw.contains(renamed.as_str()) && *column != renamed) {
                renamed.insert(0, '_');
            }
            debug!("Renaming mapped column '{column}' from '{name}' to '{renamed}'");
            used.insert(renamed.clone());
            entry.name = Some(renamed);
        } else {
            used.insert(name);
        }
        resolved.insert(column.clone(), entry);
    }
    resolved
}

/// Rename with leading underscores removed. A rename that only re-prefixes the
/// column type's own name is dropped so resolving twice gives the same map.
fn base_rename(entry: &MapEntry) -> Option<String> {
    let own_name = entry.column_type.name.trim_start_matches('_');
    entry
        .name
        .as_deref()
        .map(|name| name.trim_start_matches('_'))
        .filter(|name| !name.is_empty() && *name != own_name)
        .map(str::to_string)
}

/// Transformed columns ready for tabular display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingPreview {
    pub columns: IndexMap<String, Vec<Option<Value>>>,
    pub is_valid: bool,
    pub missing_required_columns: Vec<String>,
}

impl MappingPreview {
    pub fn row_count(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    /// Row-major display cells; absent cells render empty.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        (0..self.row_count())
            .map(|row| {
                self.columns
                    .values()
                    .map(|values| {
                        values
                            .get(row)
                            .and_then(Option::as_ref)
                            .map(Value::as_display)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect()
    }
}

/// Applies `mapping` to every column of `summary`. Output names must be
/// unique; run the map through [`safe_set_mapping`] first when they may not be.
pub fn apply_mapping(
    summary: &ColumnSummary,
    mapping: &Mapping,
    required: &RequiredColumns,
) -> Result<MappingPreview, MappingError> {
    let mut columns = IndexMap::with_capacity(summary.len());
    for (raw_name, values) in summary.columns() {
        let entry = mapping.map.get(raw_name);
        let output_name = entry
            .map(MapEntry::output_name)
            .filter(|name| !name.is_empty())
            .unwrap_or(raw_name)
            .to_string();
        match columns.entry(output_name) {
            Entry::Occupied(taken) => {
                return Err(MappingError::DuplicateOutputColumn {
                    name: taken.key().clone(),
                    column: raw_name.to_string(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(convert_column(values, entry)?);
            }
        }
    }
    let missing = mapping.missing_required_columns(required);
    Ok(MappingPreview {
        columns,
        is_valid: missing.is_empty(),
        missing_required_columns: missing,
    })
}
