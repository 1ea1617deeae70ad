//! Canonical column types and the `columns` listing command.
//!
//! A [`ColumnType`] is the target a raw file column is mapped onto. Its
//! [`DataType`] decides how raw cells are coerced during a mapping preview.

use std::{fmt, str::FromStr};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{cli::ColumnsArgs, io_utils, table};

/// Storage type of a canonical column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    Bool,
    #[default]
    Float,
    Int,
    Str,
    DateTime,
    /// A token this build does not understand; converting through it fails.
    Unknown(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            DataType::Bool => "bool",
            DataType::Float => "float",
            DataType::Int => "int",
            DataType::Str => "str",
            DataType::DateTime => "datetime",
            DataType::Unknown(token) => token,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Float | DataType::Int)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let token = value.trim();
        Ok(match token.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => DataType::Bool,
            "float" => DataType::Float,
            "int" => DataType::Int,
            "str" | "string" => DataType::Str,
            "datetime" | "datetime64[ns]" => DataType::DateTime,
            _ => DataType::Unknown(token.to_string()),
        })
    }
}

impl Serialize for DataType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        let Ok(parsed) = DataType::from_str(&token);
        Ok(parsed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnType {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ColumnType {
    pub fn new(id: u64, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
            is_required: false,
            is_default: false,
            description: None,
            unit: None,
            url: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self.is_default = true;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

pub fn find_by_id(types: &[ColumnType], id: u64) -> Option<&ColumnType> {
    types.iter().find(|column_type| column_type.id == id)
}

/// Required types first, then default types, then by name.
pub fn sort_for_display(types: &mut [ColumnType]) {
    types.sort_by(|a, b| {
        b.is_required
            .cmp(&a.is_required)
            .then(b.is_default.cmp(&a.is_default))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });
}

pub fn load_column_types(path: &std::path::Path) -> Result<Vec<ColumnType>> {
    io_utils::read_structured(path)
        .with_context(|| format!("Loading column types from {path:?}"))
}

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let mut types = load_column_types(&args.input)?;
    if types.is_empty() {
        info!("{:?} does not define any column types", args.input);
        return Ok(());
    }
    sort_for_display(&mut types);

    let rows = types
        .iter()
        .map(|column_type| {
            let mut flags = Vec::new();
            if column_type.is_required {
                flags.push("required");
            }
            if column_type.is_default {
                flags.push("default");
            }
            vec![
                column_type.id.to_string(),
                column_type.name.clone(),
                column_type.data_type.to_string(),
                flags.join(","),
                column_type.unit.clone().unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>();

    let headers = ["id", "name", "type", "flags", "unit"].map(String::from);
    table::print_table(&headers, &rows);
    info!("Listed {} column type(s) from {:?}", types.len(), args.input);
    Ok(())
}
