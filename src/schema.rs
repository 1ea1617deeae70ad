//! Field schemas: per resource kind, the type and editing rules of each field.
//!
//! A [`ResourceSchema`] supplies the hints that steer
//! [`to_type_value_notation_wrapper`](crate::tvn::to_type_value_notation_wrapper).
//! Schemas are loaded once (builtin table or a YAML file) into a
//! [`SchemaRegistry`] and only read afterwards.
//!
//! ## YAML layout
//!
//! ```yaml
//! CELL:
//!   identifier: {read_only: false, type: string, priority: IDENTITY}
//!   family: {read_only: false, type: galv_CELL_FAMILY, priority: CONTEXT}
//! ```
//!
//! `readonly`/`createonly` are accepted as aliases, and priorities may be
//! given by name or by level (-1 through 3).

use std::{collections::BTreeMap, fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{resource::ResourceKind, tvn::TypeTag};

const BUILTIN_FIELDS: &str = include_str!("builtin_fields.yaml");

/// How prominently a field is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    Hidden,
    #[default]
    Detail,
    Summary,
    Context,
    Identity,
}

impl Priority {
    pub fn level(&self) -> i8 {
        match self {
            Priority::Hidden => -1,
            Priority::Detail => 0,
            Priority::Summary => 1,
            Priority::Context => 2,
            Priority::Identity => 3,
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            -1 => Some(Priority::Hidden),
            0 => Some(Priority::Detail),
            1 => Some(Priority::Summary),
            2 => Some(Priority::Context),
            3 => Some(Priority::Identity),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Hidden => "HIDDEN",
            Priority::Detail => "DETAIL",
            Priority::Summary => "SUMMARY",
            Priority::Context => "CONTEXT",
            Priority::Identity => "IDENTITY",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(level) = trimmed.parse::<i64>() {
            return Priority::from_level(level)
                .ok_or_else(|| anyhow!("Priority level {level} is outside -1..=3"));
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "HIDDEN" => Ok(Priority::Hidden),
            "DETAIL" => Ok(Priority::Detail),
            "SUMMARY" => Ok(Priority::Summary),
            "CONTEXT" => Ok(Priority::Context),
            "IDENTITY" => Ok(Priority::Identity),
            _ => Err(anyhow!("Unknown priority '{value}'")),
        }
    }
}

impl Serialize for Priority {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Level(i64),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Level(level) => Priority::from_level(level).ok_or_else(|| {
                serde::de::Error::custom(format!("priority level {level} is outside -1..=3"))
            }),
            Repr::Name(name) => Priority::from_str(&name).map_err(serde::de::Error::custom),
        }
    }
}

/// In-process rewrite applied to a field's raw API value. Must accept
/// already-transformed input.
pub type Transformation = fn(&Value) -> Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(alias = "readonly")]
    pub read_only: bool,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub many: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, alias = "createonly", skip_serializing_if = "std::ops::Not::not")]
    pub create_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fetch_in_download: bool,
    #[serde(skip)]
    pub transformation: Option<Transformation>,
}

impl FieldSpec {
    pub fn new(type_tag: TypeTag) -> Self {
        Self {
            read_only: false,
            type_tag,
            many: false,
            priority: Priority::Detail,
            create_only: false,
            default_value: None,
            fetch_in_download: false,
            transformation: None,
        }
    }

    pub fn is_editable(&self, creating: bool) -> bool {
        !self.read_only || (creating && self.create_only)
    }
}

/// Ordered field table for one resource kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSchema {
    fields: IndexMap<String, FieldSpec>,
}

impl ResourceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields_at_least(&self, priority: Priority) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields().filter(move |(_, spec)| spec.priority >= priority)
    }

    pub fn editable_fields(&self, creating: bool) -> Vec<&str> {
        self.fields()
            .filter(|(_, spec)| spec.is_editable(creating))
            .map(|(name, _)| name)
            .collect()
    }

    /// Starting values for a new resource.
    pub fn defaults(&self) -> Map<String, Value> {
        self.fields()
            .filter_map(|(name, spec)| {
                spec.default_value
                    .as_ref()
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect()
    }

    pub fn apply_transformations(&self, object: &Map<String, Value>) -> Map<String, Value> {
        object
            .iter()
            .map(|(key, value)| {
                let transformed = match self.field(key).and_then(|spec| spec.transformation) {
                    Some(transform) => transform(value),
                    None => value.clone(),
                };
                (key.clone(), transformed)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaRegistry {
    schemas: BTreeMap<ResourceKind, ResourceSchema>,
}

impl SchemaRegistry {
    /// The field table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_FIELDS).context("Parsing builtin field schema")
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Parsing field schema YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening field schema file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing field schema YAML {path:?}"))
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&ResourceSchema> {
        self.schemas.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.schemas.keys().copied()
    }

    pub fn with_schema(mut self, kind: ResourceKind, schema: ResourceSchema) -> Self {
        self.schemas.insert(kind, schema);
        self
    }

    pub fn with_transformation(
        mut self,
        kind: ResourceKind,
        field: &str,
        transformation: Transformation,
    ) -> Result<Self> {
        let Some(spec) = self
            .schemas
            .get_mut(&kind)
            .and_then(|schema| schema.fields.get_mut(field))
        else {
            bail!("No field '{field}' in schema for {kind}");
        };
        spec.transformation = Some(transformation);
        Ok(self)
    }
}
