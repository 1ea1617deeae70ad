//! Resource kinds and the registry that turns identifiers into resource URLs.
//!
//! Every resource kind is addressable as a TVN type tag of the form
//! `galv_<KIND>`. The registry is an immutable value built once (from
//! [`EngineConfig`](crate::config::EngineConfig) or defaults) and passed
//! explicitly to the code that needs it.

use std::{collections::BTreeMap, fmt, str::FromStr};

use anyhow::anyhow;
use heck::ToTitleCase;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const RESOURCE_TAG_PREFIX: &str = "galv_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Harvester,
    Path,
    ParquetPartition,
    File,
    Mapping,
    CellFamily,
    Cell,
    EquipmentFamily,
    Equipment,
    ScheduleFamily,
    Schedule,
    Experiment,
    CyclerTest,
    ArbitraryFile,
    ValidationSchema,
    Lab,
    Team,
    User,
    Token,
    Unit,
    ColumnFamily,
    Column,
    CellManufacturer,
    CellModel,
    CellFormFactor,
    CellChemistry,
    EquipmentType,
    EquipmentManufacturer,
    EquipmentModel,
    ScheduleIdentifier,
}

impl ResourceKind {
    pub const ALL: &'static [ResourceKind] = &[
        ResourceKind::Harvester,
        ResourceKind::Path,
        ResourceKind::ParquetPartition,
        ResourceKind::File,
        ResourceKind::Mapping,
        ResourceKind::CellFamily,
        ResourceKind::Cell,
        ResourceKind::EquipmentFamily,
        ResourceKind::Equipment,
        ResourceKind::ScheduleFamily,
        ResourceKind::Schedule,
        ResourceKind::Experiment,
        ResourceKind::CyclerTest,
        ResourceKind::ArbitraryFile,
        ResourceKind::ValidationSchema,
        ResourceKind::Lab,
        ResourceKind::Team,
        ResourceKind::User,
        ResourceKind::Token,
        ResourceKind::Unit,
        ResourceKind::ColumnFamily,
        ResourceKind::Column,
        ResourceKind::CellManufacturer,
        ResourceKind::CellModel,
        ResourceKind::CellFormFactor,
        ResourceKind::CellChemistry,
        ResourceKind::EquipmentType,
        ResourceKind::EquipmentManufacturer,
        ResourceKind::EquipmentModel,
        ResourceKind::ScheduleIdentifier,
    ];

    /// Upper-snake lookup key, e.g. `CELL_FAMILY`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Harvester => "HARVESTER",
            ResourceKind::Path => "PATH",
            ResourceKind::ParquetPartition => "PARQUET_PARTITION",
            ResourceKind::File => "FILE",
            ResourceKind::Mapping => "MAPPING",
            ResourceKind::CellFamily => "CELL_FAMILY",
            ResourceKind::Cell => "CELL",
            ResourceKind::EquipmentFamily => "EQUIPMENT_FAMILY",
            ResourceKind::Equipment => "EQUIPMENT",
            ResourceKind::ScheduleFamily => "SCHEDULE_FAMILY",
            ResourceKind::Schedule => "SCHEDULE",
            ResourceKind::Experiment => "EXPERIMENT",
            ResourceKind::CyclerTest => "CYCLER_TEST",
            ResourceKind::ArbitraryFile => "ARBITRARY_FILE",
            ResourceKind::ValidationSchema => "VALIDATION_SCHEMA",
            ResourceKind::Lab => "LAB",
            ResourceKind::Team => "TEAM",
            ResourceKind::User => "USER",
            ResourceKind::Token => "TOKEN",
            ResourceKind::Unit => "UNIT",
            ResourceKind::ColumnFamily => "COLUMN_FAMILY",
            ResourceKind::Column => "COLUMN",
            ResourceKind::CellManufacturer => "CELL_MANUFACTURER",
            ResourceKind::CellModel => "CELL_MODEL",
            ResourceKind::CellFormFactor => "CELL_FORM_FACTOR",
            ResourceKind::CellChemistry => "CELL_CHEMISTRY",
            ResourceKind::EquipmentType => "EQUIPMENT_TYPE",
            ResourceKind::EquipmentManufacturer => "EQUIPMENT_MANUFACTURER",
            ResourceKind::EquipmentModel => "EQUIPMENT_MODEL",
            ResourceKind::ScheduleIdentifier => "SCHEDULE_IDENTIFIER",
        }
    }

    /// API list path for the kind.
    pub fn default_path(&self) -> &'static str {
        match self {
            ResourceKind::Harvester => "/harvesters",
            ResourceKind::Path => "/paths",
            ResourceKind::ParquetPartition => "/parquet_partitions",
            ResourceKind::File => "/files",
            ResourceKind::Mapping => "/mapping",
            ResourceKind::CellFamily => "/cell_families",
            ResourceKind::Cell => "/cells",
            ResourceKind::EquipmentFamily => "/equipment_families",
            ResourceKind::Equipment => "/equipment",
            ResourceKind::ScheduleFamily => "/schedule_families",
            ResourceKind::Schedule => "/schedules",
            ResourceKind::Experiment => "/experiments",
            ResourceKind::CyclerTest => "/cycler_tests",
            ResourceKind::ArbitraryFile => "/arbitrary_files",
            ResourceKind::ValidationSchema => "/validation_schemas",
            ResourceKind::Lab => "/labs",
            ResourceKind::Team => "/teams",
            ResourceKind::User => "/users",
            ResourceKind::Token => "/tokens",
            ResourceKind::Unit => "/units",
            ResourceKind::ColumnFamily => "/column_types",
            ResourceKind::Column => "/columns",
            ResourceKind::CellManufacturer => "/cell_manufacturers",
            ResourceKind::CellModel => "/cell_models",
            ResourceKind::CellFormFactor => "/cell_form_factors",
            ResourceKind::CellChemistry => "/cell_chemistries",
            ResourceKind::EquipmentType => "/equipment_types",
            ResourceKind::EquipmentManufacturer => "/equipment_manufacturers",
            ResourceKind::EquipmentModel => "/equipment_models",
            ResourceKind::ScheduleIdentifier => "/schedule_identifiers",
        }
    }

    /// Autocomplete kinds are free-text vocabularies rather than full resources.
    pub fn is_autocomplete(&self) -> bool {
        matches!(
            self,
            ResourceKind::CellManufacturer
                | ResourceKind::CellModel
                | ResourceKind::CellFormFactor
                | ResourceKind::CellChemistry
                | ResourceKind::EquipmentType
                | ResourceKind::EquipmentManufacturer
                | ResourceKind::EquipmentModel
                | ResourceKind::ScheduleIdentifier
        )
    }

    pub fn display_name(&self) -> String {
        self.as_str().to_title_case()
    }

    /// TVN type tag, e.g. `galv_CELL`.
    pub fn tag(&self) -> String {
        format!("{RESOURCE_TAG_PREFIX}{}", self.as_str())
    }

    /// Exact key lookup; `galv_cell` is not a resource tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let key = tag.strip_prefix(RESOURCE_TAG_PREFIX)?;
        ResourceKind::ALL.iter().copied().find(|kind| kind.as_str() == key)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| anyhow!("Unknown resource kind '{value}'"))
    }
}

impl Serialize for ResourceKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ResourceKind::from_str(&token).map_err(serde::de::Error::custom)
    }
}

/// Base URL plus per-kind list paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRegistry {
    base_url: String,
    paths: BTreeMap<ResourceKind, String>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new("")
    }
}

impl ResourceRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let paths = ResourceKind::ALL
            .iter()
            .map(|kind| (*kind, kind.default_path().to_string()))
            .collect();
        Self { base_url, paths }
    }

    pub fn with_path(mut self, kind: ResourceKind, path: impl Into<String>) -> Self {
        self.paths.insert(kind, path.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path(&self, kind: ResourceKind) -> &str {
        self.paths
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_path())
    }

    /// Absolute list URL for a kind, e.g. `https://api.example/cells`.
    pub fn list_url(&self, kind: ResourceKind) -> String {
        format!("{}{}", self.base_url, self.path(kind))
    }

    pub fn resource_url(&self, kind: ResourceKind, id: &str) -> String {
        format!("{}/{id}", self.list_url(kind))
    }
}
