//! Engine configuration loaded from YAML.
//!
//! ```yaml
//! api_base_url: https://api.galv.example
//! resource_paths:
//!   MAPPING: /column_mappings
//! required_columns: [ElapsedTime_s, Voltage_V, Current_A]
//! schema: fields.yaml
//! ```
//!
//! Every key is optional. A relative `schema` path resolves against the
//! directory holding the config file.

use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    mapping::RequiredColumns,
    resource::{ResourceKind, ResourceRegistry},
    schema::SchemaRegistry,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub api_base_url: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_paths: BTreeMap<ResourceKind, String>,
    pub required_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<PathBuf>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            resource_paths: BTreeMap::new(),
            required_columns: RequiredColumns::default().iter().map(str::to_string).collect(),
            schema: None,
            base_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let mut config: EngineConfig = serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        config.validate()?;
        debug!("Loaded engine config from {path:?}");
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml).context("Parsing config YAML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.required_columns.iter().all(|name| !name.trim().is_empty()),
            "required_columns must not contain blank names"
        );
        for (kind, path) in &self.resource_paths {
            ensure!(
                path.starts_with('/'),
                "resource path for {kind} must start with '/', got '{path}'"
            );
        }
        Ok(())
    }

    pub fn registry(&self) -> ResourceRegistry {
        self.resource_paths.iter().fold(
            ResourceRegistry::new(self.api_base_url.clone()),
            |registry, (kind, path)| registry.with_path(*kind, path.clone()),
        )
    }

    pub fn required(&self) -> RequiredColumns {
        RequiredColumns::new(self.required_columns.iter().cloned())
    }

    /// The configured field schema, or the builtin table.
    pub fn schemas(&self) -> Result<SchemaRegistry> {
        match &self.schema {
            Some(path) => {
                let resolved = match &self.base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                SchemaRegistry::load(&resolved)
            }
            None => SchemaRegistry::builtin(),
        }
    }
}
