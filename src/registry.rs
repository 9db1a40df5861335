//! Schema Registry
//!
//! A catalogue of named schemas. Each schema may carry glob file masks so a
//! batch of staged files can be routed to the right contract by file name.
//!
//! Definition files (`*.toml` or `*.json`) are loaded from a single
//! directory in file-name order:
//!
//! ```text
//! schemas/
//! ├── members.toml
//! ├── orders.toml
//! └── staged.json
//! ```

use std::fs;
use std::path::Path;

use glob::{MatchOptions, Pattern};
use tracing::debug;

use crate::error::{Result, ValidatorError};
use crate::schema::{SchemaDefinition, SchemaSpec};

const MASK_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Match a file name (not a path) against a mask, ignoring case
pub fn mask_matches(mask: &Pattern, file_name: &str) -> bool {
    mask.matches_with(file_name, MASK_OPTIONS)
}

/// A schema together with the file masks that select it
#[derive(Debug, Clone)]
pub struct RegisteredSchema {
    pub spec: SchemaSpec,
    masks: Vec<Pattern>,
}

impl RegisteredSchema {
    pub fn masks(&self) -> Vec<&str> {
        self.masks.iter().map(Pattern::as_str).collect()
    }

    /// Whether a file name (not a path) matches any mask
    pub fn matches(&self, file_name: &str) -> bool {
        self.masks.iter().any(|mask| mask_matches(mask, file_name))
    }

    pub fn to_definition(&self) -> SchemaDefinition {
        self.spec
            .to_definition(self.masks().into_iter().map(String::from).collect())
    }
}

/// The main schema registry
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    /// Registration order is resolution order
    schemas: Vec<RegisteredSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every definition file in a directory
    ///
    /// A missing directory yields an empty registry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut registry = Self::new();
        registry.load_directory(path.as_ref())?;
        Ok(registry)
    }

    /// Add a schema; names must be unique
    pub fn register<I, S>(&mut self, spec: SchemaSpec, masks: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.get(spec.name()).is_some() {
            return Err(ValidatorError::DuplicateSchema(spec.name().to_string()));
        }

        let masks = masks
            .into_iter()
            .map(|mask| {
                let mask = mask.as_ref();
                Pattern::new(mask).map_err(|source| ValidatorError::InvalidMask {
                    mask: mask.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(schema = spec.name(), masks = masks.len(), "registered schema");
        self.schemas.push(RegisteredSchema { spec, masks });
        Ok(())
    }

    /// Check and add a schema definition
    pub fn register_definition(&mut self, definition: &SchemaDefinition) -> Result<()> {
        let spec = definition.to_spec()?;
        self.register(spec, &definition.file_masks)
    }

    pub fn get(&self, name: &str) -> Option<&SchemaSpec> {
        self.entry(name).map(|entry| &entry.spec)
    }

    pub fn entry(&self, name: &str) -> Option<&RegisteredSchema> {
        self.schemas.iter().find(|entry| entry.spec.name() == name)
    }

    /// Look up a schema by name, failing if absent
    pub fn require(&self, name: &str) -> Result<&SchemaSpec> {
        self.get(name)
            .ok_or_else(|| ValidatorError::SchemaNotFound(name.to_string()))
    }

    /// First schema whose masks match the path's file name
    pub fn resolve(&self, path: impl AsRef<Path>) -> Option<&SchemaSpec> {
        let file_name = path.as_ref().file_name()?.to_str()?;
        self.schemas
            .iter()
            .find(|entry| entry.matches(file_name))
            .map(|entry| &entry.spec)
    }

    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|entry| entry.spec.name()).collect()
    }

    pub fn entries(&self) -> &[RegisteredSchema] {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn load_directory(&mut self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            debug!(path = %dir.display(), "schema directory not found, registry empty");
            return Ok(());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_definition = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "toml" || ext == "json");
            if path.is_file() && is_definition {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let definition = read_definition(&path)?;
            self.register_definition(&definition)?;
        }

        Ok(())
    }
}

fn read_definition(path: &Path) -> Result<SchemaDefinition> {
    let content = fs::read_to_string(path).map_err(|source| ValidatorError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        toml::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|reason| ValidatorError::InvalidDefinition {
        path: path.to_path_buf(),
        reason,
    })
}
