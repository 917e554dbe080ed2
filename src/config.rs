//! Configuration from `qail-mql.toml`.
//!
//! ```toml
//! [schema]
//! path = "schemas/events.json"
//!
//! [transpiler]
//! collection = "events"
//! date_spelling = "newdate"
//! restore_numbers = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MqlError, MqlResult};
use crate::schema::DocumentSchema;
use crate::session::Transpiler;
use crate::transpiler::{DateStyle, GeneratorConfig};

/// Project-local config file name.
pub const CONFIG_FILE: &str = "qail-mql.toml";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqlConfig {
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub transpiler: TranspilerConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Schema JSON file. Relative paths resolve against the config file.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranspilerConfig {
    /// Overrides the collection named by the schema.
    pub collection: Option<String>,
    pub date_spelling: DateStyle,
    pub restore_numbers: bool,
}

impl Default for TranspilerConfig {
    fn default() -> Self {
        let generator = GeneratorConfig::default();
        Self {
            collection: None,
            date_spelling: generator.date_style,
            restore_numbers: generator.restore_numbers,
        }
    }
}

impl MqlConfig {
    /// Parse TOML text.
    pub fn from_toml(text: &str) -> MqlResult<Self> {
        toml::from_str(text).map_err(|e| MqlError::Config(e.to_string()))
    }

    /// Read a config file. Relative schema paths are rebased onto the
    /// file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> MqlResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| MqlError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_toml(&text)?;
        if let (Some(schema), Some(dir)) = (config.schema.path.as_mut(), path.parent()) {
            if schema.is_relative() {
                *schema = dir.join(&*schema);
            }
        }
        Ok(config)
    }

    /// `./qail-mql.toml`, else `<config dir>/qail-mql/config.toml`, else
    /// defaults.
    pub fn load() -> MqlResult<Self> {
        match Self::locate() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    fn locate() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("qail-mql").join("config.toml"))
            .filter(|p| p.is_file())
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            date_style: self.transpiler.date_spelling,
            restore_numbers: self.transpiler.restore_numbers,
        }
    }

    /// Load the configured schema and build a session from it.
    pub fn transpiler(&self) -> MqlResult<Transpiler> {
        let schema = match &self.schema.path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|e| MqlError::Config(format!("{}: {}", path.display(), e)))?;
                DocumentSchema::from_json(&text)?
            }
            None => DocumentSchema::default(),
        };
        let mut session = Transpiler::new(&schema)?.with_config(self.generator_config());
        if let Some(collection) = &self.transpiler.collection {
            session = session.with_collection(collection.clone());
        }
        Ok(session)
    }
}
