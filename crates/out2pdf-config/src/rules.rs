use out2pdf_engine::{ClassDef, OperationRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Rule tables shipped with the crate.
pub const DEFAULT_RULES: &str = include_str!("../rules/default.toml");

/// Display name used in errors for the bundled rule tables.
const BUNDLED_ORIGIN: &str = "<bundled rules>";

/// Contents of a rule file: one entry per document class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassDef>,
}

impl RuleFile {
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::RulesParseError {
            rules_path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load_from_path<P: AsRef<Path>>(rules_path: P) -> Result<Self, ConfigError> {
        let rules_path = rules_path.as_ref();
        let content =
            std::fs::read_to_string(rules_path).map_err(|source| ConfigError::RulesReadError {
                rules_path: rules_path.to_path_buf(),
                source,
            })?;
        Self::parse(&content, rules_path)
    }

    pub fn bundled() -> Result<Self, ConfigError> {
        Self::parse(DEFAULT_RULES, Path::new(BUNDLED_ORIGIN))
    }

    /// Compiles every class into a registry.
    pub fn build_registry(&self, origin: &Path) -> Result<OperationRegistry, ConfigError> {
        OperationRegistry::build(&self.classes).map_err(|source| ConfigError::InvalidRules {
            rules_path: origin.to_path_buf(),
            source,
        })
    }

    /// Loads rules from `rules_path`, or the bundled rules when `None`.
    pub fn load_registry(rules_path: Option<&Path>) -> Result<OperationRegistry, ConfigError> {
        match rules_path {
            Some(path) => Self::load_from_path(path)?.build_registry(path),
            None => Self::bundled()?.build_registry(Path::new(BUNDLED_ORIGIN)),
        }
    }
}
