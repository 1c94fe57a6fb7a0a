mod rules;

pub use rules::{DEFAULT_RULES, RuleFile};

use out2pdf_engine::{AnnotateOptions, LatexOptions, NestedMatchPolicy, OperationRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read rules file at {rules_path}: {source}")]
    RulesReadError {
        rules_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse rules file at {rules_path}: {source}")]
    RulesParseError {
        rules_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid rules in {rules_path}: {source}")]
    InvalidRules {
        rules_path: PathBuf,
        source: out2pdf_engine::ConfigError,
    },
}

/// How the external document compiler is run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// XeLaTeX executable.
    pub command: String,
    /// Directory for auxiliary files (`-aux-directory`, MiKTeX only).
    pub aux_dir: Option<PathBuf>,
    /// Package manager used to install missing packages, e.g. `mpm`.
    /// Package checks are skipped when unset.
    pub package_manager: Option<String>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            command: "xelatex".to_string(),
            aux_dir: None,
            package_manager: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rule file replacing the bundled rule tables.
    pub rules_path: Option<PathBuf>,
    /// Fail when a rule matches inside text an earlier rule already annotated.
    pub reject_nested_matches: bool,
    /// Encoding label for reports that are not valid UTF-8.
    pub fallback_encoding: String,
    pub compiler: CompilerSettings,
    pub latex: LatexOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_path: None,
            reject_nested_matches: false,
            fallback_encoding: "windows-1251".to_string(),
            compiler: CompilerSettings::default(),
            latex: LatexOptions::default(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded paths
        config.rules_path = config
            .rules_path
            .map(|p| Self::expand_path(&p).unwrap_or(p));
        config.compiler.aux_dir = config
            .compiler
            .aux_dir
            .map(|p| Self::expand_path(&p).unwrap_or(p));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/out2pdf");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn annotate_options(&self) -> AnnotateOptions {
        AnnotateOptions {
            nested_matches: if self.reject_nested_matches {
                NestedMatchPolicy::Reject
            } else {
                NestedMatchPolicy::Trust
            },
        }
    }

    /// Compiles the configured rule tables, or the bundled ones.
    pub fn load_registry(&self) -> Result<OperationRegistry, ConfigError> {
        RuleFile::load_registry(self.rules_path.as_deref())
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/out2pdf/config.toml"));
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.compiler.command, "xelatex");
        assert_eq!(config.fallback_encoding, "windows-1251");
        assert_eq!(config.latex.mono_font, "Lucida Console");
        assert_eq!(config.annotate_options(), AnnotateOptions::default());
    }

    #[test]
    fn test_reject_nested_matches_option() {
        let config: Config = toml::from_str("reject_nested_matches = true").unwrap();

        assert_eq!(
            config.annotate_options().nested_matches,
            NestedMatchPolicy::Reject
        );
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            rules_path: Some(PathBuf::from("/tmp/rules.toml")),
            reject_nested_matches: true,
            fallback_encoding: "koi8-r".into(),
            compiler: CompilerSettings {
                command: "/usr/bin/xelatex".into(),
                aux_dir: Some(PathBuf::from("/tmp/aux")),
                package_manager: Some("mpm".into()),
            },
            latex: LatexOptions {
                mono_font: "DejaVu Sans Mono".into(),
                footer_font_size: 10,
            },
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "rules_path = [").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_rules_path_with_env_var() {
        unsafe {
            env::set_var("OUT2PDF_RULES_ROOT", "/custom/rules");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "rules_path = \"$OUT2PDF_RULES_ROOT/b737.toml\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(
            config.rules_path,
            Some(PathBuf::from("/custom/rules/b737.toml"))
        );

        unsafe {
            env::remove_var("OUT2PDF_RULES_ROOT");
        }
    }

    #[test]
    fn test_load_registry_uses_configured_rules() {
        let temp_dir = TempDir::new().unwrap();
        let rules_file = temp_dir.path().join("rules.toml");
        std::fs::write(
            &rules_file,
            "[[class]]\nkey = \"only\"\n[[class.rule]]\npattern = \"X\"\nop = \"underline\"\n",
        )
        .unwrap();
        let config = Config {
            rules_path: Some(rules_file),
            ..Config::default()
        };

        let registry = config.load_registry().unwrap();

        assert_eq!(registry.classes().collect::<Vec<_>>(), vec!["only"]);
    }
}
