//! # Operation Registry
//!
//! Immutable rule tables, one per document class.
//!
//! ## Architecture
//!
//! Rules arrive as plain data ([`ClassDef`] / [`OperationDef`], usually
//! deserialized from TOML) and are compiled exactly once by
//! [`OperationRegistry::build`]:
//! - every pattern is compiled to a [`Regex`]
//! - every operation name and its parameters are resolved to an
//!   [`OperationKind`] variant, so no name lookup happens per match
//!
//! ## Rule Order
//!
//! The order of operations inside a [`DocumentClassTable`] is part of its
//! contract. Later operations run on line text already rewritten by earlier
//! ones, so reordering a table changes its output.
//!
//! The registry holds no per-document state and is `Send + Sync`; a single
//! instance can serve any number of concurrent annotation calls.

mod def;

pub use def::{ClassDef, OperationDef};

use std::collections::BTreeMap;

use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Document class '{class}': invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        class: String,
        pattern: String,
        source: regex::Error,
    },
    #[error("Document class '{class}': unknown operation '{op}'")]
    UnknownOperation { class: String, op: String },
    #[error(
        "Document class '{class}': operation '{op}' expects {expected} parameter(s), got {got}"
    )]
    WrongParameterCount {
        class: String,
        op: String,
        expected: &'static str,
        got: usize,
    },
    #[error("Document class '{0}' is defined more than once")]
    DuplicateClass(String),
    #[error("Unknown document class '{0}'")]
    UnknownClass(String),
}

/// What to do with each match of an operation's pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    /// Substitute the match with a literal text. No annotation.
    Replace(String),
    /// Keep the match (or substitute a replacement) and highlight it.
    InvertColors(Option<String>),
    /// Erase the match and mark the whole line as removed.
    RemoveLine,
    /// Erase the match and start a new page before the line.
    NewPage,
    /// Keep the match (or substitute a replacement) and underline it.
    Underline(Option<String>),
    /// Keep the match (or substitute a replacement) in a large font.
    LargeFont(Option<String>),
}

impl OperationKind {
    /// Resolves an operation name and its parameter list to a variant.
    pub fn resolve(class: &str, op: &str, params: &[String]) -> Result<Self, ConfigError> {
        let arity = |expected: &'static str, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::WrongParameterCount {
                    class: class.to_string(),
                    op: op.to_string(),
                    expected,
                    got: params.len(),
                })
            }
        };
        let optional = || params.first().cloned();

        match op {
            "replace" => {
                arity("1", params.len() == 1)?;
                Ok(Self::Replace(params[0].clone()))
            }
            "invert_colors" => {
                arity("0 or 1", params.len() <= 1)?;
                Ok(Self::InvertColors(optional()))
            }
            "replace_invert_colors" => {
                arity("1", params.len() == 1)?;
                Ok(Self::InvertColors(optional()))
            }
            "remove_line" => {
                arity("0", params.is_empty())?;
                Ok(Self::RemoveLine)
            }
            "new_page" | "newpage" => {
                arity("0", params.is_empty())?;
                Ok(Self::NewPage)
            }
            "underline" => {
                arity("0 or 1", params.len() <= 1)?;
                Ok(Self::Underline(optional()))
            }
            "large_font" => {
                arity("0 or 1", params.len() <= 1)?;
                Ok(Self::LargeFont(optional()))
            }
            _ => Err(ConfigError::UnknownOperation {
                class: class.to_string(),
                op: op.to_string(),
            }),
        }
    }
}

/// A compiled rule: every match of `pattern` is handled according to `kind`.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub pattern: Regex,
    pub kind: OperationKind,
}

impl OperationSpec {
    pub fn new(pattern: &str, kind: OperationKind) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            kind,
        })
    }
}

/// Ordered rule list for one document class.
#[derive(Debug, Clone)]
pub struct DocumentClassTable {
    key: String,
    operations: Vec<OperationSpec>,
}

impl DocumentClassTable {
    pub fn new(key: impl Into<String>, operations: Vec<OperationSpec>) -> Self {
        Self {
            key: key.into(),
            operations,
        }
    }

    fn compile(def: &ClassDef) -> Result<Self, ConfigError> {
        let operations = def
            .rules
            .iter()
            .map(|rule| {
                let pattern =
                    Regex::new(&rule.pattern).map_err(|source| ConfigError::InvalidPattern {
                        class: def.key.clone(),
                        pattern: rule.pattern.clone(),
                        source,
                    })?;
                let kind = OperationKind::resolve(&def.key, &rule.op, &rule.params)?;
                Ok(OperationSpec { pattern, kind })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self::new(def.key.clone(), operations))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Operations in application order.
    pub fn operations(&self) -> &[OperationSpec] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// All document class tables known to the process.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    classes: BTreeMap<String, DocumentClassTable>,
}

impl OperationRegistry {
    /// Compiles every class definition. Fails on the first bad rule.
    pub fn build(defs: &[ClassDef]) -> Result<Self, ConfigError> {
        let mut classes = BTreeMap::new();
        for def in defs {
            if classes.contains_key(&def.key) {
                return Err(ConfigError::DuplicateClass(def.key.clone()));
            }
            let table = DocumentClassTable::compile(def)?;
            log::debug!(
                "compiled document class '{}' with {} operation(s)",
                table.key(),
                table.len()
            );
            classes.insert(def.key.clone(), table);
        }
        Ok(Self { classes })
    }

    pub fn table(&self, key: &str) -> Result<&DocumentClassTable, ConfigError> {
        self.classes
            .get(key)
            .ok_or_else(|| ConfigError::UnknownClass(key.to_string()))
    }

    /// Class keys in sorted order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
