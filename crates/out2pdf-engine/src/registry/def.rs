use serde::{Deserialize, Serialize};

/// Uncompiled rule as it appears in a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDef {
    pub pattern: String,
    pub op: String,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Uncompiled rule table for one document class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub key: String,
    #[serde(default, rename = "rule")]
    pub rules: Vec<OperationDef>,
}
