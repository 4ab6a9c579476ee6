use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rule file: ordered named rules plus an optional fallback value.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RulesConfig {
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub default: Option<String>,
}

impl RulesConfig {
    /// Load from a YAML, JSON or TOML file; the format follows the extension.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// One rule, given either as expression text or as a condition tree.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    pub name: String,
    #[serde(default)]
    pub expr: Option<String>,
    #[serde(default)]
    pub condition: Option<serde_json::Value>,
    /// Value reported on a first-match evaluation; defaults to the name.
    #[serde(default)]
    pub value: Option<String>,
}
