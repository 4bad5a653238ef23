//! Bundled JSON templates, addressed by logical path.
use serde_json::Value;

use crate::error::{ Error, Result };

pub const DEFAULT_SETTINGS: &str = "settings/default.json";
pub const KNOWLEDGE_SETTINGS: &str = "settings/knowledge.json";
pub const TOOL_CONFIG_MAPPING: &str = "mappings/tool_config.json";
pub const KNOWLEDGE_MAPPING: &str = "mappings/knowledge.json";
pub const VECTOR_FIELD_MAPPING: &str = "mappings/vector_field.json";

const BUNDLED: &[(&str, &str)] = &[
    (DEFAULT_SETTINGS, include_str!("../resources/settings/default.json")),
    (KNOWLEDGE_SETTINGS, include_str!("../resources/settings/knowledge.json")),
    (TOOL_CONFIG_MAPPING, include_str!("../resources/mappings/tool_config.json")),
    (KNOWLEDGE_MAPPING, include_str!("../resources/mappings/knowledge.json")),
    (VECTOR_FIELD_MAPPING, include_str!("../resources/mappings/vector_field.json")),
];

/// Raw template text for `path`.
pub fn raw(path: &str) -> Result<&'static str> {
    BUNDLED.iter()
        .find(|(name, _)| *name == path)
        .map(|(_, text)| *text)
        .ok_or_else(|| Error::Configuration(format!("bundled resource '{}' not found", path)))
}

/// Loads and parses the template at `path`.
pub fn load(path: &str) -> Result<Value> {
    parse(path, raw(path)?)
}

/// Replaces each `${name}` placeholder with its value, verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("${{{}}}", name), value)
    })
}

pub(crate) fn parse(path: &str, text: &str) -> Result<Value> {
    serde_json
        ::from_str(text)
        .map_err(|e| Error::Configuration(format!("resource '{}' is not valid JSON: {}", path, e)))
}
