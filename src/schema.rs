use serde::Serialize;
use serde_json::Value;

use crate::resources;

/// Reserved top-level mapping object that carries the schema version.
pub const META_KEY: &str = "_meta";
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Describes one index owned by the plugin.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct IndexDescriptor {
    /// Stable identifier used by tools to refer to the index.
    pub logical_name: &'static str,
    /// Concrete index name in the cluster.
    pub index_name: &'static str,
    /// Logical path of the bundled settings template.
    pub settings_template: &'static str,
    /// Logical path of the bundled mapping template.
    pub mapping_template: &'static str,
    /// Bumped once per release whenever the mapping template changes. Never decreases.
    pub schema_version: u32,
}

pub const TOOL_CONFIG: IndexDescriptor = IndexDescriptor {
    logical_name: "tool_config",
    index_name: ".plugins-agent-tools-config",
    settings_template: resources::DEFAULT_SETTINGS,
    mapping_template: resources::TOOL_CONFIG_MAPPING,
    schema_version: 1,
};

pub const KNOWLEDGE: IndexDescriptor = IndexDescriptor {
    logical_name: "knowledge",
    index_name: ".plugins-agent-tools-knowledge",
    settings_template: resources::KNOWLEDGE_SETTINGS,
    mapping_template: resources::KNOWLEDGE_MAPPING,
    schema_version: 2,
};

/// Fixed table of every managed index.
pub const CATALOG: &[IndexDescriptor] = &[TOOL_CONFIG, KNOWLEDGE];

pub fn find(logical_name: &str) -> Option<&'static IndexDescriptor> {
    CATALOG.iter().find(|d| d.logical_name == logical_name)
}

/// Schema version persisted in a mapping's `_meta` block.
///
/// `None` (absent or not an integer) orders below every real version.
pub fn stored_schema_version(mapping: &Value) -> Option<u32> {
    mapping
        .get(META_KEY)
        .and_then(|meta| meta.get(SCHEMA_VERSION_KEY))
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}
