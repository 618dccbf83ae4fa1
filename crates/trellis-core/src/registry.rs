use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Presentation metadata for one observed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Text shown to the user while the node is active.
    #[serde(alias = "actionText")]
    pub display_text: String,
    /// Human-readable node label; the emitter name is used when absent.
    #[serde(default, alias = "formattedName", skip_serializing_if = "Option::is_none")]
    pub formatted_name: Option<String>,
    /// Marks the outermost graph boundary.
    #[serde(default, rename = "top_level", alias = "isGraphNode")]
    pub is_top_level: bool,
    /// Marks the node whose streamed content is the user-facing answer.
    #[serde(default, rename = "final_output", alias = "isFinalOutput")]
    pub is_final_output: bool,
}

impl NodeMetadata {
    pub fn new(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            formatted_name: None,
            is_top_level: false,
            is_final_output: false,
        }
    }

    pub fn top_level(mut self) -> Self {
        self.is_top_level = true;
        self
    }

    pub fn final_output(mut self) -> Self {
        self.is_final_output = true;
        self
    }

    pub fn with_formatted_name(mut self, name: impl Into<String>) -> Self {
        self.formatted_name = Some(name.into());
        self
    }

    /// Label for this node, falling back to the emitter name.
    pub fn label<'a>(&'a self, emitter: &'a str) -> &'a str {
        self.formatted_name.as_deref().unwrap_or(emitter)
    }
}

/// Declarative registry document, as loaded from YAML or JSON.
#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    nodes: HashMap<String, NodeMetadata>,
}

/// Registry mapping emitter names to the metadata of nodes worth observing.
///
/// Emitters missing from the registry are not tracked: their chain events
/// leave progress untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRegistry {
    nodes: HashMap<String, NodeMetadata>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata for an emitter, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, metadata: NodeMetadata) {
        self.nodes.insert(name.into(), metadata);
    }

    /// Builder-style variant of [`NodeRegistry::register`].
    pub fn with_node(mut self, name: impl Into<String>, metadata: NodeMetadata) -> Self {
        self.register(name, metadata);
        self
    }

    /// Load a registry from a YAML document with a top-level `nodes` map.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let doc: RegistryDocument = serde_yaml::from_str(yaml)?;
        Self::from_document(doc)
    }

    /// Load a registry from a JSON document with a top-level `nodes` map.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let doc: RegistryDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    fn from_document(doc: RegistryDocument) -> Result<Self, RegistryError> {
        let registry = Self { nodes: doc.nodes };
        registry.validate()?;
        Ok(registry)
    }

    /// Check that every registered node has something to display.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if let Some((name, _)) = self
            .nodes
            .iter()
            .find(|(_, meta)| meta.display_text.trim().is_empty())
        {
            return Err(RegistryError::EmptyDisplayText { node: name.clone() });
        }
        let top_level = self.nodes.values().filter(|m| m.is_top_level).count();
        if top_level > 1 {
            tracing::warn!(top_level, "registry declares more than one top-level node");
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&NodeMetadata> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// True if `name` is registered as the top-level graph node.
    pub fn is_top_level(&self, name: &str) -> bool {
        self.get(name).is_some_and(|m| m.is_top_level)
    }

    /// True if `name` is registered as a final-output node.
    pub fn is_final_output(&self, name: &str) -> bool {
        self.get(name).is_some_and(|m| m.is_final_output)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeMetadata)> {
        self.nodes.iter().map(|(name, meta)| (name.as_str(), meta))
    }
}

impl FromIterator<(String, NodeMetadata)> for NodeRegistry {
    fn from_iter<I: IntoIterator<Item = (String, NodeMetadata)>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}
