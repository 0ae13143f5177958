//! Process definition documents.
//!
//! A definition is an element tree mirroring BPMN markup: each element has a
//! tag, an id, optional `incoming`/`outgoing` edge ids and nested `children`.
//! Any other attribute (`sourceRef`, `targetRef`, `default`, `conditional`,
//! vendor extensions) is kept in `attributes`.
//!
//! ```yaml
//! elements:
//!   - tag: process
//!     id: Process_1
//!     children:
//!       - { tag: startEvent, id: start, outgoing: [f1] }
//!       - { tag: sequenceFlow, id: f1, sourceRef: start, targetRef: end }
//!       - { tag: endEvent, id: end, incoming: [f1] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level definition document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Top-level elements; exactly one must be a `process`.
    #[serde(default)]
    pub elements: Vec<ElementDefinition>,
}

/// One element of the definition tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementDefinition {
    /// Element tag, optionally namespaced (`bpmn:task`).
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incoming: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outgoing: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementDefinition>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ElementDefinition {
    pub fn new(tag: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Tag with any `prefix:` namespace removed.
    pub fn local_tag(&self) -> &str {
        self.tag.rsplit(':').next().unwrap_or(&self.tag)
    }

    /// String attribute, ignoring blanks.
    pub fn str_attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
