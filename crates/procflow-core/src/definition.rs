//! Definition parsing, tree construction and validation.
//!
//! Turns a YAML/JSON [`DefinitionDocument`] into the [`ProcessTree`] the
//! executor runs. The registry decides which tags become which typed nodes
//! and which are skipped. After construction, sequence flows are wired into
//! their endpoints and the tree is validated, so the executor only ever sees
//! trees where every scope has one StartEvent and one EndEvent and every
//! reference resolves.

use std::collections::HashSet;
use std::path::Path;

use procflow_types::definition::{DefinitionDocument, ElementDefinition};
use procflow_types::error::DefinitionError;
use procflow_types::node::{EdgeRef, ElementType, FlowData, Node, NodeKind};
use procflow_types::tree::ProcessTree;
use serde_json::Value;

use crate::registry::{NodeRegistry, TagBinding, local_tag};

/// Attribute keys that mark a flow as conditional.
const CONDITIONAL_KEYS: &[&str] = &["conditional", "ti:conditional"];

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a YAML (or JSON) document into a validated process tree.
pub fn parse_definition_yaml(
    yaml: &str,
    registry: &NodeRegistry,
) -> Result<ProcessTree, DefinitionError> {
    let doc: DefinitionDocument =
        serde_yaml_ng::from_str(yaml).map_err(|e| DefinitionError::Parse(e.to_string()))?;
    build_tree(&doc, registry)
}

/// Parse a JSON document into a validated process tree.
pub fn parse_definition_json(
    json: &str,
    registry: &NodeRegistry,
) -> Result<ProcessTree, DefinitionError> {
    let doc: DefinitionDocument =
        serde_json::from_str(json).map_err(|e| DefinitionError::Parse(e.to_string()))?;
    build_tree(&doc, registry)
}

/// Load a definition from a `.json`, `.yaml` or `.yml` file.
pub fn load_definition_file(
    path: &Path,
    registry: &NodeRegistry,
) -> Result<ProcessTree, DefinitionError> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_definition_json(&content, registry),
        _ => parse_definition_yaml(&content, registry),
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Build and validate the tree of the single `process` element of `doc`.
pub fn build_tree(
    doc: &DefinitionDocument,
    registry: &NodeRegistry,
) -> Result<ProcessTree, DefinitionError> {
    let processes: Vec<(usize, &ElementDefinition)> = doc
        .elements
        .iter()
        .enumerate()
        .filter(|(_, e)| {
            matches!(
                registry.resolve(&e.tag),
                Some(TagBinding::Element {
                    element: ElementType::Process,
                    ..
                })
            )
        })
        .collect();

    let (index, process) = match processes.as_slice() {
        [] => return Err(DefinitionError::MissingProcess),
        [single] => *single,
        many => return Err(DefinitionError::MultipleProcesses(many.len())),
    };

    let root_id = element_id(process, "definitions", index)?;
    let root = to_node(process, root_id.clone(), ElementType::Process, None);
    let mut tree = ProcessTree::new(root);
    let mut seen = HashSet::from([root_id.clone()]);

    add_children(&mut tree, &mut seen, process, &root_id, registry)?;
    wire_flows(&mut tree);
    validate_tree(&tree)?;

    tracing::debug!(process = %root_id, nodes = tree.len(), "built process tree");
    Ok(tree)
}

fn add_children(
    tree: &mut ProcessTree,
    seen: &mut HashSet<String>,
    parent: &ElementDefinition,
    parent_id: &str,
    registry: &NodeRegistry,
) -> Result<(), DefinitionError> {
    for (index, child) in parent.children.iter().enumerate() {
        let element = match registry.resolve(&child.tag) {
            Some(TagBinding::Element { element, .. }) => *element,
            Some(TagBinding::Unprocessable) => continue,
            None => return Err(DefinitionError::UnknownTag(child.tag.clone())),
        };

        let id = element_id(child, parent_id, index)?;
        if !seen.insert(id.clone()) {
            return Err(DefinitionError::DuplicateId(id));
        }

        tree.insert(to_node(child, id.clone(), element, Some(parent_id)));
        if element.is_scope() {
            add_children(tree, seen, child, &id, registry)?;
        }
    }
    Ok(())
}

fn element_id(
    element: &ElementDefinition,
    parent: &str,
    index: usize,
) -> Result<String, DefinitionError> {
    element
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DefinitionError::MissingId {
            parent: parent.to_string(),
            index,
        })
}

fn to_node(
    element: &ElementDefinition,
    id: String,
    element_type: ElementType,
    parent_id: Option<&str>,
) -> Node {
    let mut attributes = element.attributes.clone();
    let kind = match element_type {
        ElementType::SequenceFlow => {
            let flags: Vec<Value> = CONDITIONAL_KEYS
                .iter()
                .filter_map(|key| attributes.remove(*key))
                .collect();
            let conditional = flags.iter().any(flag);
            attributes.remove("sourceRef");
            attributes.remove("targetRef");
            NodeKind::SequenceFlow(FlowData {
                source_ref: element.str_attribute("sourceRef").map(str::to_string),
                target_ref: element.str_attribute("targetRef").map(str::to_string),
                conditional,
                ..FlowData::default()
            })
        }
        ElementType::ExclusiveGateway => {
            attributes.remove("default");
            NodeKind::ExclusiveGateway {
                default: element.str_attribute("default").map(str::to_string),
            }
        }
        other => NodeKind::for_element(other),
    };

    let mut node = Node::new(id, local_tag(&element.tag), kind);
    node.name = element.name.clone().filter(|n| !n.is_empty());
    node.parent_id = parent_id.map(str::to_string);
    node.incoming = element.incoming.iter().map(EdgeRef::new).collect();
    node.outgoing = element.outgoing.iter().map(EdgeRef::new).collect();
    node.attributes = attributes;
    node
}

/// Definition flags arrive as booleans, numbers or strings.
fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

/// Append each flow to its source's `outgoing` and its target's `incoming`
/// when the definition left it out.
fn wire_flows(tree: &mut ProcessTree) {
    let flows: Vec<(String, Option<String>, Option<String>)> = tree
        .iter()
        .filter_map(|n| {
            n.flow()
                .map(|f| (n.id.clone(), f.source_ref.clone(), f.target_ref.clone()))
        })
        .collect();

    for (flow_id, source, target) in flows {
        if let Some(node) = source.as_deref().and_then(|id| tree.get_mut(id))
            && !node.has_outgoing(&flow_id)
        {
            node.outgoing.push(EdgeRef::new(flow_id.clone()));
        }
        if let Some(node) = target.as_deref().and_then(|id| tree.get_mut(id))
            && !node.has_incoming(&flow_id)
        {
            node.incoming.push(EdgeRef::new(flow_id.clone()));
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate structural constraints the executor relies on.
///
/// Checks:
/// - Every `incoming`/`outgoing` edge id names a node of the tree
/// - Every present `sourceRef`/`targetRef` names a node of the tree
/// - Each Process/SubProcess has exactly one StartEvent and one EndEvent child
/// - An exclusive gateway's `default` is one of its outgoing flows
///
/// Flows without `sourceRef`/`targetRef` pass; they fail at execution time.
pub fn validate_tree(tree: &ProcessTree) -> Result<(), DefinitionError> {
    for node in tree.iter() {
        for edge in node.incoming.iter().chain(node.outgoing.iter()) {
            if !tree.contains(&edge.id) {
                return Err(DefinitionError::UnknownReference {
                    node: node.id.clone(),
                    reference: edge.id.clone(),
                });
            }
        }

        if let Some(flow) = node.flow() {
            for reference in [&flow.source_ref, &flow.target_ref].into_iter().flatten() {
                if !tree.contains(reference) {
                    return Err(DefinitionError::UnknownReference {
                        node: node.id.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }

        if node.element_type().is_scope() {
            validate_scope(tree, node)?;
        }

        if let Some(default) = node.default_flow() {
            if !node.has_outgoing(default) {
                return Err(DefinitionError::InvalidDefault {
                    gateway: node.id.clone(),
                    flow: default.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn validate_scope(tree: &ProcessTree, scope: &Node) -> Result<(), DefinitionError> {
    let count = |element: ElementType| {
        tree.children(&scope.id)
            .filter(|n| n.element_type() == element)
            .count()
    };

    match count(ElementType::StartEvent) {
        0 => return Err(DefinitionError::MissingStartEvent(scope.id.clone())),
        1 => {}
        _ => return Err(DefinitionError::MultipleStartEvents(scope.id.clone())),
    }
    match count(ElementType::EndEvent) {
        0 => Err(DefinitionError::MissingEndEvent(scope.id.clone())),
        1 => Ok(()),
        _ => Err(DefinitionError::MultipleEndEvents(scope.id.clone())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
