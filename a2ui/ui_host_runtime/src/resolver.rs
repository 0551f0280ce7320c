use crate::action::{ACTION_PROPERTY, Action};
use crate::binding::BoundValue;
use crate::catalog::ComponentKind;
use crate::component::{
    CHILD_PROPERTY, CHILDREN_PROPERTY, ChildrenSpec, ComponentGraph, RawComponent, TemplateSpec,
};
use crate::data_model::DataModel;
use crate::error::ResolveError;
use crate::path::{self, resolve_path};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub data_context_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_name: Option<String>,
    pub properties: BTreeMap<String, ResolvedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    Data(Value),
    Node(Box<ResolvedNode>),
    Children(Vec<ResolvedNode>),
    List(Vec<ResolvedValue>),
    Map(BTreeMap<String, ResolvedValue>),
    Action(Action),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTree {
    pub root: ResolvedNode,
    pub diagnostics: Vec<ResolveError>,
}

impl ResolvedNode {
    pub fn property(&self, name: &str) -> Option<&ResolvedValue> {
        self.properties.get(name)
    }

    pub fn data(&self, name: &str) -> Option<&Value> {
        match self.property(name)? {
            ResolvedValue::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn child(&self) -> Option<&ResolvedNode> {
        match self.property(CHILD_PROPERTY)? {
            ResolvedValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn children(&self) -> &[ResolvedNode] {
        match self.property(CHILDREN_PROPERTY) {
            Some(ResolvedValue::Children(nodes)) => nodes,
            _ => &[],
        }
    }

    pub fn action(&self) -> Option<&Action> {
        match self.property(ACTION_PROPERTY)? {
            ResolvedValue::Action(action) => Some(action),
            _ => None,
        }
    }

    /// Depth-first search for a node by id, optionally pinned to a data
    /// context (template instances share an id).
    pub fn find(&self, id: &str, context_path: Option<&str>) -> Option<&ResolvedNode> {
        let context_matches =
            context_path.is_none_or(|context| path::normalize(context) == self.data_context_path);
        if self.id == id && context_matches {
            return Some(self);
        }

        self.properties
            .values()
            .find_map(|value| value.find(id, context_path))
    }
}

impl ResolvedValue {
    fn find(&self, id: &str, context_path: Option<&str>) -> Option<&ResolvedNode> {
        match self {
            Self::Node(node) => node.find(id, context_path),
            Self::Children(nodes) => nodes.iter().find_map(|node| node.find(id, context_path)),
            Self::List(items) => items.iter().find_map(|item| item.find(id, context_path)),
            Self::Map(fields) => fields.values().find_map(|field| field.find(id, context_path)),
            Self::Data(_) | Self::Action(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            _ => None,
        }
    }
}

/// Nesting levels (nodes plus nested property containers) below the root.
pub const MAX_RESOLVE_DEPTH: usize = 128;

pub const MAX_RESOLVED_NODES: usize = 10_000;

/// Walks one surface. `on_path` holds the ids on the current recursion path,
/// which is what the cycle guard checks against.
pub struct TreeResolver<'a> {
    surface_id: &'a str,
    graph: &'a ComponentGraph,
    data: &'a DataModel,
    on_path: HashSet<&'a str>,
    depth: usize,
    max_depth: usize,
    resolved: usize,
    max_nodes: usize,
    budget_reported: bool,
    diagnostics: Vec<ResolveError>,
}

impl<'a> TreeResolver<'a> {
    pub fn new(surface_id: &'a str, graph: &'a ComponentGraph, data: &'a DataModel) -> Self {
        Self {
            surface_id,
            graph,
            data,
            on_path: HashSet::new(),
            depth: 0,
            max_depth: MAX_RESOLVE_DEPTH,
            resolved: 0,
            max_nodes: MAX_RESOLVED_NODES,
            budget_reported: false,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_limits(mut self, max_depth: usize, max_nodes: usize) -> Self {
        self.max_depth = max_depth;
        self.max_nodes = max_nodes;
        self
    }

    pub fn resolve_tree(
        mut self,
        node_id: &str,
        context_path: &str,
    ) -> Result<ResolvedTree, ResolveError> {
        let context = path::normalize(context_path);
        let root = self.resolve_node(node_id, &context, None, self.surface_id)?;
        Ok(ResolvedTree {
            root,
            diagnostics: self.diagnostics,
        })
    }

    fn resolve_node(
        &mut self,
        node_id: &str,
        context_path: &str,
        slot_name: Option<&str>,
        referenced_by: &str,
    ) -> Result<ResolvedNode, ResolveError> {
        let graph = self.graph;
        let raw = graph
            .get(node_id)
            .ok_or_else(|| ResolveError::DanglingReference {
                id: node_id.to_string(),
                referenced_by: referenced_by.to_string(),
            })?;

        if self.on_path.contains(raw.id.as_str()) {
            return Err(ResolveError::CyclicGraph {
                id: node_id.to_string(),
            });
        }
        if self.depth >= self.max_depth {
            return Err(ResolveError::DepthExceeded {
                id: node_id.to_string(),
                limit: self.max_depth,
            });
        }
        if self.resolved >= self.max_nodes {
            return Err(ResolveError::BudgetExceeded {
                id: node_id.to_string(),
                limit: self.max_nodes,
            });
        }

        self.resolved += 1;
        self.depth += 1;
        self.on_path.insert(raw.id.as_str());
        let properties = self.resolve_properties(raw, context_path);
        self.on_path.remove(raw.id.as_str());
        self.depth -= 1;

        Ok(ResolvedNode {
            id: raw.id.clone(),
            kind: raw.kind.clone(),
            weight: raw.weight,
            data_context_path: context_path.to_string(),
            slot_name: slot_name.map(str::to_string),
            properties,
        })
    }

    fn resolve_properties(
        &mut self,
        raw: &'a RawComponent,
        context_path: &str,
    ) -> BTreeMap<String, ResolvedValue> {
        let mut resolved = BTreeMap::new();
        let slots = raw.kind.child_slots();

        for (key, value) in &raw.properties {
            let entry = match (key.as_str(), value) {
                (CHILDREN_PROPERTY, _) => match ChildrenSpec::parse(value) {
                    Some(spec) => Some(ResolvedValue::Children(self.resolve_children(
                        &spec,
                        context_path,
                        &raw.id,
                    ))),
                    None => Some(self.resolve_value(value, context_path, &raw.id)),
                },
                (CHILD_PROPERTY, Value::String(child_id)) => {
                    self.resolve_slot(child_id, context_path, key, &raw.id)
                }
                (slot, Value::String(child_id)) if slots.contains(&slot) => {
                    self.resolve_slot(child_id, context_path, key, &raw.id)
                }
                (ACTION_PROPERTY, _) => Some(match Action::from_value(value) {
                    Some(action) => ResolvedValue::Action(action),
                    None => self.resolve_value(value, context_path, &raw.id),
                }),
                _ => Some(self.resolve_value(value, context_path, &raw.id)),
            };

            if let Some(entry) = entry {
                resolved.insert(key.clone(), entry);
            }
        }

        resolved
    }

    fn resolve_slot(
        &mut self,
        child_id: &str,
        context_path: &str,
        slot_name: &str,
        owner_id: &str,
    ) -> Option<ResolvedValue> {
        self.resolve_or_record(child_id, context_path, Some(slot_name), owner_id)
            .map(|node| ResolvedValue::Node(Box::new(node)))
    }

    fn resolve_children(
        &mut self,
        spec: &ChildrenSpec,
        context_path: &str,
        owner_id: &str,
    ) -> Vec<ResolvedNode> {
        match spec {
            ChildrenSpec::Explicit(ids) => ids
                .iter()
                .filter_map(|id| self.resolve_or_record(id, context_path, None, owner_id))
                .collect(),
            ChildrenSpec::Template(template) => {
                self.expand_template(template, context_path, owner_id)
            }
        }
    }

    /// One child per element of the bound sequence, each under the element's
    /// own path. Anything other than a sequence expands to nothing.
    fn expand_template(
        &mut self,
        template: &TemplateSpec,
        context_path: &str,
        owner_id: &str,
    ) -> Vec<ResolvedNode> {
        let binding = resolve_path(&template.data_binding, Some(context_path));
        let count = match self.data.lookup(&binding) {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        };

        (0..count)
            .filter_map(|index| {
                let item_context = path::join(&binding, &index.to_string());
                self.resolve_or_record(&template.component_id, &item_context, None, owner_id)
            })
            .collect()
    }

    fn resolve_or_record(
        &mut self,
        child_id: &str,
        context_path: &str,
        slot_name: Option<&str>,
        owner_id: &str,
    ) -> Option<ResolvedNode> {
        match self.resolve_node(child_id, context_path, slot_name, owner_id) {
            Ok(node) => Some(node),
            Err(err) => {
                self.record(err);
                None
            }
        }
    }

    // An exhausted budget is reported once, not once per skipped child.
    fn record(&mut self, err: ResolveError) {
        if matches!(err, ResolveError::BudgetExceeded { .. }) {
            if self.budget_reported {
                return;
            }
            self.budget_reported = true;
        }

        warn!(surface = self.surface_id, %err, "omitting unresolvable child");
        self.diagnostics.push(err);
    }

    /// Resolves bindings inside an arbitrary property value. Nested objects
    /// may carry their own `child` reference (e.g. tab items).
    fn resolve_value(&mut self, value: &Value, context_path: &str, owner_id: &str) -> ResolvedValue {
        if let Some(bound) = BoundValue::from_value(value) {
            return ResolvedValue::Data(bound.resolve(self.data, context_path));
        }
        if !value.is_array() && !value.is_object() {
            return ResolvedValue::Data(value.clone());
        }
        if self.depth >= self.max_depth {
            self.record(ResolveError::DepthExceeded {
                id: owner_id.to_string(),
                limit: self.max_depth,
            });
            return ResolvedValue::Data(Value::Null);
        }

        self.depth += 1;
        let resolved = match value {
            Value::Array(items) => {
                let resolved: Vec<ResolvedValue> = items
                    .iter()
                    .map(|item| self.resolve_value(item, context_path, owner_id))
                    .collect();
                collapse_list(resolved)
            }
            Value::Object(fields) => {
                let mut resolved = BTreeMap::new();
                for (key, field) in fields {
                    let entry = match (key.as_str(), field) {
                        (CHILD_PROPERTY, Value::String(child_id)) => {
                            self.resolve_slot(child_id, context_path, key, owner_id)
                        }
                        _ => Some(self.resolve_value(field, context_path, owner_id)),
                    };
                    if let Some(entry) = entry {
                        resolved.insert(key.clone(), entry);
                    }
                }
                collapse_map(resolved)
            }
            literal => ResolvedValue::Data(literal.clone()),
        };
        self.depth -= 1;
        resolved
    }
}

fn collapse_list(items: Vec<ResolvedValue>) -> ResolvedValue {
    if items.iter().all(|item| item.as_data().is_some()) {
        let values = items
            .into_iter()
            .filter_map(|item| match item {
                ResolvedValue::Data(value) => Some(value),
                _ => None,
            })
            .collect();
        ResolvedValue::Data(Value::Array(values))
    } else {
        ResolvedValue::List(items)
    }
}

fn collapse_map(fields: BTreeMap<String, ResolvedValue>) -> ResolvedValue {
    if fields.values().all(|field| field.as_data().is_some()) {
        let values = fields
            .into_iter()
            .filter_map(|(key, field)| match field {
                ResolvedValue::Data(value) => Some((key, value)),
                _ => None,
            })
            .collect();
        ResolvedValue::Data(Value::Object(values))
    } else {
        ResolvedValue::Map(fields)
    }
}
