use crate::catalog::ComponentKind;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub const CHILD_PROPERTY: &str = "child";
pub const CHILDREN_PROPERTY: &str = "children";

/// One `components[]` entry on the wire: `{id, weight?, component?: {Kind: props}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComponentEntry {
    pub id: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub component: Option<Map<String, Value>>,
}

impl ComponentEntry {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("component id must not be empty".to_string());
        }

        let Some(definition) = &self.component else {
            return Ok(());
        };

        match definition.iter().next() {
            Some((_, Value::Object(_))) if definition.len() == 1 => Ok(()),
            Some((kind, _)) if definition.len() == 1 => Err(format!(
                "component '{}' has non-object properties for kind '{kind}'",
                self.id
            )),
            _ => Err(format!(
                "component '{}' must name exactly one kind, found {}",
                self.id,
                definition.len()
            )),
        }
    }

    /// Converts a validated entry. Entries without a definition carry nothing
    /// to store.
    pub fn into_raw(self) -> Option<RawComponent> {
        let (kind, properties) = self.component?.into_iter().next()?;
        let Value::Object(properties) = properties else {
            return None;
        };

        Some(RawComponent {
            id: self.id,
            weight: self.weight,
            kind: ComponentKind::from_name(&kind),
            properties,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawComponent {
    pub id: String,
    pub weight: Option<f64>,
    pub kind: ComponentKind,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildrenSpec {
    Explicit(Vec<String>),
    Template(TemplateSpec),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSpec {
    pub component_id: String,
    pub data_binding: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChildrenWire {
    Bare(Vec<String>),
    Explicit {
        #[serde(rename = "explicitList")]
        explicit_list: Vec<String>,
    },
    Template {
        template: TemplateSpec,
    },
}

impl ChildrenSpec {
    pub fn parse(raw: &Value) -> Option<Self> {
        let wire = ChildrenWire::deserialize(raw).ok()?;
        Some(match wire {
            ChildrenWire::Bare(ids) | ChildrenWire::Explicit { explicit_list: ids } => {
                Self::Explicit(ids)
            }
            ChildrenWire::Template { template } => Self::Template(template),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentGraph {
    components: HashMap<String, RawComponent>,
}

impl ComponentGraph {
    /// Replaces any instance with the same id wholesale. Instances not
    /// mentioned are left alone.
    pub fn upsert(&mut self, instances: impl IntoIterator<Item = RawComponent>) -> usize {
        let mut count = 0;
        for instance in instances {
            self.components.insert(instance.id.clone(), instance);
            count += 1;
        }
        count
    }

    pub fn get(&self, id: &str) -> Option<&RawComponent> {
        self.components.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(raw: Value) -> ComponentEntry {
        serde_json::from_value(raw).expect("component entry")
    }

    fn raw(raw: Value) -> RawComponent {
        entry(raw).into_raw().expect("raw component")
    }

    #[test]
    fn entry_converts_to_raw_component() {
        let component = raw(json!({
            "id": "txt",
            "weight": 2,
            "component": {"Text": {"text": {"path": "/msg"}}}
        }));

        assert_eq!(component.id, "txt");
        assert_eq!(component.weight, Some(2.0));
        assert_eq!(component.kind, ComponentKind::Text);
        assert_eq!(component.properties["text"], json!({"path": "/msg"}));
    }

    #[test]
    fn entry_validation_requires_one_object_kind() {
        assert!(entry(json!({"id": "a", "component": {"Text": {}}})).validate().is_ok());
        assert!(entry(json!({"id": "a"})).validate().is_ok());
        assert!(entry(json!({"id": "", "component": {"Text": {}}})).validate().is_err());
        assert!(entry(json!({"id": "a", "component": {}})).validate().is_err());
        assert!(
            entry(json!({"id": "a", "component": {"Text": {}, "Row": {}}}))
                .validate()
                .is_err()
        );
        assert!(entry(json!({"id": "a", "component": {"Text": "x"}})).validate().is_err());
    }

    #[test]
    fn entry_without_definition_stores_nothing() {
        assert!(entry(json!({"id": "a"})).into_raw().is_none());
    }

    #[test]
    fn children_accept_every_wire_form() {
        assert_eq!(
            ChildrenSpec::parse(&json!({"explicitList": ["a", "b"]})),
            Some(ChildrenSpec::Explicit(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            ChildrenSpec::parse(&json!(["a"])),
            Some(ChildrenSpec::Explicit(vec!["a".into()]))
        );
        assert_eq!(
            ChildrenSpec::parse(&json!({"template": {"componentId": "row", "dataBinding": "/items"}})),
            Some(ChildrenSpec::Template(TemplateSpec {
                component_id: "row".into(),
                data_binding: "/items".into(),
            }))
        );
        assert_eq!(ChildrenSpec::parse(&json!({"template": {"componentId": "row"}})), None);
        assert_eq!(ChildrenSpec::parse(&json!("a")), None);
    }

    #[test]
    fn upsert_overwrites_whole_instances() {
        let mut graph = ComponentGraph::default();
        graph.upsert([
            raw(json!({"id": "a", "component": {"Text": {"text": "one", "hint": "h1"}}})),
            raw(json!({"id": "b", "component": {"Divider": {}}})),
        ]);
        graph.upsert([raw(json!({"id": "a", "component": {"Text": {"text": "two"}}}))]);

        assert_eq!(graph.len(), 2);
        let a = graph.get("a").expect("a");
        assert_eq!(a.properties.get("text"), Some(&json!("two")));
        assert!(a.properties.get("hint").is_none());
        assert!(graph.contains("b"));
    }
}
