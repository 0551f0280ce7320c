//! Plain-text outline of a resolved tree, one line per node. Each kind's line
//! comes from a renderer looked up in a [`RendererRegistry`].

use crate::catalog::{ComponentKind, RendererRegistry};
use crate::resolver::{ResolvedNode, ResolvedValue};
use serde_json::Value;

pub trait OutlineRenderer: Send {
    fn line(&self, node: &ResolvedNode) -> String;
}

/// `Kind#id`, for kinds with nothing worth summarizing.
pub struct KindOnly;

/// `Kind#id "value"`, quoting one property's resolved value.
pub struct PropertyLabel(pub &'static str);

impl OutlineRenderer for KindOnly {
    fn line(&self, node: &ResolvedNode) -> String {
        format!("{}#{}", node.kind.name(), node.id)
    }
}

impl OutlineRenderer for PropertyLabel {
    fn line(&self, node: &ResolvedNode) -> String {
        match node.data(self.0) {
            Some(Value::String(text)) => format!("{}#{} {text:?}", node.kind.name(), node.id),
            Some(Value::Null) | None => KindOnly.line(node),
            Some(other) => format!("{}#{} {other}", node.kind.name(), node.id),
        }
    }
}

pub fn default_outline_registry() -> RendererRegistry<dyn OutlineRenderer> {
    let mut registry: RendererRegistry<dyn OutlineRenderer> = RendererRegistry::default();

    let labelled = [
        (ComponentKind::Text, "text"),
        (ComponentKind::Image, "url"),
        (ComponentKind::Video, "url"),
        (ComponentKind::AudioPlayer, "url"),
        (ComponentKind::Icon, "name"),
        (ComponentKind::TextField, "label"),
        (ComponentKind::CheckBox, "label"),
        (ComponentKind::Slider, "value"),
        (ComponentKind::DateTimeInput, "value"),
    ];
    for (kind, property) in labelled {
        registry.register(kind.name(), Box::new(PropertyLabel(property)));
    }

    registry.set_fallback(Box::new(KindOnly));
    registry
}

pub fn render_outline(root: &ResolvedNode, registry: &RendererRegistry<dyn OutlineRenderer>) -> String {
    let mut out = String::new();
    write_node(&mut out, root, registry, 0);
    out
}

fn write_node(
    out: &mut String,
    node: &ResolvedNode,
    registry: &RendererRegistry<dyn OutlineRenderer>,
    depth: usize,
) {
    let line = match registry.lookup(&node.kind) {
        Some(renderer) => renderer.line(node),
        None => KindOnly.line(node),
    };

    for _ in 0..depth {
        out.push_str("  ");
    }
    if let Some(slot) = &node.slot_name {
        out.push_str(slot);
        out.push_str(": ");
    }
    out.push_str(&line);
    out.push('\n');

    for value in node.properties.values() {
        write_value(out, value, registry, depth + 1);
    }
}

fn write_value(
    out: &mut String,
    value: &ResolvedValue,
    registry: &RendererRegistry<dyn OutlineRenderer>,
    depth: usize,
) {
    match value {
        ResolvedValue::Node(node) => write_node(out, node, registry, depth),
        ResolvedValue::Children(nodes) => {
            for node in nodes {
                write_node(out, node, registry, depth);
            }
        }
        ResolvedValue::List(items) => {
            for item in items {
                write_value(out, item, registry, depth);
            }
        }
        ResolvedValue::Map(fields) => {
            for field in fields.values() {
                write_value(out, field, registry, depth);
            }
        }
        ResolvedValue::Data(_) | ResolvedValue::Action(_) => {}
    }
}
