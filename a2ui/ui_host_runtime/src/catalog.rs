//! Known component kinds and the swappable kind → renderer table.

use serde::{Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Text,
    Image,
    Icon,
    Video,
    AudioPlayer,
    Row,
    Column,
    List,
    Card,
    Tabs,
    Divider,
    Modal,
    Button,
    CheckBox,
    TextField,
    DateTimeInput,
    MultipleChoice,
    Slider,
    /// Any kind outside the catalog. Its properties pass through resolution
    /// untouched apart from bindings and child references.
    Custom(String),
}

const NO_SLOTS: &[&str] = &[];
const MODAL_SLOTS: &[&str] = &["entryPointChild", "contentChild"];

impl ComponentKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Text" => Self::Text,
            "Image" => Self::Image,
            "Icon" => Self::Icon,
            "Video" => Self::Video,
            "AudioPlayer" => Self::AudioPlayer,
            "Row" => Self::Row,
            "Column" => Self::Column,
            "List" => Self::List,
            "Card" => Self::Card,
            "Tabs" => Self::Tabs,
            "Divider" => Self::Divider,
            "Modal" => Self::Modal,
            "Button" => Self::Button,
            "CheckBox" => Self::CheckBox,
            "TextField" => Self::TextField,
            "DateTimeInput" => Self::DateTimeInput,
            "MultipleChoice" => Self::MultipleChoice,
            "Slider" => Self::Slider,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Text => "Text",
            Self::Image => "Image",
            Self::Icon => "Icon",
            Self::Video => "Video",
            Self::AudioPlayer => "AudioPlayer",
            Self::Row => "Row",
            Self::Column => "Column",
            Self::List => "List",
            Self::Card => "Card",
            Self::Tabs => "Tabs",
            Self::Divider => "Divider",
            Self::Modal => "Modal",
            Self::Button => "Button",
            Self::CheckBox => "CheckBox",
            Self::TextField => "TextField",
            Self::DateTimeInput => "DateTimeInput",
            Self::MultipleChoice => "MultipleChoice",
            Self::Slider => "Slider",
            Self::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Kind-specific properties, besides `child` and `children`, that hold a
    /// single component id.
    pub fn child_slots(&self) -> &'static [&'static str] {
        match self {
            Self::Modal => MODAL_SLOTS,
            _ => NO_SLOTS,
        }
    }
}

impl Serialize for ComponentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Maps kind names to renderer implementations. New kinds are registered
/// here; the resolver never needs to know about them.
pub struct RendererRegistry<R: ?Sized> {
    renderers: HashMap<String, Box<R>>,
    fallback: Option<Box<R>>,
}

impl<R: ?Sized> Default for RendererRegistry<R> {
    fn default() -> Self {
        Self {
            renderers: HashMap::new(),
            fallback: None,
        }
    }
}

impl<R: ?Sized> RendererRegistry<R> {
    pub fn register(&mut self, kind: impl Into<String>, renderer: Box<R>) -> Option<Box<R>> {
        self.renderers.insert(kind.into(), renderer)
    }

    pub fn set_fallback(&mut self, renderer: Box<R>) {
        self.fallback = Some(renderer);
    }

    pub fn contains(&self, kind: &ComponentKind) -> bool {
        self.renderers.contains_key(kind.name())
    }

    /// Finds the renderer registered for `kind`, or the fallback.
    pub fn lookup(&self, kind: &ComponentKind) -> Option<&R> {
        self.renderers
            .get(kind.name())
            .or(self.fallback.as_ref())
            .map(|renderer| &**renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_the_catalog() {
        for name in ["Text", "Column", "MultipleChoice", "DateTimeInput", "Modal"] {
            let kind = ComponentKind::from_name(name);
            assert!(!kind.is_custom(), "{name} should be known");
            assert_eq!(kind.name(), name);
        }
    }

    #[test]
    fn unknown_names_become_custom() {
        let kind = ComponentKind::from_name("OrgChart");
        assert_eq!(kind, ComponentKind::Custom("OrgChart".to_string()));
        assert_eq!(kind.name(), "OrgChart");
        assert_eq!(serde_json::to_value(&kind).expect("serialize"), "OrgChart");
    }

    #[test]
    fn modal_declares_its_slots() {
        assert_eq!(
            ComponentKind::Modal.child_slots(),
            &["entryPointChild", "contentChild"]
        );
        assert!(ComponentKind::Card.child_slots().is_empty());
    }

    #[test]
    fn registry_prefers_exact_kind_then_fallback() {
        let mut registry: RendererRegistry<str> = RendererRegistry::default();
        assert!(registry.lookup(&ComponentKind::Text).is_none());

        registry.register("Text", Box::from("text"));
        registry.set_fallback(Box::from("generic"));

        assert!(registry.contains(&ComponentKind::Text));
        assert_eq!(registry.lookup(&ComponentKind::Text), Some("text"));
        assert_eq!(
            registry.lookup(&ComponentKind::from_name("Chart")),
            Some("generic")
        );
    }
}
