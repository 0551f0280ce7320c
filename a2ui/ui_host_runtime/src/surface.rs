//! Surface lifecycle: `Absent -> Active` on first reference, `Active -> Absent`
//! on deletion. Every mutation bumps the surface version and marks it dirty.

use crate::component::ComponentGraph;
use crate::data_model::DataModel;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const DEFAULT_SURFACE_ID: &str = "@default";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Surface {
    pub root_component_id: Option<String>,
    pub data_model: DataModel,
    pub components: ComponentGraph,
    pub styles: BTreeMap<String, String>,
    pub version: u64,
}

#[derive(Debug, Clone)]
pub struct SurfaceRegistry {
    surfaces: BTreeMap<String, Surface>,
    default_surface_id: String,
    dirty: BTreeSet<String>,
    deleted: BTreeSet<String>,
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::with_default_surface(DEFAULT_SURFACE_ID)
    }
}

impl SurfaceRegistry {
    pub fn with_default_surface(default_surface_id: impl Into<String>) -> Self {
        Self {
            surfaces: BTreeMap::new(),
            default_surface_id: default_surface_id.into(),
            dirty: BTreeSet::new(),
            deleted: BTreeSet::new(),
        }
    }

    pub fn default_surface_id(&self) -> &str {
        &self.default_surface_id
    }

    pub fn surface_id<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(self.default_surface_id.as_str())
    }

    pub fn surfaces(&self) -> &BTreeMap<String, Surface> {
        &self.surfaces
    }

    pub fn get(&self, surface_id: &str) -> Option<&Surface> {
        self.surfaces.get(surface_id)
    }

    pub fn create_or_get(&mut self, surface_id: &str) -> &mut Surface {
        if !self.surfaces.contains_key(surface_id) {
            debug!(surface = surface_id, "surface created");
        }

        self.surfaces.entry(surface_id.to_string()).or_default()
    }

    /// Creates the surface if needed, then records a mutation on it.
    pub fn mutate(&mut self, surface_id: &str) -> &mut Surface {
        self.create_or_get(surface_id);
        self.mark_dirty(surface_id);
        self.create_or_get(surface_id)
    }

    /// Records a mutation on an existing surface. Unknown ids are ignored.
    pub fn mark_dirty(&mut self, surface_id: &str) {
        if let Some(surface) = self.surfaces.get_mut(surface_id) {
            surface.version = surface.version.wrapping_add(1);
            self.dirty.insert(surface_id.to_string());
        }
    }

    pub fn delete(&mut self, surface_id: &str) -> bool {
        self.dirty.remove(surface_id);

        if self.surfaces.remove(surface_id).is_some() {
            debug!(surface = surface_id, "surface deleted");
            self.deleted.insert(surface_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.dirty.clear();
        let removed = std::mem::take(&mut self.surfaces);
        self.deleted.extend(removed.into_keys());
    }

    pub fn is_dirty(&self, surface_id: &str) -> bool {
        self.dirty.contains(surface_id)
    }

    /// Drains surfaces mutated since the last call, in id order.
    pub fn take_dirty(&mut self) -> Vec<String> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    pub fn take_deleted(&mut self) -> Vec<String> {
        std::mem::take(&mut self.deleted).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_an_idempotent_upsert() {
        let mut registry = SurfaceRegistry::default();
        registry.create_or_get("a").root_component_id = Some("root".to_string());
        registry.create_or_get("a");

        assert_eq!(registry.surfaces().len(), 1);
        assert_eq!(
            registry.get("a").and_then(|s| s.root_component_id.as_deref()),
            Some("root")
        );
        assert!(!registry.is_dirty("a"));
    }

    #[test]
    fn mutations_bump_version_and_mark_dirty() {
        let mut registry = SurfaceRegistry::default();
        registry.mutate("b");
        registry.mutate("a");
        registry.mutate("a");

        assert_eq!(registry.get("a").map(|s| s.version), Some(2));
        assert_eq!(registry.take_dirty(), vec!["a".to_string(), "b".to_string()]);
        assert!(registry.take_dirty().is_empty());
    }

    #[test]
    fn mark_dirty_only_touches_existing_surfaces() {
        let mut registry = SurfaceRegistry::default();
        registry.mark_dirty("ghost");
        assert!(registry.get("ghost").is_none());
        assert!(!registry.is_dirty("ghost"));

        registry.create_or_get("a");
        registry.mark_dirty("a");
        assert_eq!(registry.get("a").map(|s| s.version), Some(1));
        assert!(registry.is_dirty("a"));
    }

    #[test]
    fn delete_discards_state_and_reports_once() {
        let mut registry = SurfaceRegistry::default();
        registry.mutate("a");

        assert!(registry.delete("a"));
        assert!(!registry.delete("a"));
        assert!(registry.get("a").is_none());
        assert!(registry.take_dirty().is_empty());
        assert_eq!(registry.take_deleted(), vec!["a".to_string()]);
        assert!(registry.take_deleted().is_empty());
    }

    #[test]
    fn clear_deletes_every_surface() {
        let mut registry = SurfaceRegistry::default();
        registry.mutate("a");
        registry.mutate("b");
        registry.clear();

        assert!(registry.surfaces().is_empty());
        assert_eq!(registry.take_deleted().len(), 2);
    }

    #[test]
    fn omitted_ids_use_the_default_surface() {
        let registry = SurfaceRegistry::with_default_surface("main");
        assert_eq!(registry.surface_id(None), "main");
        assert_eq!(registry.surface_id(Some("x")), "x");
    }
}
