//! The message processor: applies inbound batches to the surface registry,
//! resolves surfaces into trees, and carries widget writes back into the data
//! model.
//!
//! Calls are synchronous and run to completion. Hosts that drive the
//! processor from several threads must serialize calls into it.

use crate::action::{Action, UserAction};
use crate::component::ComponentEntry;
use crate::data_model::DataModel;
use crate::error::{DataPathError, MessageError, ResolveError};
use crate::message::{
    BeginRendering, DATA_MODEL_UPDATE, DataModelUpdate, DeleteSurface, ServerMessage,
    SurfaceUpdate,
};
use crate::path::{self, ROOT_PATH};
use crate::resolver::{ResolvedNode, ResolvedTree, TreeResolver};
use crate::surface::{Surface, SurfaceRegistry};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub applied: usize,
    pub skipped: Vec<MessageError>,
}

impl ProcessReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageProcessor {
    registry: SurfaceRegistry,
}

impl MessageProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_surface(default_surface_id: impl Into<String>) -> Self {
        Self {
            registry: SurfaceRegistry::with_default_surface(default_surface_id),
        }
    }

    pub fn default_surface_id(&self) -> &str {
        self.registry.default_surface_id()
    }

    pub fn get_surfaces(&self) -> &BTreeMap<String, Surface> {
        self.registry.surfaces()
    }

    pub fn get_surface(&self, surface_id: Option<&str>) -> Option<&Surface> {
        self.registry.get(self.registry.surface_id(surface_id))
    }

    pub fn clear_surfaces(&mut self) {
        self.registry.clear();
    }

    /// Applies a batch in order. Malformed or unappliable messages are
    /// skipped and reported; the rest of the batch still runs.
    pub fn process_messages(&mut self, messages: &[Value]) -> ProcessReport {
        let mut report = ProcessReport::default();

        for (index, raw) in messages.iter().enumerate() {
            let outcome = ServerMessage::decode(index, raw)
                .and_then(|message| self.apply_message(index, message));

            match outcome {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    warn!(%err, "skipping inbound message");
                    report.skipped.push(err);
                }
            }
        }

        debug!(
            applied = report.applied,
            skipped = report.skipped.len(),
            "processed message batch"
        );
        report
    }

    pub fn apply_message(&mut self, index: usize, message: ServerMessage) -> Result<(), MessageError> {
        match message {
            ServerMessage::BeginRendering(msg) => {
                self.begin_rendering(msg);
                Ok(())
            }
            ServerMessage::SurfaceUpdate(msg) => {
                self.surface_update(msg);
                Ok(())
            }
            ServerMessage::DataModelUpdate(msg) => {
                self.data_model_update(msg)
                    .map_err(|source| MessageError::Apply {
                        index,
                        kind: DATA_MODEL_UPDATE,
                        source,
                    })
            }
            ServerMessage::DeleteSurface(msg) => {
                self.delete_surface(msg);
                Ok(())
            }
        }
    }

    fn begin_rendering(&mut self, msg: BeginRendering) {
        let surface_id = self.owned_surface_id(msg.surface_id.as_deref());
        let surface = self.registry.mutate(&surface_id);
        surface.root_component_id = Some(msg.root);
        if let Some(styles) = msg.styles {
            surface.styles.extend(styles);
        }
    }

    fn surface_update(&mut self, msg: SurfaceUpdate) {
        let surface_id = self.owned_surface_id(msg.surface_id.as_deref());
        let surface = self.registry.mutate(&surface_id);
        let upserted = surface
            .components
            .upsert(msg.components.into_iter().filter_map(ComponentEntry::into_raw));
        debug!(surface = %surface_id, upserted, "components upserted");
    }

    fn data_model_update(&mut self, msg: DataModelUpdate) -> Result<(), DataPathError> {
        let surface_id = self.owned_surface_id(msg.surface_id.as_deref());
        let write = self
            .registry
            .create_or_get(&surface_id)
            .data_model
            .apply_value_maps(msg.path.as_deref(), &msg.contents);

        if write.applied > 0 {
            self.registry.mark_dirty(&surface_id);
        }
        write.result
    }

    fn delete_surface(&mut self, msg: DeleteSurface) {
        let surface_id = self.owned_surface_id(msg.surface_id.as_deref());
        self.registry.delete(&surface_id);
    }

    fn owned_surface_id(&self, requested: Option<&str>) -> String {
        self.registry.surface_id(requested).to_string()
    }

    pub fn resolve_path(&self, path: &str, context_path: Option<&str>) -> String {
        path::resolve_path(path, context_path)
    }

    /// Reads `path` relative to `node`'s data context, or the surface root
    /// when there is no node. Absent surfaces and absent data read as null.
    pub fn get_data(&self, node: Option<&ResolvedNode>, path: &str, surface_id: Option<&str>) -> Value {
        let context = node.map(|node| node.data_context_path.as_str());
        self.get_data_in_context(context, path, surface_id)
    }

    pub fn get_data_in_context(
        &self,
        context_path: Option<&str>,
        path: &str,
        surface_id: Option<&str>,
    ) -> Value {
        match self.get_surface(surface_id) {
            Some(surface) => surface
                .data_model
                .get(&path::resolve_path(path, context_path)),
            None => Value::Null,
        }
    }

    /// Writes a widget edit into the data model using the same path rule as
    /// read-side bindings, then marks the surface dirty.
    pub fn set_data(
        &mut self,
        node: Option<&ResolvedNode>,
        path: &str,
        value: Value,
        surface_id: Option<&str>,
    ) -> Result<(), DataPathError> {
        let context = node.map(|node| node.data_context_path.as_str());
        self.set_data_in_context(context, path, value, surface_id)
    }

    pub fn set_data_in_context(
        &mut self,
        context_path: Option<&str>,
        path: &str,
        value: Value,
        surface_id: Option<&str>,
    ) -> Result<(), DataPathError> {
        let absolute = path::resolve_path(path, context_path);
        let surface_id = self.owned_surface_id(surface_id);
        self.registry
            .create_or_get(&surface_id)
            .data_model
            .set(&absolute, value)
            .inspect_err(|err| warn!(surface = %surface_id, %err, "setData rejected"))?;

        self.registry.mark_dirty(&surface_id);
        Ok(())
    }

    pub fn resolve_surface(&self, surface_id: Option<&str>) -> Result<ResolvedTree, ResolveError> {
        let id = self.registry.surface_id(surface_id);
        let surface = self
            .registry
            .get(id)
            .ok_or_else(|| ResolveError::SurfaceNotFound(id.to_string()))?;
        let root = surface
            .root_component_id
            .as_deref()
            .ok_or_else(|| ResolveError::NoRoot(id.to_string()))?;

        TreeResolver::new(id, &surface.components, &surface.data_model).resolve_tree(root, ROOT_PATH)
    }

    pub fn resolve_component(
        &self,
        surface_id: Option<&str>,
        node_id: &str,
        context_path: Option<&str>,
    ) -> Result<ResolvedTree, ResolveError> {
        let id = self.registry.surface_id(surface_id);
        let surface = self
            .registry
            .get(id)
            .ok_or_else(|| ResolveError::SurfaceNotFound(id.to_string()))?;

        TreeResolver::new(id, &surface.components, &surface.data_model)
            .resolve_tree(node_id, context_path.unwrap_or(ROOT_PATH))
    }

    /// Builds the outbound event for `action` fired from `node`, resolving its
    /// context against the data model as it stands now.
    pub fn build_user_action(
        &self,
        node: &ResolvedNode,
        action: &Action,
        surface_id: Option<&str>,
    ) -> UserAction {
        let id = self.registry.surface_id(surface_id);
        let empty = DataModel::default();
        let data = self
            .registry
            .get(id)
            .map(|surface| &surface.data_model)
            .unwrap_or(&empty);

        UserAction::dispatch(action, node, id, data, Utc::now())
    }

    pub fn is_dirty(&self, surface_id: Option<&str>) -> bool {
        self.registry.is_dirty(self.registry.surface_id(surface_id))
    }

    pub fn take_dirty(&mut self) -> Vec<String> {
        self.registry.take_dirty()
    }

    pub fn take_deleted(&mut self) -> Vec<String> {
        self.registry.take_deleted()
    }
}
