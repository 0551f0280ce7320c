//! Stdio host: one reader thread owns the processor and applies inbound
//! frames in order; a writer thread drains a bounded outbound queue.

use crate::catalog::RendererRegistry;
use crate::outline::{OutlineRenderer, default_outline_registry, render_outline};
use crate::processor::MessageProcessor;
use crate::protocol::{
    DEFAULT_INBOUND_FRAME_CAP, HostEnvelope, UiEnvelope, error_envelope, reader_loop,
    ready_envelope, writer_loop,
};
use crate::resolver::ResolvedTree;
use crate::surface::DEFAULT_SURFACE_ID;
use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread;
use tracing::{debug, error, info, warn};

const DEFAULT_OUTBOUND_QUEUE_CAP: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub inbound_frame_cap: usize,
    pub outbound_queue_cap: usize,
    pub default_surface_id: String,
    pub outline: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            inbound_frame_cap: DEFAULT_INBOUND_FRAME_CAP,
            outbound_queue_cap: DEFAULT_OUTBOUND_QUEUE_CAP,
            default_surface_id: DEFAULT_SURFACE_ID.to_string(),
            outline: false,
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; invalid values keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            inbound_frame_cap: parse_capacity(lookup("A2UI_HOST_INBOUND_CAP"))
                .unwrap_or(defaults.inbound_frame_cap),
            outbound_queue_cap: parse_capacity(lookup("A2UI_HOST_OUTBOUND_QUEUE_CAP"))
                .unwrap_or(defaults.outbound_queue_cap),
            default_surface_id: lookup("A2UI_HOST_DEFAULT_SURFACE")
                .filter(|id| !id.is_empty())
                .unwrap_or(defaults.default_surface_id),
            outline: lookup("A2UI_HOST_OUTLINE")
                .map(|raw| matches!(raw.as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.outline),
        }
    }
}

fn parse_capacity(raw: Option<String>) -> Option<usize> {
    raw.and_then(|raw| raw.parse::<usize>().ok())
        .filter(|value| *value > 0)
}

/// Processor plus the last tree rendered for each surface, which widget
/// events are matched against.
pub struct HostSession {
    processor: MessageProcessor,
    rendered: HashMap<String, ResolvedTree>,
    outline: Option<RendererRegistry<dyn OutlineRenderer>>,
}

impl HostSession {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            processor: MessageProcessor::with_default_surface(config.default_surface_id.clone()),
            rendered: HashMap::new(),
            outline: config.outline.then(default_outline_registry),
        }
    }

    pub fn processor(&self) -> &MessageProcessor {
        &self.processor
    }

    pub fn handle(&mut self, envelope: HostEnvelope) -> Vec<UiEnvelope> {
        let mut out = Vec::new();

        match envelope {
            HostEnvelope::Messages { messages } => {
                let report = self.processor.process_messages(&messages);
                for err in report.skipped {
                    out.push(error_envelope(None, "malformed_message", err.to_string()));
                }
            }
            HostEnvelope::SetData {
                surface_id,
                context_path,
                path,
                value,
            } => {
                if let Err(err) = self.processor.set_data_in_context(
                    context_path.as_deref(),
                    &path,
                    value,
                    surface_id.as_deref(),
                ) {
                    out.push(error_envelope(
                        surface_id.as_deref(),
                        "set_data_rejected",
                        err.to_string(),
                    ));
                }
            }
            HostEnvelope::Action {
                surface_id,
                component_id,
                context_path,
            } => out.push(self.dispatch_action(
                surface_id.as_deref(),
                &component_id,
                context_path.as_deref(),
            )),
        }

        self.flush(&mut out);
        out
    }

    fn dispatch_action(
        &self,
        surface_id: Option<&str>,
        component_id: &str,
        context_path: Option<&str>,
    ) -> UiEnvelope {
        let id = surface_id.unwrap_or(self.processor.default_surface_id());

        let Some(node) = self
            .rendered
            .get(id)
            .and_then(|tree| tree.root.find(component_id, context_path))
        else {
            return error_envelope(
                Some(id),
                "unknown_component",
                format!("no rendered component '{component_id}'"),
            );
        };

        match node.action() {
            Some(action) => UiEnvelope::UserAction {
                action: self.processor.build_user_action(node, action, Some(id)),
            },
            None => error_envelope(
                Some(id),
                "no_action",
                format!("component '{component_id}' has no action"),
            ),
        }
    }

    /// Emits deletions, then re-resolves and renders every dirty surface.
    fn flush(&mut self, out: &mut Vec<UiEnvelope>) {
        for surface_id in self.processor.take_deleted() {
            self.rendered.remove(&surface_id);
            out.push(UiEnvelope::Deleted { surface_id });
        }

        for surface_id in self.processor.take_dirty() {
            let version = self
                .processor
                .get_surface(Some(&surface_id))
                .map(|surface| surface.version)
                .unwrap_or_default();

            match self.processor.resolve_surface(Some(&surface_id)) {
                Ok(tree) => {
                    let outline = self
                        .outline
                        .as_ref()
                        .map(|registry| render_outline(&tree.root, registry));
                    out.push(UiEnvelope::Render {
                        surface_id: surface_id.clone(),
                        version,
                        tree: tree.root.clone(),
                        diagnostics: tree.diagnostics.iter().map(ToString::to_string).collect(),
                        outline,
                    });
                    self.rendered.insert(surface_id, tree);
                }
                Err(err) => {
                    debug!(surface = %surface_id, %err, "surface not renderable yet");
                    self.rendered.remove(&surface_id);
                    out.push(error_envelope(
                        Some(&surface_id),
                        "resolve_failed",
                        err.to_string(),
                    ));
                }
            }
        }
    }
}

pub fn run(config: HostConfig) -> io::Result<()> {
    let (tx, rx) = mpsc::sync_channel(config.outbound_queue_cap);

    let writer_handle = thread::spawn(move || {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        writer_loop(&mut writer, rx)
    });

    enqueue(&tx, ready_envelope(), config.outbound_queue_cap);
    info!(
        default_surface = %config.default_surface_id,
        inbound_cap = config.inbound_frame_cap,
        "ui host ready"
    );

    let mut session = HostSession::new(&config);
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let read_result = reader_loop(&mut reader, config.inbound_frame_cap, |envelope| {
        let replies = match envelope {
            Ok(envelope) => session.handle(envelope),
            Err(err) => {
                warn!(%err, "undecodable host envelope");
                vec![error_envelope(None, "decode_error", err.to_string())]
            }
        };

        for reply in replies {
            enqueue(&tx, reply, config.outbound_queue_cap);
        }
    });

    if let Err(err) = &read_result {
        error!(%err, "reader loop terminated with error");
    }

    drop(tx);
    match writer_handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(%err, "writer thread returned error"),
        Err(err) => error!(?err, "writer thread join failed"),
    }

    read_result
}

/// Blocks when the queue is full: render output must not be dropped.
fn enqueue(tx: &SyncSender<UiEnvelope>, envelope: UiEnvelope, queue_capacity: usize) {
    match tx.try_send(envelope) {
        Ok(()) => {}
        Err(TrySendError::Full(envelope)) => {
            debug!(queue_capacity, "outbound queue full; waiting");
            if tx.send(envelope).is_err() {
                error!("failed to enqueue outbound envelope");
            }
        }
        Err(TrySendError::Disconnected(_envelope)) => {
            error!("failed to enqueue outbound envelope: writer gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn messages(batch: Value) -> HostEnvelope {
        HostEnvelope::Messages {
            messages: serde_json::from_value(batch).expect("batch"),
        }
    }

    fn session() -> HostSession {
        HostSession::new(&HostConfig::default())
    }

    fn booking_batch() -> HostEnvelope {
        messages(json!([
            {"beginRendering": {"surfaceId": "booking", "root": "form"}},
            {"surfaceUpdate": {"surfaceId": "booking", "components": [
                {"id": "form", "component": {"Column": {"children": ["party", "submit"]}}},
                {"id": "party", "component": {"Slider": {"value": {"path": "/party"}}}},
                {"id": "submit", "component": {"Button": {"child": "label", "action": {
                    "name": "book",
                    "context": [{"key": "party", "value": {"path": "/party"}}]
                }}}},
                {"id": "label", "component": {"Text": {"text": "Book"}}}
            ]}},
            {"dataModelUpdate": {"surfaceId": "booking", "contents": [{"key": "party", "valueNumber": 2}]}}
        ]))
    }

    #[test]
    fn config_reads_env_with_fallbacks() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("A2UI_HOST_INBOUND_CAP", "2048"),
            ("A2UI_HOST_OUTBOUND_QUEUE_CAP", "0"),
            ("A2UI_HOST_DEFAULT_SURFACE", "main"),
            ("A2UI_HOST_OUTLINE", "true"),
        ]);
        let config = HostConfig::from_lookup(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.inbound_frame_cap, 2048);
        assert_eq!(config.outbound_queue_cap, DEFAULT_OUTBOUND_QUEUE_CAP);
        assert_eq!(config.default_surface_id, "main");
        assert!(config.outline);

        assert_eq!(HostConfig::from_lookup(|_| None), HostConfig::default());
    }

    #[test]
    fn message_batch_renders_each_dirty_surface_once() {
        let mut session = session();
        let out = session.handle(booking_batch());

        assert_eq!(out.len(), 1);
        match &out[0] {
            UiEnvelope::Render {
                surface_id,
                version,
                tree,
                diagnostics,
                outline,
            } => {
                assert_eq!(surface_id, "booking");
                assert_eq!(*version, 3);
                assert_eq!(tree.children().len(), 2);
                assert_eq!(tree.children()[0].data("value"), Some(&json!(2)));
                assert!(diagnostics.is_empty());
                assert!(outline.is_none());
            }
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn malformed_messages_are_reported_alongside_renders() {
        let mut session = session();
        let out = session.handle(messages(json!([
            {"nonsense": {}},
            {"beginRendering": {"surfaceId": "s", "root": "t"}},
            {"surfaceUpdate": {"surfaceId": "s", "components": [{"id": "t", "component": {"Text": {"text": "ok"}}}]}}
        ])));

        assert!(matches!(&out[0], UiEnvelope::Error { code, .. } if code == "malformed_message"));
        assert!(matches!(&out[1], UiEnvelope::Render { surface_id, .. } if surface_id == "s"));
    }

    #[test]
    fn set_data_rerenders_with_the_new_value() {
        let mut session = session();
        session.handle(booking_batch());

        let out = session.handle(HostEnvelope::SetData {
            surface_id: Some("booking".into()),
            context_path: None,
            path: "/party".into(),
            value: json!(6),
        });

        match &out[..] {
            [UiEnvelope::Render { tree, .. }] => {
                assert_eq!(tree.children()[0].data("value"), Some(&json!(6)));
            }
            other => panic!("expected one render, got {other:?}"),
        }
    }

    #[test]
    fn action_emits_user_action_with_live_context() {
        let mut session = session();
        session.handle(booking_batch());
        session.handle(HostEnvelope::SetData {
            surface_id: Some("booking".into()),
            context_path: None,
            path: "party".into(),
            value: json!(5),
        });

        let out = session.handle(HostEnvelope::Action {
            surface_id: Some("booking".into()),
            component_id: "submit".into(),
            context_path: None,
        });

        match &out[..] {
            [UiEnvelope::UserAction { action }] => {
                assert_eq!(action.action_name, "book");
                assert_eq!(action.surface_id, "booking");
                assert_eq!(action.source_component_id, "submit");
                assert_eq!(action.context.as_ref().expect("context")["party"], json!(5));
            }
            other => panic!("expected user action, got {other:?}"),
        }
    }

    #[test]
    fn action_on_unknown_component_is_an_error() {
        let mut session = session();
        session.handle(booking_batch());

        let out = session.handle(HostEnvelope::Action {
            surface_id: Some("booking".into()),
            component_id: "ghost".into(),
            context_path: None,
        });
        assert!(matches!(&out[..], [UiEnvelope::Error { code, .. }] if code == "unknown_component"));

        let out = session.handle(HostEnvelope::Action {
            surface_id: Some("booking".into()),
            component_id: "party".into(),
            context_path: None,
        });
        assert!(matches!(&out[..], [UiEnvelope::Error { code, .. }] if code == "no_action"));
    }

    #[test]
    fn delete_surface_emits_deleted_and_forgets_the_tree() {
        let mut session = session();
        session.handle(booking_batch());

        let out = session.handle(messages(json!([{"deleteSurface": {"surfaceId": "booking"}}])));
        assert_eq!(
            out,
            vec![UiEnvelope::Deleted {
                surface_id: "booking".into()
            }]
        );
        assert!(session.processor().get_surfaces().is_empty());

        let out = session.handle(HostEnvelope::Action {
            surface_id: Some("booking".into()),
            component_id: "submit".into(),
            context_path: None,
        });
        assert!(matches!(&out[..], [UiEnvelope::Error { code, .. }] if code == "unknown_component"));
    }

    #[test]
    fn surfaces_without_a_root_report_resolve_failures() {
        let mut session = session();
        let out = session.handle(messages(json!([
            {"dataModelUpdate": {"surfaceId": "s", "contents": [{"key": "a", "valueString": "x"}]}}
        ])));

        assert!(matches!(&out[..], [UiEnvelope::Error { code, .. }] if code == "resolve_failed"));
    }

    #[test]
    fn outline_is_attached_when_enabled() {
        let config = HostConfig {
            outline: true,
            ..HostConfig::default()
        };
        let mut session = HostSession::new(&config);
        let out = session.handle(booking_batch());

        match &out[..] {
            [UiEnvelope::Render { outline: Some(outline), .. }] => {
                assert!(outline.starts_with("Column#form\n"));
                assert!(outline.contains("Slider#party 2"));
                assert!(outline.contains("child: Text#label \"Book\""));
            }
            other => panic!("expected outlined render, got {other:?}"),
        }
    }
}
