use crate::binding::BoundValue;
use crate::data_model::DataModel;
use crate::resolver::ResolvedNode;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ACTION_PROPERTY: &str = "action";

/// Action descriptor attached to an interactive component. Context bindings
/// stay unresolved until the action is dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<ActionContextEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionContextEntry {
    pub key: String,
    pub value: BoundValue,
}

/// The event sent back toward the agent when a user triggers an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAction {
    pub action_name: String,
    pub surface_id: String,
    pub source_component_id: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl Action {
    pub fn from_value(raw: &Value) -> Option<Self> {
        Self::deserialize(raw).ok()
    }
}

impl UserAction {
    /// Resolves every context entry against the source node's data context as
    /// the data model stands right now.
    pub fn dispatch(
        action: &Action,
        source: &ResolvedNode,
        surface_id: &str,
        data: &DataModel,
        at: DateTime<Utc>,
    ) -> Self {
        let context = (!action.context.is_empty()).then(|| {
            action
                .context
                .iter()
                .map(|entry| {
                    (
                        entry.key.clone(),
                        entry.value.resolve(data, &source.data_context_path),
                    )
                })
                .collect::<Map<String, Value>>()
        });

        Self {
            action_name: action.name.clone(),
            surface_id: surface_id.to_string(),
            source_component_id: source.id.clone(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            context,
        }
    }
}
