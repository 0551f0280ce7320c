//! Inbound agent messages and their decoding.
//!
//! Each message is decoded on its own so that one malformed entry never
//! prevents the rest of a batch from being applied.

use crate::component::ComponentEntry;
use crate::error::MessageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

pub const BEGIN_RENDERING: &str = "beginRendering";
pub const SURFACE_UPDATE: &str = "surfaceUpdate";
pub const DATA_MODEL_UPDATE: &str = "dataModelUpdate";
pub const DELETE_SURFACE: &str = "deleteSurface";

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    BeginRendering(BeginRendering),
    SurfaceUpdate(SurfaceUpdate),
    DataModelUpdate(DataModelUpdate),
    DeleteSurface(DeleteSurface),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginRendering {
    #[serde(default)]
    pub surface_id: Option<String>,
    pub root: String,
    #[serde(default)]
    pub styles: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceUpdate {
    #[serde(default)]
    pub surface_id: Option<String>,
    pub components: Vec<ComponentEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModelUpdate {
    #[serde(default)]
    pub surface_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    pub contents: Vec<ValueMap>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSurface {
    #[serde(default)]
    pub surface_id: Option<String>,
}

/// One typed key/value write into a surface's data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueMap {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_number: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_map: Option<Vec<ValueMap>>,
}

impl ServerMessage {
    pub fn decode(index: usize, raw: &Value) -> Result<Self, MessageError> {
        let Value::Object(fields) = raw else {
            return Err(MessageError::NotAnObject { index });
        };

        let mut kinds = fields.iter();
        let (kind, payload) = match (kinds.next(), kinds.next()) {
            (Some(only), None) => only,
            _ => {
                return Err(MessageError::AmbiguousKind {
                    index,
                    found: fields.len(),
                });
            }
        };

        match kind.as_str() {
            BEGIN_RENDERING => {
                decode_payload(index, BEGIN_RENDERING, payload).map(Self::BeginRendering)
            }
            SURFACE_UPDATE => {
                let update: SurfaceUpdate = decode_payload(index, SURFACE_UPDATE, payload)?;
                for entry in &update.components {
                    entry.validate().map_err(|reason| MessageError::Malformed {
                        index,
                        kind: SURFACE_UPDATE,
                        reason,
                    })?;
                }
                Ok(Self::SurfaceUpdate(update))
            }
            DATA_MODEL_UPDATE => {
                let update: DataModelUpdate = decode_payload(index, DATA_MODEL_UPDATE, payload)?;
                for entry in &update.contents {
                    entry.validate().map_err(|reason| MessageError::Malformed {
                        index,
                        kind: DATA_MODEL_UPDATE,
                        reason,
                    })?;
                }
                Ok(Self::DataModelUpdate(update))
            }
            DELETE_SURFACE => {
                decode_payload(index, DELETE_SURFACE, payload).map(Self::DeleteSurface)
            }
            other => Err(MessageError::UnknownKind {
                index,
                kind: other.to_string(),
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::BeginRendering(_) => BEGIN_RENDERING,
            Self::SurfaceUpdate(_) => SURFACE_UPDATE,
            Self::DataModelUpdate(_) => DATA_MODEL_UPDATE,
            Self::DeleteSurface(_) => DELETE_SURFACE,
        }
    }

    pub fn surface_id(&self) -> Option<&str> {
        match self {
            Self::BeginRendering(msg) => msg.surface_id.as_deref(),
            Self::SurfaceUpdate(msg) => msg.surface_id.as_deref(),
            Self::DataModelUpdate(msg) => msg.surface_id.as_deref(),
            Self::DeleteSurface(msg) => msg.surface_id.as_deref(),
        }
    }
}

fn decode_payload<T: DeserializeOwned>(
    index: usize,
    kind: &'static str,
    payload: &Value,
) -> Result<T, MessageError> {
    T::deserialize(payload).map_err(|err| MessageError::Malformed {
        index,
        kind,
        reason: err.to_string(),
    })
}

impl ValueMap {
    /// Checks that exactly one `value*` field is populated, recursively.
    pub fn validate(&self) -> Result<(), String> {
        let populated = [
            self.value_string.is_some(),
            self.value_number.is_some(),
            self.value_boolean.is_some(),
            self.value_map.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count();

        if populated != 1 {
            return Err(format!(
                "value map '{}' must carry exactly one value, found {populated}",
                self.key
            ));
        }

        if let Some(nested) = &self.value_map {
            for entry in nested {
                entry.validate()?;
            }
        }

        Ok(())
    }

    pub fn to_value(&self) -> Value {
        if let Some(text) = &self.value_string {
            return Value::String(text.clone());
        }
        if let Some(number) = &self.value_number {
            return Value::Number(number.clone());
        }
        if let Some(flag) = self.value_boolean {
            return Value::Bool(flag);
        }
        match &self.value_map {
            Some(entries) => nested_value(entries),
            None => Value::Null,
        }
    }
}

/// Builds the value for a nested `valueMap`. Entries keyed exactly `0..n` are
/// stored as a sequence.
fn nested_value(entries: &[ValueMap]) -> Value {
    if let Some(items) = as_sequence(entries) {
        return Value::Array(items);
    }

    Value::Object(
        entries
            .iter()
            .map(|entry| (entry.key.clone(), entry.to_value()))
            .collect(),
    )
}

fn as_sequence(entries: &[ValueMap]) -> Option<Vec<Value>> {
    if entries.is_empty() {
        return None;
    }

    let mut slots: Vec<Option<Value>> = vec![None; entries.len()];
    for entry in entries {
        let index = entry.key.parse::<usize>().ok()?;
        if index.to_string() != entry.key {
            return None;
        }
        let slot = slots.get_mut(index)?;
        if slot.is_some() {
            return None;
        }
        *slot = Some(entry.to_value());
    }

    slots.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_begin_rendering_with_styles() {
        let raw = json!({"beginRendering": {
            "surfaceId": "chat",
            "root": "col",
            "styles": {"primaryColor": "#00f"}
        }});

        match ServerMessage::decode(0, &raw).expect("decode") {
            ServerMessage::BeginRendering(msg) => {
                assert_eq!(msg.surface_id.as_deref(), Some("chat"));
                assert_eq!(msg.root, "col");
                let styles = msg.styles.expect("styles");
                assert_eq!(styles["primaryColor"], "#00f");
            }
            other => panic!("expected beginRendering, got {other:?}"),
        }
    }

    #[test]
    fn surface_id_may_be_omitted() {
        let raw = json!({"deleteSurface": {}});
        let decoded = ServerMessage::decode(0, &raw).expect("decode");
        assert_eq!(decoded.surface_id(), None);
        assert_eq!(decoded.kind(), DELETE_SURFACE);
    }

    #[test]
    fn rejects_non_objects_and_unknown_kinds() {
        assert_eq!(
            ServerMessage::decode(3, &json!("hello")),
            Err(MessageError::NotAnObject { index: 3 })
        );
        assert_eq!(
            ServerMessage::decode(1, &json!({"launchRockets": {}})),
            Err(MessageError::UnknownKind {
                index: 1,
                kind: "launchRockets".to_string()
            })
        );
        assert_eq!(
            ServerMessage::decode(0, &json!({})),
            Err(MessageError::AmbiguousKind { index: 0, found: 0 })
        );
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let err = ServerMessage::decode(2, &json!({"beginRendering": {"surfaceId": "s"}}))
            .expect_err("root is required");
        assert!(matches!(
            err,
            MessageError::Malformed {
                index: 2,
                kind: BEGIN_RENDERING,
                ..
            }
        ));
    }

    #[test]
    fn value_map_with_two_values_is_malformed() {
        let raw = json!({"dataModelUpdate": {
            "contents": [{"key": "x", "valueString": "a", "valueNumber": 1}]
        }});
        let err = ServerMessage::decode(0, &raw).expect_err("two values");
        assert!(matches!(err, MessageError::Malformed { kind: DATA_MODEL_UPDATE, .. }));

        let raw = json!({"dataModelUpdate": {
            "contents": [{"key": "x", "valueMap": [{"key": "y"}]}]
        }});
        assert!(ServerMessage::decode(0, &raw).is_err());
    }

    #[test]
    fn numbers_keep_their_integer_form() {
        let entry: ValueMap =
            serde_json::from_value(json!({"key": "n", "valueNumber": 30})).expect("value map");
        assert_eq!(entry.to_value(), json!(30));

        let entry: ValueMap =
            serde_json::from_value(json!({"key": "n", "valueNumber": 2.5})).expect("value map");
        assert_eq!(entry.to_value(), json!(2.5));
    }

    #[test]
    fn empty_value_map_is_an_empty_mapping() {
        let entry: ValueMap =
            serde_json::from_value(json!({"key": "chips", "valueMap": []})).expect("value map");
        assert_eq!(entry.to_value(), json!({}));
    }
}
