use crate::data_model::DataModel;
use crate::path::resolve_path;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

const BOUND_VALUE_KEYS: [&str; 5] = [
    "path",
    "literalString",
    "literalNumber",
    "literalBoolean",
    "literalArray",
];

/// A property value that is either a data-model path, a typed literal, or a
/// path with a literal fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BoundValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_number: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_boolean: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_array: Option<Vec<Value>>,
}

impl BoundValue {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Recognizes a raw property value shaped like a bound value.
    pub fn from_value(raw: &Value) -> Option<Self> {
        let Value::Object(fields) = raw else {
            return None;
        };

        if fields.is_empty() || !fields.keys().all(|key| BOUND_VALUE_KEYS.contains(&key.as_str()))
        {
            return None;
        }

        Self::deserialize(raw).ok()
    }

    pub fn literal(&self) -> Option<Value> {
        if let Some(text) = &self.literal_string {
            return Some(Value::String(text.clone()));
        }
        if let Some(number) = &self.literal_number {
            return Some(Value::Number(number.clone()));
        }
        if let Some(flag) = self.literal_boolean {
            return Some(Value::Bool(flag));
        }
        self.literal_array.clone().map(Value::Array)
    }

    /// Reads the bound value against `context_path`. A path that holds no
    /// data falls back to the literal, and then to null.
    pub fn resolve(&self, data: &DataModel, context_path: &str) -> Value {
        let bound = self
            .path
            .as_deref()
            .map(|path| data.get(&resolve_path(path, Some(context_path))))
            .unwrap_or(Value::Null);

        if bound.is_null() {
            self.literal().unwrap_or(Value::Null)
        } else {
            bound
        }
    }
}
