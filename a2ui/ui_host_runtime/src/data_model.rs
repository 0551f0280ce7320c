use crate::error::DataPathError;
use crate::message::ValueMap;
use crate::path::{self, ROOT_PATH};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct DataModel {
    root: Value,
}

impl Default for DataModel {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

impl DataModel {
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Borrows the value stored at an absolute path, if any.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut current = &self.root;

        for segment in path::segments(path) {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        Some(current)
    }

    /// Reads the value at `path`. Absent paths and explicit nulls both read as
    /// `Value::Null`.
    pub fn get(&self, path: &str) -> Value {
        self.lookup(path).cloned().unwrap_or(Value::Null)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Writes `value` at an absolute path, creating intermediate mappings.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), DataPathError> {
        let tokens: Vec<&str> = path::segments(path).collect();

        let Some((last, parents)) = tokens.split_last() else {
            self.root = value;
            return Ok(());
        };

        let mut current = &mut self.root;
        for token in parents {
            current = descend_or_create(current, token, path)?;
        }

        if current.is_null() {
            *current = Value::Object(Map::new());
        }

        match current {
            Value::Object(map) => {
                map.insert((*last).to_string(), value);
                Ok(())
            }
            Value::Array(items) => {
                let index = parse_index(last, items.len(), path)?;
                if index == items.len() {
                    items.push(value);
                } else {
                    items[index] = value;
                }
                Ok(())
            }
            _ => Err(DataPathError::NotAContainer {
                path: path.to_string(),
                segment: (*last).to_string(),
            }),
        }
    }

    /// Writes each entry at `base_path/key`, stopping at the first entry that
    /// cannot be stored. Entries before it stay written.
    pub fn apply_value_maps(&mut self, base_path: Option<&str>, entries: &[ValueMap]) -> BatchWrite {
        let base = base_path.unwrap_or(ROOT_PATH);
        let mut applied = 0;

        for entry in entries {
            if let Err(err) = self.set(&path::join(base, &entry.key), entry.to_value()) {
                return BatchWrite {
                    applied,
                    result: Err(err),
                };
            }
            applied += 1;
        }

        BatchWrite {
            applied,
            result: Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWrite {
    pub applied: usize,
    pub result: Result<(), DataPathError>,
}

fn descend_or_create<'a>(
    value: &'a mut Value,
    token: &str,
    path: &str,
) -> Result<&'a mut Value, DataPathError> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }

    match value {
        Value::Object(map) => Ok(map
            .entry(token.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
        Value::Array(items) => {
            let index = parse_index(token, items.len(), path)?;
            if index == items.len() {
                items.push(Value::Object(Map::new()));
            }
            Ok(&mut items[index])
        }
        _ => Err(DataPathError::NotAContainer {
            path: path.to_string(),
            segment: token.to_string(),
        }),
    }
}

fn parse_index(token: &str, max_len: usize, path: &str) -> Result<usize, DataPathError> {
    let index = token
        .parse::<usize>()
        .map_err(|_| DataPathError::InvalidIndex {
            path: path.to_string(),
            segment: token.to_string(),
        })?;

    if index > max_len {
        Err(DataPathError::IndexOutOfBounds {
            path: path.to_string(),
            segment: token.to_string(),
        })
    } else {
        Ok(index)
    }
}
