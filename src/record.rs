use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::{error::Error, value::Value};

/// A fetched row, keyed by column name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl crate::ToValue) -> Self {
        self.fields.insert(column.into(), value.to_value());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.fields.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reads a dotted property path. The first segment names a column, the
    /// rest descend into that column's JSON value. Missing paths read as NULL.
    pub fn get_path(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let Some(head) = segments.next() else {
            return Value::Null;
        };

        let Some(value) = self.fields.get(head) else {
            return Value::Null;
        };

        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            return value.clone();
        }

        let Value::Json(json) = value else {
            return Value::Null;
        };

        let mut current = json;
        for segment in rest {
            let next = match current {
                serde_json::Value::Object(map) => map.get(segment),
                serde_json::Value::Array(items) => {
                    segment.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                _ => None,
            };
            match next {
                Some(v) => current = v,
                None => return Value::Null,
            }
        }

        Value::from_json(current)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    /// Builds a record from a JSON object, one column per top-level key.
    pub fn from_json(json: serde_json::Value) -> Result<Self, Error> {
        let serde_json::Value::Object(map) = json else {
            return Err(Error::Deserialize("record must be a JSON object".into()));
        };

        let fields = map
            .into_iter()
            .map(|(k, v)| (k, Value::from_json(&v)))
            .collect();
        Ok(Self { fields })
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(self.to_json()).map_err(|e| Error::Deserialize(e.to_string()))
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
