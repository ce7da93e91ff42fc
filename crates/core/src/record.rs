use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// One row of a read-query result. Columns keep the order the SELECT
/// produced them in; the result shaper's first-column and single-column
/// checks depend on that order surviving.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn first(&self) -> Option<(&str, &Value)> {
        self.fields.first().map(|(name, value)| (name.as_str(), value))
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    /// Column lookup returning the value as display text, skipping nulls.
    pub fn get_text(&self, column: &str) -> Option<String> {
        self.get(column).filter(|value| !value.is_null()).map(display_value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Deterministic one-line rendering: `col: value | col: value | ...`.
    pub fn flatten(&self) -> String {
        self.fields
            .iter()
            .map(|(name, value)| format!("{name}: {}", display_value(value)))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Scalar rendering without JSON quoting, so flattened rows read as text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
