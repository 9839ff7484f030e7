//! JSON-schema subset for tool parameters.
//!
//! [`SchemaNode`] serializes to the exact shape the completion service
//! expects in a tool catalog (`type`/`properties`/`required`/`enum`/
//! `default`/`items`) and doubles as the validation boundary: arguments
//! are checked against the declared schema before a handler ever sees
//! them, and declared defaults are filled in for absent properties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node of a tool parameter schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaNode {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl SchemaNode {
    fn bare(kind: &str, description: Option<&str>) -> Self {
        Self {
            kind: kind.to_string(),
            description: description.map(str::to_string),
            properties: None,
            required: None,
            items: None,
            enum_values: None,
            default: None,
        }
    }

    /// Top-level object schema for a tool's arguments.
    pub fn object(
        properties: impl IntoIterator<Item = (&'static str, SchemaNode)>,
        required: &[&str],
    ) -> Self {
        let mut node = Self::bare("object", None);
        node.properties = Some(
            properties
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        );
        node.required = Some(required.iter().map(|s| s.to_string()).collect());
        node
    }

    pub fn string(description: &str) -> Self {
        Self::bare("string", Some(description))
    }

    pub fn number(description: &str) -> Self {
        Self::bare("number", Some(description))
    }

    pub fn boolean(description: &str) -> Self {
        Self::bare("boolean", Some(description))
    }

    pub fn array_of(description: &str, items: SchemaNode) -> Self {
        let mut node = Self::bare("array", Some(description));
        node.items = Some(Box::new(items));
        node
    }

    /// Array without an item-type constraint.
    pub fn array(description: &str) -> Self {
        Self::bare("array", Some(description))
    }

    pub fn any_object(description: &str) -> Self {
        Self::bare("object", Some(description))
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| Value::from(*v)).collect());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Validate `args` against this (object) schema, filling declared
    /// defaults for absent optional properties. Returns a human-readable
    /// description of the first violation found.
    pub fn validate_arguments(&self, args: &mut Value) -> Result<(), String> {
        if self.kind != "object" {
            return Err(format!("schema root must be an object, got '{}'", self.kind));
        }
        let map = args
            .as_object_mut()
            .ok_or_else(|| "arguments must be a JSON object".to_string())?;

        if let Some(props) = &self.properties {
            for (key, prop) in props {
                match map.get(key) {
                    Some(value) => prop.check_value(key, value)?,
                    None => {
                        if let Some(default) = &prop.default {
                            map.insert(key.clone(), default.clone());
                        }
                    }
                }
            }
        }

        if let Some(required) = &self.required {
            for key in required {
                if !map.contains_key(key) {
                    return Err(format!("missing required parameter: {key}"));
                }
            }
        }

        Ok(())
    }

    fn check_value(&self, key: &str, value: &Value) -> Result<(), String> {
        let ok = match self.kind.as_str() {
            "string" => value.is_string(),
            "number" | "integer" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            // Unknown kinds are not enforced.
            _ => true,
        };
        if !ok {
            return Err(format!("parameter '{key}' must be of type {}", self.kind));
        }

        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                return Err(format!(
                    "parameter '{key}' must be one of [{}]",
                    options.join(", ")
                ));
            }
        }

        if let (Some(items), Some(values)) = (&self.items, value.as_array()) {
            for item in values {
                items.check_value(key, item)?;
            }
        }

        Ok(())
    }
}
