//! Typed access to the loosely-typed argument map of a tool call.
//!
//! Arguments arrive as a JSON object. Every accessor either returns the value
//! with the requested type or fails with [`ModforgeError::InvalidArgumentType`];
//! nothing is ever coerced silently.

use crate::{ModforgeError, ModforgeResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Human-readable JSON type name, matching the tool parameter type tags.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Named arguments of a tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    /// Creates an empty argument map.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds arguments from a JSON value; anything but an object is rejected.
    pub fn from_value(value: Value) -> ModforgeResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(ModforgeError::InvalidArgumentType {
                name: "arguments".into(),
                expected: "object".into(),
                found: json_type_name(&other).into(),
            }),
        }
    }

    /// Adds or replaces an argument, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Adds or replaces an argument.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Raw access. JSON `null` is treated as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// True when the argument is present and not null.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over all arguments.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Mutable iteration, used for placeholder substitution.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.0.iter_mut()
    }

    /// Consumes the arguments into a JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// A required string argument.
    pub fn require_str(&self, name: &str) -> ModforgeResult<&str> {
        self.opt_str(name)?
            .ok_or_else(|| ModforgeError::MissingArgument(name.to_string()))
    }

    /// An optional string argument.
    pub fn opt_str(&self, name: &str) -> ModforgeResult<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(mismatch(name, "string", other)),
        }
    }

    /// An optional boolean argument.
    pub fn opt_bool(&self, name: &str) -> ModforgeResult<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(mismatch(name, "boolean", other)),
        }
    }

    /// An optional numeric argument.
    pub fn opt_f64(&self, name: &str) -> ModforgeResult<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(mismatch(name, "number", other)),
        }
    }

    /// An optional array argument.
    pub fn opt_array(&self, name: &str) -> ModforgeResult<Option<&Vec<Value>>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(mismatch(name, "array", other)),
        }
    }

    /// An optional object argument.
    pub fn opt_object(&self, name: &str) -> ModforgeResult<Option<&Map<String, Value>>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(mismatch(name, "object", other)),
        }
    }

    /// An optional array of strings; non-string elements are a type error.
    pub fn opt_string_list(&self, name: &str) -> ModforgeResult<Vec<String>> {
        let Some(items) = self.opt_array(name)? else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(mismatch(name, "array of strings", other)),
            })
            .collect()
    }
}

impl From<Map<String, Value>> for ToolArguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn mismatch(name: &str, expected: &str, found: &Value) -> ModforgeError {
    ModforgeError::InvalidArgumentType {
        name: name.to_string(),
        expected: expected.to_string(),
        found: json_type_name(found).to_string(),
    }
}
