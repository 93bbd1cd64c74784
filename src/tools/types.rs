//! Shared tool schema helpers.

use crate::{Error, Result};
use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn schema_any(_: &mut SchemaGenerator) -> Schema {
    true.into()
}

/// Wrapper for arbitrary JSON payloads when a tool input is dynamic.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(schema_with = "schema_any")]
pub struct AnyJson(pub Value);

impl AnyJson {
    pub fn new(value: Value) -> Self {
        Self(value)
    }
}

impl From<Value> for AnyJson {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<AnyJson> for Value {
    fn from(value: AnyJson) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EmptyArgs {}

/// JSON Schema of a tool input type
pub fn input_schema_for<T: JsonSchema>() -> Value {
    schemars::schema_for!(T).into()
}

/// Deserialize tool arguments into the typed input
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    // tools without inputs may be called with null
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| Error::InvalidArgument(format!("Invalid arguments for {}: {}", tool, e)))
}
