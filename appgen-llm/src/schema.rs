//! # JSON Schemas for structured output
//!
//! Turns Rust types into the JSON schema a model is asked to fill in, and
//! pulls JSON back out of free-form model text.

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;

use crate::provider::ToolDefinition;

/// JSON schema for `T`, with every subschema inlined so it can be used
/// directly as function-call parameters.
pub fn parameters_for<T: JsonSchema>() -> serde_json::Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();

    let mut value = serde_json::to_value(root).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.remove("definitions");
    }
    value
}

/// A function tool whose arguments are an instance of `T`.
pub fn tool_for<T: JsonSchema>(description: impl Into<String>) -> ToolDefinition {
    ToolDefinition::new(T::schema_name(), description).with_parameters(parameters_for::<T>())
}

/// Extract the JSON payload from model text (handles markdown fences).
pub fn extract_json(content: &str) -> &str {
    if content.contains("```json") {
        content
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(content)
    } else if content.contains("```") {
        content
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .unwrap_or(content)
    } else {
        content.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Inner {
        path: String,
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Outer {
        /// Name of the thing
        name: String,
        items: Vec<Inner>,
    }

    #[test]
    fn test_parameters_are_inlined() {
        let params = parameters_for::<Outer>();

        assert_eq!(params["type"], "object");
        assert!(params.get("$schema").is_none());
        assert!(params.get("definitions").is_none());
        assert_eq!(params["properties"]["name"]["description"], "Name of the thing");
        assert_eq!(params["properties"]["items"]["items"]["properties"]["path"]["type"], "string");

        let required: Vec<&str> = params["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"name"));
        assert!(required.contains(&"items"));
    }

    #[test]
    fn test_tool_is_named_after_type() {
        let tool = tool_for::<Outer>("fill it in");
        assert_eq!(tool.name, "Outer");
        assert_eq!(tool.description, "fill it in");
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("here:\n```\n[1]\n```\nbye"), "[1]");
        assert_eq!(extract_json("  {\"a\": 1}  "), "{\"a\": 1}");
    }
}
