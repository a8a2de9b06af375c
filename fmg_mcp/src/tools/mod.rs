//! Tool registry plumbing.
//!
//! Every tool is declared as a [`ToolSpec`] — a name, a description, and a
//! flat list of typed parameters — from which the MCP input schema is
//! generated. Dispatch is a name match inside each domain module; the
//! service tries the modules in order and treats the first hit as
//! authoritative, so tool names must be unique across the registry (the
//! tests enforce this).

pub mod dvm;
pub mod object;
pub mod policy;
pub mod script;
pub mod sdwan;
pub mod system;
pub mod template;

use serde_json::{Map, Value, json};
use std::sync::Arc;

use fmg_api::{FmgClient, FmgError};

/// JSON schema type of one tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
    /// Free-form JSON object (device payloads, policy bodies, ...).
    Object,
    /// Array of objects, used for installation scope lists.
    ObjectArray,
    /// Array of strings (field selections, flags).
    StringArray,
    /// Untyped array, used for FortiManager filter expressions.
    Array,
}

impl ParamKind {
    fn type_name(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Object => "object",
            ParamKind::ObjectArray | ParamKind::StringArray | ParamKind::Array => "array",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl ToolSpec {
    /// Generate the JSON object schema for this tool's input.
    pub fn input_schema(&self) -> Arc<Map<String, Value>> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in self.params {
            let mut prop = Map::new();
            prop.insert(
                "type".to_string(),
                Value::String(param.kind.type_name().to_string()),
            );
            match param.kind {
                ParamKind::StringArray => {
                    prop.insert("items".to_string(), json!({"type": "string"}));
                }
                ParamKind::ObjectArray => {
                    prop.insert("items".to_string(), json!({"type": "object"}));
                }
                _ => {}
            }
            prop.insert(
                "description".to_string(),
                Value::String(param.description.to_string()),
            );
            properties.insert(param.name.to_string(), Value::Object(prop));

            if param.required {
                required.push(Value::String(param.name.to_string()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Arc::new(schema)
    }
}

/// All registered tool specs, in dispatch order.
pub fn all_specs() -> impl Iterator<Item = &'static ToolSpec> {
    system::SPECS
        .iter()
        .chain(dvm::SPECS)
        .chain(policy::SPECS)
        .chain(object::SPECS)
        .chain(script::SPECS)
        .chain(template::SPECS)
        .chain(sdwan::SPECS)
}

/// Route one call to the module owning the tool name. `None` means no
/// module recognizes the name.
pub async fn dispatch(
    client: &FmgClient,
    name: &str,
    args: &Map<String, Value>,
) -> Option<Result<Value, FmgError>> {
    if let Some(result) = system::dispatch(client, name, args).await {
        return Some(result);
    }
    if let Some(result) = dvm::dispatch(client, name, args).await {
        return Some(result);
    }
    if let Some(result) = policy::dispatch(client, name, args).await {
        return Some(result);
    }
    if let Some(result) = object::dispatch(client, name, args).await {
        return Some(result);
    }
    if let Some(result) = script::dispatch(client, name, args).await {
        return Some(result);
    }
    if let Some(result) = template::dispatch(client, name, args).await {
        return Some(result);
    }
    if let Some(result) = sdwan::dispatch(client, name, args).await {
        return Some(result);
    }
    None
}

// ----------------------------------------------------------------------
// Argument extraction helpers
// ----------------------------------------------------------------------

pub(crate) fn require_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, FmgError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| FmgError::Validation(format!("missing required parameter '{key}'")))
}

pub(crate) fn optional_str<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

pub(crate) fn require_i64(args: &Map<String, Value>, key: &str) -> Result<i64, FmgError> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| FmgError::Validation(format!("missing required integer parameter '{key}'")))
}

pub(crate) fn optional_i64(args: &Map<String, Value>, key: &str) -> Option<i64> {
    args.get(key).and_then(Value::as_i64)
}

pub(crate) fn optional_bool(args: &Map<String, Value>, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// The validated ADOM parameter, defaulting to `root`.
pub(crate) fn adom_or_root(args: &Map<String, Value>) -> Result<String, FmgError> {
    fmg_api::validation::validate_adom_name(optional_str(args, "adom").unwrap_or("root"))
}

/// The validated ADOM parameter, required.
pub(crate) fn require_adom(args: &Map<String, Value>) -> Result<String, FmgError> {
    fmg_api::validation::validate_adom_name(require_str(args, "adom")?)
}

pub(crate) fn optional_string_vec(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>, FmgError> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    let items = value.as_array().ok_or_else(|| {
        FmgError::Validation(format!("parameter '{key}' must be an array of strings"))
    })?;
    let mut strings = Vec::with_capacity(items.len());
    for item in items {
        let s = item.as_str().ok_or_else(|| {
            FmgError::Validation(format!("parameter '{key}' must be an array of strings"))
        })?;
        strings.push(s.to_string());
    }
    Ok(Some(strings))
}

/// Installation scope: a non-empty array of `{"name": ..., "vdom": ...}`
/// entries.
pub(crate) fn require_scope(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Vec<Value>, FmgError> {
    let items = args
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            FmgError::Validation(format!("missing required parameter '{key}' (array of objects)"))
        })?;
    if items.is_empty() {
        return Err(FmgError::Validation(format!("parameter '{key}' cannot be empty")));
    }
    for item in items {
        if !item.is_object() {
            return Err(FmgError::Validation(format!(
                "parameter '{key}' entries must be objects"
            )));
        }
    }
    Ok(items.clone())
}

pub(crate) fn require_object(args: &Map<String, Value>, key: &str) -> Result<Value, FmgError> {
    let value = args
        .get(key)
        .ok_or_else(|| FmgError::Validation(format!("missing required parameter '{key}'")))?;
    if !value.is_object() {
        return Err(FmgError::Validation(format!("parameter '{key}' must be an object")));
    }
    Ok(value.clone())
}

pub(crate) fn require_object_map(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Map<String, Value>, FmgError> {
    match require_object(args, key)? {
        Value::Object(map) => Ok(map),
        _ => unreachable!("require_object checked the shape"),
    }
}

pub(crate) fn optional_filter(args: &Map<String, Value>, key: &str) -> Option<Value> {
    args.get(key).filter(|v| v.is_array()).cloned()
}

// ----------------------------------------------------------------------
// Result shaping
// ----------------------------------------------------------------------

/// `{"status": "success", ...}` with one extra field.
pub(crate) fn success_with(key: &str, value: Value) -> Value {
    json!({"status": "success", key: value})
}

/// `{"status": "success", "count": N, "<key>": [...]}` for list results.
pub(crate) fn success_list(key: &str, items: Vec<Value>) -> Value {
    json!({"status": "success", "count": items.len(), key: items})
}

/// Message-only success.
pub(crate) fn success_message(message: impl Into<String>) -> Value {
    json!({"status": "success", "message": message.into()})
}

/// Result for operations that started an asynchronous task: surfaces the
/// task id to monitor with `wait_for_task`.
pub(crate) fn task_started(result: Value, what: &str) -> Value {
    let task_id = result.get("task").cloned().unwrap_or(Value::Null);
    json!({
        "status": "success",
        "task_id": task_id,
        "message": format!("{what} started, monitor with wait_for_task"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tool_names_are_unique() {
        let mut seen = HashSet::new();
        for spec in all_specs() {
            assert!(seen.insert(spec.name), "duplicate tool name: {}", spec.name);
        }
        assert!(seen.len() > 60, "registry unexpectedly small: {}", seen.len());
    }

    #[test]
    fn every_spec_has_description_and_valid_schema() {
        for spec in all_specs() {
            assert!(!spec.description.is_empty(), "{} missing description", spec.name);

            let schema = spec.input_schema();
            assert_eq!(schema["type"], json!("object"), "{}", spec.name);
            let properties = schema["properties"].as_object().expect("properties object");
            assert_eq!(properties.len(), spec.params.len(), "{}", spec.name);

            for param in spec.params {
                let prop = properties
                    .get(param.name)
                    .unwrap_or_else(|| panic!("{} missing param {}", spec.name, param.name));
                assert_eq!(prop["type"], json!(param.kind.type_name()));
                assert!(!param.description.is_empty(), "{}.{}", spec.name, param.name);
            }
        }
    }

    #[test]
    fn required_params_are_listed_in_schema() {
        for spec in all_specs() {
            let schema = spec.input_schema();
            let required: Vec<&str> = schema
                .get("required")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            for param in spec.params {
                assert_eq!(
                    required.contains(&param.name),
                    param.required,
                    "{}.{}",
                    spec.name,
                    param.name
                );
            }
        }
    }

    #[test]
    fn argument_helpers_validate_shapes() {
        let mut args = Map::new();
        args.insert("adom".to_string(), json!("prod"));
        args.insert("task_id".to_string(), json!(42));
        args.insert("devices".to_string(), json!([{"name": "fgt-1", "vdom": "root"}]));
        args.insert("fields".to_string(), json!(["name", "ip"]));

        assert_eq!(adom_or_root(&args).unwrap(), "prod");
        assert_eq!(require_i64(&args, "task_id").unwrap(), 42);
        assert_eq!(require_scope(&args, "devices").unwrap().len(), 1);
        assert_eq!(
            optional_string_vec(&args, "fields").unwrap(),
            Some(vec!["name".to_string(), "ip".to_string()])
        );

        let empty = Map::new();
        assert_eq!(adom_or_root(&empty).unwrap(), "root");
        assert!(require_i64(&empty, "task_id").is_err());
        assert!(require_scope(&empty, "devices").is_err());

        let mut bad = Map::new();
        bad.insert("devices".to_string(), json!([]));
        assert!(require_scope(&bad, "devices").is_err());
        bad.insert("devices".to_string(), json!(["not-an-object"]));
        assert!(require_scope(&bad, "devices").is_err());
        bad.insert("adom".to_string(), json!("bad/adom"));
        assert!(adom_or_root(&bad).is_err());
    }

    #[test]
    fn task_started_surfaces_task_id() {
        let result = task_started(json!({"task": 1234}), "installation");
        assert_eq!(result["task_id"], json!(1234));
        assert_eq!(result["status"], json!("success"));

        let result = task_started(json!({}), "installation");
        assert_eq!(result["task_id"], Value::Null);
    }
}
