// ./src/model/function.rs
//! The Function Record (spec §3) — the authoritative, registry-owned
//! description of a catalogued HTTP endpoint.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// HTTP method a Function Record's endpoint is invoked with.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Declared JSON type of a parameter (spec §3 `type ∈ {string, integer,
/// number, boolean, array, object}`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// One entry of a `parameter_schema` mapping (spec §3).
///
/// Invariant enforced by `FunctionRecord::validate`: if `required` is true,
/// `default` may still be present (the spec explicitly allows it, it's just
/// never consulted), and any `enum` values must match `param_type`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterSpec {
    /// Builds a `jsonschema`-compatible JSON Schema fragment for this single
    /// parameter's value (spec §4.5 "Validation... every value must match
    /// its declared type").
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut schema = serde_json::json!({ "type": json_schema_type(self.param_type) });
        if let Some(values) = &self.enum_values {
            schema["enum"] = serde_json::Value::Array(values.clone());
        }
        schema
    }
}

fn json_schema_type(t: ParameterType) -> &'static str {
    match t {
        ParameterType::String => "string",
        ParameterType::Integer => "integer",
        ParameterType::Number => "number",
        ParameterType::Boolean => "boolean",
        ParameterType::Array => "array",
        ParameterType::Object => "object",
    }
}

/// A domain tag. Spec §3 calls `domain` "a closed tag" but enumerates no
/// fixed set; kept as a newtype rather than an enum so a registry deployment
/// can add domains without a crate release (see SPEC_FULL.md §3).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Domain(pub String);

impl Domain {
    pub fn new(s: impl Into<String>) -> Self {
        Domain(s.into())
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authoritative Function Record (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub function_id: String,
    pub name: String,
    pub description: String,
    pub domain: Domain,
    pub endpoint: String,
    pub method: HttpMethod,
    pub parameter_schema: BTreeMap<String, ParameterSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    pub tags: Vec<String>,
    pub popularity_score: f64,
    pub version: u32,
    pub deprecated: bool,
}

impl FunctionRecord {
    /// Checks the invariants spec §3 states: unique parameter keys follow
    /// from `parameter_schema`'s map representation; this checks the
    /// remaining ones explicitly (enum values typed consistently with their
    /// parameter's declared type).
    pub fn validate(&self) -> Result<(), String> {
        if self.function_id.trim().is_empty() {
            return Err("function_id cannot be empty".to_string());
        }
        for (name, spec) in &self.parameter_schema {
            if let Some(values) = &spec.enum_values {
                for v in values {
                    if !value_matches_type(v, spec.param_type) {
                        return Err(format!(
                            "parameter '{name}' declares enum value {v} inconsistent with type {:?}",
                            spec.param_type
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Builds a single JSON Schema document covering the whole
    /// `parameter_schema`, used by the synthesiser and the retry executor to
    /// validate a candidate argument map in one pass.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.parameter_schema {
            properties.insert(name.clone(), spec.to_json_schema());
            if spec.required {
                required.push(serde_json::Value::String(name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": serde_json::Value::Object(properties),
            "required": required,
        })
    }
}

fn value_matches_type(v: &serde_json::Value, t: ParameterType) -> bool {
    match t {
        ParameterType::String => v.is_string(),
        ParameterType::Integer => v.is_i64() || v.is_u64(),
        ParameterType::Number => v.is_number(),
        ParameterType::Boolean => v.is_boolean(),
        ParameterType::Array => v.is_array(),
        ParameterType::Object => v.is_object(),
    }
}

/// Filter used by `RegistryStore::list` (spec §4.1).
#[derive(Clone, Debug, Default)]
pub struct ListFilter {
    pub domain: Option<Domain>,
    pub tags: Vec<String>,
    /// `false` (the default) excludes deprecated records, per spec §4.1
    /// ("deprecated... are excluded from `list` defaults"); `true` includes
    /// them alongside non-deprecated records.
    pub include_deprecated: bool,
}
