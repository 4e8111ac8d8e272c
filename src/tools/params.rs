//! Parameter types and argument coercion.
//!
//! Every tool parameter is a Rust type implementing [`ToolArg`]. The trait
//! reports the JSON-facing [`ParamType`] (used for tool descriptions) and
//! converts one loosely-typed JSON value into the parameter type. Conversion
//! never substitutes defaults: an unusable value is an error.

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use crate::types::DispatchConfig;

// =============================================================================
// Parameter types
// =============================================================================

/// JSON-facing type of a tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
    List(Box<ParamType>),
    /// Array without duplicate items.
    Set(Box<ParamType>),
    Map(Box<ParamType>),
    /// Structured value decoded through serde, with its generated JSON schema.
    Structured(Value),
    /// Raw JSON, passed through untouched.
    Any,
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Human-readable type name for prompt generation.
    pub fn display_name(&self) -> String {
        match self {
            ParamType::String => "string".to_string(),
            ParamType::Int => "integer".to_string(),
            ParamType::Float => "number".to_string(),
            ParamType::Bool => "boolean".to_string(),
            ParamType::List(inner) | ParamType::Set(inner) => format!("{}[]", inner.display_name()),
            ParamType::Map(inner) => format!("map<string, {}>", inner.display_name()),
            ParamType::Structured(schema) => match schema.get("type").and_then(Value::as_str) {
                Some("array") => "object[]".to_string(),
                _ => "object".to_string(),
            },
            ParamType::Any => "any".to_string(),
            ParamType::Optional(inner) => inner.display_name(),
        }
    }

    /// JSON-schema fragment describing values of this type.
    pub fn json_schema(&self) -> Value {
        match self {
            ParamType::String => json!({"type": "string"}),
            ParamType::Int => json!({"type": "integer"}),
            ParamType::Float => json!({"type": "number"}),
            ParamType::Bool => json!({"type": "boolean"}),
            ParamType::List(inner) => json!({"type": "array", "items": inner.json_schema()}),
            ParamType::Set(inner) => {
                json!({"type": "array", "items": inner.json_schema(), "uniqueItems": true})
            }
            ParamType::Map(inner) => {
                json!({"type": "object", "additionalProperties": inner.json_schema()})
            }
            ParamType::Structured(schema) => schema.clone(),
            ParamType::Any => json!({}),
            ParamType::Optional(inner) => inner.json_schema(),
        }
    }
}

pub(crate) fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
}

impl ParamDef {
    pub fn is_required(&self) -> bool {
        !matches!(self.param_type, ParamType::Optional(_))
    }
}

// =============================================================================
// Coercion
// =============================================================================

/// How strictly JSON values must match the declared parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    /// The JSON type must match exactly.
    #[default]
    Strict,
    /// Numbers and booleans may arrive as strings, integral floats bind to
    /// integers, and scalars bind to string parameters.
    Lenient,
}

impl Coercion {
    pub fn is_lenient(self) -> bool {
        self == Coercion::Lenient
    }
}

impl From<&DispatchConfig> for Coercion {
    fn from(config: &DispatchConfig) -> Self {
        if config.lenient_coercion {
            Coercion::Lenient
        } else {
            Coercion::Strict
        }
    }
}

// =============================================================================
// ToolArg
// =============================================================================

/// A type that can be bound from one JSON argument value.
pub trait ToolArg: Sized {
    fn param_type() -> ParamType;

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String>;
}

/// Wrapper binding (or returning) any serde type as a structured value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Self-contained schema for `T`: subschemas inlined, no `$schema` header.
fn schema_for<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|settings| {
            settings.inline_subschemas = true;
            settings.meta_schema = None;
        })
        .into_generator();
    let root = generator.into_root_schema_for::<T>();
    serde_json::to_value(&root.schema).unwrap_or_else(|_| json!({"type": "object"}))
}

impl<T: DeserializeOwned + JsonSchema> ToolArg for Json<T> {
    fn param_type() -> ParamType {
        ParamType::Structured(schema_for::<T>())
    }

    fn from_arg(value: &Value, _coercion: Coercion) -> Result<Self, String> {
        T::deserialize(value).map(Json).map_err(|e| e.to_string())
    }
}

impl ToolArg for Value {
    fn param_type() -> ParamType {
        ParamType::Any
    }

    fn from_arg(value: &Value, _coercion: Coercion) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl ToolArg for String {
    fn param_type() -> ParamType {
        ParamType::String
    }

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) if coercion.is_lenient() => Ok(n.to_string()),
            Value::Bool(b) if coercion.is_lenient() => Ok(b.to_string()),
            other => Err(format!("expected string, got {}", value_type_name(other))),
        }
    }
}

impl ToolArg for bool {
    fn param_type() -> ParamType {
        ParamType::Bool
    }

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if coercion.is_lenient() => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(true),
                    "false" => Ok(false),
                    _ => Err(format!("expected boolean, got string '{}'", s)),
                }
            }
            other => Err(format!("expected boolean, got {}", value_type_name(other))),
        }
    }
}

fn integer_from(value: &Value, coercion: Coercion) -> Result<i128, String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i as i128)
            } else if let Some(u) = n.as_u64() {
                Ok(u as i128)
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                if coercion.is_lenient() && f.is_finite() && f.fract() == 0.0 {
                    Ok(f as i128)
                } else {
                    Err(format!("expected integer, got {}", n))
                }
            }
        }
        Value::String(s) if coercion.is_lenient() => s
            .trim()
            .parse::<i128>()
            .map_err(|_| format!("expected integer, got string '{}'", s)),
        other => Err(format!("expected integer, got {}", value_type_name(other))),
    }
}

macro_rules! impl_int_arg {
    ($($t:ty),+) => {
        $(
            impl ToolArg for $t {
                fn param_type() -> ParamType {
                    ParamType::Int
                }

                fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
                    let n = integer_from(value, coercion)?;
                    <$t>::try_from(n).map_err(|_| {
                        format!("integer {} out of range for {}", n, stringify!($t))
                    })
                }
            }
        )+
    };
}

impl_int_arg!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

fn float_from(value: &Value, coercion: Coercion) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("expected number, got {}", n)),
        Value::String(s) if coercion.is_lenient() => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("expected number, got string '{}'", s)),
        other => Err(format!("expected number, got {}", value_type_name(other))),
    }
}

impl ToolArg for f64 {
    fn param_type() -> ParamType {
        ParamType::Float
    }

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
        float_from(value, coercion)
    }
}

impl ToolArg for f32 {
    fn param_type() -> ParamType {
        ParamType::Float
    }

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
        let f = float_from(value, coercion)?;
        if f.is_finite() && f.abs() > f32::MAX as f64 {
            return Err(format!("number {} out of range for f32", f));
        }
        Ok(f as f32)
    }
}

impl<T: ToolArg> ToolArg for Option<T> {
    fn param_type() -> ParamType {
        ParamType::Optional(Box::new(T::param_type()))
    }

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_arg(value, coercion).map(Some)
        }
    }
}

impl<T: ToolArg> ToolArg for Vec<T> {
    fn param_type() -> ParamType {
        ParamType::List(Box::new(T::param_type()))
    }

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
        let items = value
            .as_array()
            .ok_or_else(|| format!("expected array, got {}", value_type_name(value)))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| T::from_arg(item, coercion).map_err(|e| format!("at index {}: {}", i, e)))
            .collect()
    }
}

fn unique_items<T: ToolArg, C: Default>(
    value: &Value,
    coercion: Coercion,
    mut insert: impl FnMut(&mut C, T) -> bool,
) -> Result<C, String> {
    let mut set = C::default();
    for (i, item) in Vec::<T>::from_arg(value, coercion)?.into_iter().enumerate() {
        if !insert(&mut set, item) {
            return Err(format!("at index {}: duplicate item", i));
        }
    }
    Ok(set)
}

impl<T: ToolArg + Eq + Hash> ToolArg for HashSet<T> {
    fn param_type() -> ParamType {
        ParamType::Set(Box::new(T::param_type()))
    }

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
        unique_items(value, coercion, HashSet::insert)
    }
}

impl<T: ToolArg + Ord> ToolArg for BTreeSet<T> {
    fn param_type() -> ParamType {
        ParamType::Set(Box::new(T::param_type()))
    }

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
        unique_items(value, coercion, BTreeSet::insert)
    }
}

fn map_entries<T: ToolArg>(
    value: &Value,
    coercion: Coercion,
) -> Result<impl Iterator<Item = Result<(String, T), String>> + '_, String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected object, got {}", value_type_name(value)))?;
    Ok(object.iter().map(move |(k, v)| {
        T::from_arg(v, coercion)
            .map(|t| (k.clone(), t))
            .map_err(|e| format!("at key '{}': {}", k, e))
    }))
}

impl<T: ToolArg> ToolArg for HashMap<String, T> {
    fn param_type() -> ParamType {
        ParamType::Map(Box::new(T::param_type()))
    }

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
        map_entries(value, coercion)?.collect()
    }
}

impl<T: ToolArg> ToolArg for BTreeMap<String, T> {
    fn param_type() -> ParamType {
        ParamType::Map(Box::new(T::param_type()))
    }

    fn from_arg(value: &Value, coercion: Coercion) -> Result<Self, String> {
        map_entries(value, coercion)?.collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const STRICT: Coercion = Coercion::Strict;
    const LENIENT: Coercion = Coercion::Lenient;

    #[derive(Debug, PartialEq, Eq, Hash, Deserialize, JsonSchema)]
    struct Person {
        name: String,
        age: u32,
    }

    #[test]
    fn test_strict_integers() {
        assert_eq!(i64::from_arg(&json!(5), STRICT), Ok(5));
        assert_eq!(u64::from_arg(&json!(u64::MAX), STRICT), Ok(u64::MAX));
        assert!(i64::from_arg(&json!("5"), STRICT).is_err());
        assert!(i64::from_arg(&json!(2.0), STRICT).is_err());
        assert!(i64::from_arg(&Value::Null, STRICT).is_err());
    }

    #[test]
    fn test_integer_range_checked() {
        let err = u8::from_arg(&json!(300), STRICT).unwrap_err();
        assert!(err.contains("out of range for u8"), "{}", err);
        assert!(u32::from_arg(&json!(-1), STRICT).is_err());
    }

    #[test]
    fn test_f32_range_checked() {
        assert_eq!(f32::from_arg(&json!(1.5), STRICT), Ok(1.5));
        assert_eq!(f32::from_arg(&json!(f32::MAX as f64), STRICT), Ok(f32::MAX));

        let err = f32::from_arg(&json!(1e300), STRICT).unwrap_err();
        assert!(err.contains("out of range for f32"), "{}", err);
        assert!(f32::from_arg(&json!("-1e300"), LENIENT).is_err());
    }

    #[test]
    fn test_lenient_numbers_and_bools() {
        assert_eq!(i32::from_arg(&json!(" 42 "), LENIENT), Ok(42));
        assert_eq!(i32::from_arg(&json!(3.0), LENIENT), Ok(3));
        assert!(i32::from_arg(&json!(3.5), LENIENT).is_err());
        assert_eq!(f64::from_arg(&json!("2.5"), LENIENT), Ok(2.5));
        assert_eq!(bool::from_arg(&json!("TRUE"), LENIENT), Ok(true));
        assert!(bool::from_arg(&json!("yes"), LENIENT).is_err());
        assert_eq!(String::from_arg(&json!(7), LENIENT), Ok("7".to_string()));
        assert!(String::from_arg(&json!(7), STRICT).is_err());
    }

    #[test]
    fn test_no_null_substitution() {
        assert!(String::from_arg(&Value::Null, LENIENT).is_err());
        assert!(bool::from_arg(&Value::Null, LENIENT).is_err());
        assert!(Vec::<i64>::from_arg(&Value::Null, STRICT).is_err());
        assert_eq!(Option::<i64>::from_arg(&Value::Null, STRICT), Ok(None));
        assert_eq!(Option::<i64>::from_arg(&json!(1), STRICT), Ok(Some(1)));
    }

    #[test]
    fn test_collections() {
        let v = Vec::<String>::from_arg(&json!(["a", "b"]), STRICT).unwrap();
        assert_eq!(v, vec!["a", "b"]);

        let err = Vec::<i64>::from_arg(&json!([1, "x"]), STRICT).unwrap_err();
        assert_eq!(err, "at index 1: expected integer, got string");

        let m = HashMap::<String, i64>::from_arg(&json!({"p1": 1, "p2": 2}), STRICT).unwrap();
        assert_eq!(m["p2"], 2);

        let err = BTreeMap::<String, bool>::from_arg(&json!({"k": 1}), STRICT).unwrap_err();
        assert!(err.starts_with("at key 'k'"), "{}", err);
    }

    #[test]
    fn test_sets() {
        let tags = BTreeSet::<String>::from_arg(&json!(["b", "a"]), STRICT).unwrap();
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);

        let err = HashSet::<i64>::from_arg(&json!([1, 2, 1]), STRICT).unwrap_err();
        assert_eq!(err, "at index 2: duplicate item");

        let people = HashSet::<Json<Person>>::from_arg(
            &json!([{"name": "Klaus", "age": 42}, {"name": "Peter", "age": 43}]),
            STRICT,
        )
        .unwrap();
        assert_eq!(people.len(), 2);

        assert_eq!(
            <HashSet<u8>>::param_type().json_schema(),
            json!({"type": "array", "items": {"type": "integer"}, "uniqueItems": true})
        );
    }

    #[test]
    fn test_structured_values() {
        let people = Json::<Vec<Person>>::from_arg(
            &json!([{"name": "Klaus", "age": 42}, {"name": "Peter", "age": 43}]),
            STRICT,
        )
        .unwrap()
        .into_inner();
        assert_eq!(people[0], Person { name: "Klaus".into(), age: 42 });
        assert_eq!(people[1].age, 43);

        assert!(Json::<Person>::from_arg(&json!({"name": "Klaus"}), STRICT).is_err());
        assert!(Json::<Person>::from_arg(&Value::Null, STRICT).is_err());
    }

    #[test]
    fn test_structured_schema_lists_fields() {
        let schema = <Json<Person>>::param_type().json_schema();
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["properties"]["name"]["type"], json!("string"));
        assert_eq!(schema["properties"]["age"]["type"], json!("integer"));
        let mut required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        required.sort();
        assert_eq!(required, vec!["age", "name"]);
        assert!(schema.get("$schema").is_none());

        let list = <Vec<Json<Person>>>::param_type();
        assert_eq!(list.display_name(), "object[]");
        assert_eq!(list.json_schema()["items"]["properties"]["age"]["type"], json!("integer"));
        assert_eq!(<Json<Vec<Person>>>::param_type().display_name(), "object[]");
    }

    #[test]
    fn test_param_type_reporting() {
        assert_eq!(<Vec<Option<i64>>>::param_type().display_name(), "integer[]");
        assert_eq!(
            <HashMap<String, f64>>::param_type().json_schema(),
            json!({"type": "object", "additionalProperties": {"type": "number"}})
        );
        let def = ParamDef {
            name: "limit".into(),
            param_type: <Option<u32>>::param_type(),
        };
        assert!(!def.is_required());
    }

    #[test]
    fn test_coercion_from_config() {
        let mut config = DispatchConfig::default();
        assert_eq!(Coercion::from(&config), Coercion::Strict);
        config.lenient_coercion = true;
        assert_eq!(Coercion::from(&config), Coercion::Lenient);
    }
}
