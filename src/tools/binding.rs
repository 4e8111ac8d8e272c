//! Argument payload normalization and binding.
//!
//! Turns a [`ToolArguments`] payload into exactly one JSON value per declared
//! parameter, in declaration order. Type coercion happens afterwards, inside
//! the typed handle. Absent optional parameters become `null`; absent required
//! parameters are an error.

use serde_json::{Map, Value};
use std::borrow::Cow;

use super::params::{value_type_name, ParamDef, ParamType};
use super::request::ToolArguments;

/// Normalized argument payload.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload<'a> {
    /// No arguments: the call goes to the zero-argument path.
    Empty,
    Positional(Cow<'a, [Value]>),
    Document(Cow<'a, Value>),
}

fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Classify a payload, parsing raw JSON text. Errors describe why raw text
/// could not be used.
pub(crate) fn normalize(
    arguments: &ToolArguments,
    max_raw_bytes: usize,
) -> Result<Payload<'_>, String> {
    match arguments {
        ToolArguments::None => Ok(Payload::Empty),
        ToolArguments::Positional(values) if values.is_empty() => Ok(Payload::Empty),
        ToolArguments::Positional(values) => Ok(Payload::Positional(Cow::Borrowed(values))),
        ToolArguments::Structured(value) if is_empty_document(value) => Ok(Payload::Empty),
        ToolArguments::Structured(value) => Ok(Payload::Document(Cow::Borrowed(value))),
        ToolArguments::Raw(text) => {
            if text.len() > max_raw_bytes {
                return Err(format!(
                    "arguments are {} bytes, limit is {}",
                    text.len(),
                    max_raw_bytes
                ));
            }
            if text.trim().is_empty() {
                return Ok(Payload::Empty);
            }
            let value: Value = serde_json::from_str(text)
                .map_err(|e| format!("arguments are not valid JSON: {}", e))?;
            if is_empty_document(&value) {
                Ok(Payload::Empty)
            } else {
                Ok(Payload::Document(Cow::Owned(value)))
            }
        }
    }
}

/// Bind a non-empty payload to the declared parameters.
pub(crate) fn bind(
    payload: Payload<'_>,
    params: &[ParamDef],
    allow_unknown: bool,
) -> Result<Vec<Value>, String> {
    match payload {
        Payload::Empty => fill_positional(&[], params),
        Payload::Positional(values) => fill_positional(&values, params),
        Payload::Document(doc) => {
            if let Value::Object(map) = doc.as_ref() {
                if !binds_whole_object(map, params) {
                    return fill_named(map, params, allow_unknown);
                }
            }
            if let Value::Array(items) = doc.as_ref() {
                if params.len() > 1 {
                    return fill_positional(items, params);
                }
            }
            if params.len() == 1 {
                return Ok(vec![doc.into_owned()]);
            }
            Err(format!(
                "expected an object with {} named arguments, got {}",
                params.len(),
                value_type_name(&doc)
            ))
        }
    }
}

/// A unary tool taking a structured value, optional or not, may receive that
/// value directly instead of wrapped under its parameter name.
fn binds_whole_object(map: &Map<String, Value>, params: &[ParamDef]) -> bool {
    match params {
        [only] => {
            let mut param_type = &only.param_type;
            while let ParamType::Optional(inner) = param_type {
                param_type = inner.as_ref();
            }
            let structured = matches!(
                param_type,
                ParamType::Structured(_) | ParamType::Any | ParamType::Map(_)
            );
            structured && !map.contains_key(&only.name)
        }
        _ => false,
    }
}

fn fill_positional(values: &[Value], params: &[ParamDef]) -> Result<Vec<Value>, String> {
    if values.len() > params.len() {
        return Err(format!(
            "expected {} arguments, got {}",
            params.len(),
            values.len()
        ));
    }
    params
        .iter()
        .enumerate()
        .map(|(i, param)| match values.get(i) {
            Some(value) => Ok(value.clone()),
            None if !param.is_required() => Ok(Value::Null),
            None => Err(format!(
                "missing required parameter '{}' (expected {} arguments, got {})",
                param.name,
                params.len(),
                values.len()
            )),
        })
        .collect()
}

fn fill_named(
    map: &Map<String, Value>,
    params: &[ParamDef],
    allow_unknown: bool,
) -> Result<Vec<Value>, String> {
    if !allow_unknown {
        if let Some(key) = map.keys().find(|k| !params.iter().any(|p| &p.name == *k)) {
            return Err(format!("unknown parameter '{}'", key));
        }
    }
    params
        .iter()
        .map(|param| match map.get(&param.name) {
            Some(value) => Ok(value.clone()),
            None if !param.is_required() => Ok(Value::Null),
            None => Err(format!("missing required parameter '{}'", param.name)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> Vec<ParamDef> {
        vec![
            ParamDef {
                name: "a".into(),
                param_type: ParamType::Int,
            },
            ParamDef {
                name: "b".into(),
                param_type: ParamType::Int,
            },
            ParamDef {
                name: "label".into(),
                param_type: ParamType::Optional(Box::new(ParamType::String)),
            },
        ]
    }

    fn object_schema() -> ParamType {
        ParamType::Structured(json!({"type": "object"}))
    }

    fn unary(param_type: ParamType) -> Vec<ParamDef> {
        vec![ParamDef {
            name: "person".into(),
            param_type,
        }]
    }

    #[test]
    fn test_empty_payloads() {
        for args in [
            ToolArguments::None,
            ToolArguments::Positional(vec![]),
            ToolArguments::Structured(Value::Null),
            ToolArguments::Structured(json!({})),
            ToolArguments::raw("  "),
            ToolArguments::raw("{}"),
            ToolArguments::raw("[]"),
            ToolArguments::raw("null"),
        ] {
            assert_eq!(normalize(&args, 1024), Ok(Payload::Empty), "{:?}", args);
        }
    }

    #[test]
    fn test_raw_limits_and_parse_errors() {
        let err = normalize(&ToolArguments::raw("[1, 2, 3]"), 4).unwrap_err();
        assert!(err.contains("limit is 4"), "{}", err);

        let err = normalize(&ToolArguments::raw("2,3"), 1024).unwrap_err();
        assert!(err.starts_with("arguments are not valid JSON"), "{}", err);
    }

    #[test]
    fn test_positional_binding() {
        let args = ToolArguments::positional([2, 3]);
        let payload = normalize(&args, 1024).unwrap();
        assert_eq!(bind(payload, &params(), false), Ok(vec![json!(2), json!(3), Value::Null]));

        let args = ToolArguments::positional([2]);
        let err = bind(normalize(&args, 1024).unwrap(), &params(), false).unwrap_err();
        assert_eq!(err, "missing required parameter 'b' (expected 3 arguments, got 1)");

        let args = ToolArguments::positional([1, 2, 3, 4]);
        let err = bind(normalize(&args, 1024).unwrap(), &params(), false).unwrap_err();
        assert_eq!(err, "expected 3 arguments, got 4");
    }

    #[test]
    fn test_named_binding() {
        let args = ToolArguments::raw(r#"{"b": 3, "a": 2, "label": "sum"}"#);
        let payload = normalize(&args, 1024).unwrap();
        assert_eq!(
            bind(payload, &params(), false),
            Ok(vec![json!(2), json!(3), json!("sum")])
        );

        let args = ToolArguments::Structured(json!({"a": 2, "b": 3, "c": 4}));
        let err = bind(normalize(&args, 1024).unwrap(), &params(), false).unwrap_err();
        assert_eq!(err, "unknown parameter 'c'");
        let ok = bind(normalize(&args, 1024).unwrap(), &params(), true).unwrap();
        assert_eq!(ok, vec![json!(2), json!(3), Value::Null]);

        let args = ToolArguments::Structured(json!({"a": 2}));
        let err = bind(normalize(&args, 1024).unwrap(), &params(), false).unwrap_err();
        assert_eq!(err, "missing required parameter 'b'");
    }

    #[test]
    fn test_document_array_binds_by_position() {
        let args = ToolArguments::raw("[2, 3]");
        let bound = bind(normalize(&args, 1024).unwrap(), &params(), false).unwrap();
        assert_eq!(bound, vec![json!(2), json!(3), Value::Null]);
    }

    #[test]
    fn test_unary_document_forms() {
        let list = unary(ParamType::List(Box::new(object_schema())));
        let args = ToolArguments::raw(r#"[{"name": "Klaus"}, {"name": "Peter"}]"#);
        let bound = bind(normalize(&args, 1024).unwrap(), &list, false).unwrap();
        assert_eq!(bound.len(), 1);
        assert!(bound[0].is_array());

        let object = unary(object_schema());
        let wrapped = ToolArguments::Structured(json!({"person": {"name": "Klaus"}}));
        let bound = bind(normalize(&wrapped, 1024).unwrap(), &object, false).unwrap();
        assert_eq!(bound, vec![json!({"name": "Klaus"})]);

        let bare = ToolArguments::Structured(json!({"name": "Klaus"}));
        let bound = bind(normalize(&bare, 1024).unwrap(), &object, false).unwrap();
        assert_eq!(bound, vec![json!({"name": "Klaus"})]);

        for optional in [
            ParamType::Optional(Box::new(object_schema())),
            ParamType::Optional(Box::new(ParamType::Map(Box::new(ParamType::Int)))),
        ] {
            let params = unary(optional);
            let bound = bind(normalize(&bare, 1024).unwrap(), &params, false).unwrap();
            assert_eq!(bound, vec![json!({"name": "Klaus"})]);
            let bound = bind(normalize(&wrapped, 1024).unwrap(), &params, false).unwrap();
            assert_eq!(bound, vec![json!({"name": "Klaus"})]);
        }

        let scalar = unary(ParamType::String);
        let bound = bind(normalize(&ToolArguments::raw("\"hi\""), 1024).unwrap(), &scalar, false)
            .unwrap();
        assert_eq!(bound, vec![json!("hi")]);
    }

    #[test]
    fn test_scalar_document_for_multi_param_tool() {
        let err = bind(normalize(&ToolArguments::raw("5"), 1024).unwrap(), &params(), false)
            .unwrap_err();
        assert_eq!(err, "expected an object with 3 named arguments, got number");
    }
}
