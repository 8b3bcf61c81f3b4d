//! Typed conversion between values and configuration structs.
//!
//! [`FromValue`]/[`IntoValue`] play the role a reflection-based decoder
//! plays elsewhere: every block config struct spells out its fields once,
//! with field-by-field coercion and strict rejection of unknown attributes.
//! [`decode_body`] bridges from the AST: it evaluates a body's attribute
//! expressions into an object value and decodes that into the target
//! struct, turning conversion errors into positioned diagnostics.

use std::collections::BTreeMap;

use trellis_common::{LabelSet, TargetGroup};

use crate::ast::Body;
use crate::diag::{Diagnostic, Diagnostics};
use crate::eval::{eval_expr, EvalContext};
use crate::value::{Value, ValueError};

/// Decode a value into a typed struct.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ValueError>;
}

/// Encode a typed struct into a value.
pub trait IntoValue {
    fn into_value(self) -> Result<Value, ValueError>;
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(ValueError::TypeMismatch {
                expected: "string",
                found: other.type_name(),
            }),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(ValueError::TypeMismatch {
                expected: "list",
                found: other.type_name(),
            }),
        }
    }
}

impl FromValue for LabelSet {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        let fields = require_object(value)?;
        fields
            .iter()
            .map(|(name, v)| {
                String::from_value(v)
                    .map(|s| (name.clone(), s))
                    .map_err(|e| e.in_field(name))
            })
            .collect()
    }
}

impl FromValue for TargetGroup {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        let fields = require_object(value)?;
        reject_unknown(fields, &["targets", "labels"])?;
        Ok(TargetGroup {
            targets: required_field(fields, "targets")?,
            labels: optional_field(fields, "labels")?.unwrap_or_default(),
        })
    }
}

impl IntoValue for String {
    fn into_value(self) -> Result<Value, ValueError> {
        Ok(Value::String(self))
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Result<Value, ValueError> {
        Ok(Value::List(
            self.into_iter()
                .map(IntoValue::into_value)
                .collect::<Result<_, _>>()?,
        ))
    }
}

impl IntoValue for LabelSet {
    fn into_value(self) -> Result<Value, ValueError> {
        Ok(Value::Object(
            self.into_iter().map(|(k, v)| (k, Value::String(v))).collect(),
        ))
    }
}

impl IntoValue for TargetGroup {
    fn into_value(self) -> Result<Value, ValueError> {
        Ok(Value::object([
            ("targets".to_string(), self.targets.into_value()?),
            ("labels".to_string(), self.labels.into_value()?),
        ]))
    }
}

/// The object fields of `value`, or a mismatch error.
pub fn require_object(value: &Value) -> Result<&BTreeMap<String, Value>, ValueError> {
    value.as_object().ok_or(ValueError::TypeMismatch {
        expected: "object",
        found: value.type_name(),
    })
}

/// Decode a required field of an object.
pub fn required_field<T: FromValue>(
    fields: &BTreeMap<String, Value>,
    name: &str,
) -> Result<T, ValueError> {
    match fields.get(name) {
        Some(value) => T::from_value(value).map_err(|e| e.in_field(name)),
        None => Err(ValueError::MissingField(name.to_string())),
    }
}

/// Decode an optional field of an object. Null counts as absent.
pub fn optional_field<T: FromValue>(
    fields: &BTreeMap<String, Value>,
    name: &str,
) -> Result<Option<T>, ValueError> {
    match fields.get(name) {
        None => Ok(None),
        Some(Value::Null) => Ok(None),
        Some(value) => T::from_value(value).map(Some).map_err(|e| e.in_field(name)),
    }
}

/// Fail on any field outside the allowed set.
pub fn reject_unknown(
    fields: &BTreeMap<String, Value>,
    allowed: &[&str],
) -> Result<(), ValueError> {
    for name in fields.keys() {
        if !allowed.contains(&name.as_str()) {
            return Err(ValueError::UnknownField(name.clone()));
        }
    }
    Ok(())
}

/// Evaluate a body's attributes into an object value.
///
/// Nested blocks are ignored; callers that do not allow them use
/// [`decode_body`]. Evaluation problems are collected so one pass reports
/// every failing attribute.
pub fn decode_attributes(
    body: &Body,
    ctx: &EvalContext,
) -> Result<BTreeMap<String, Value>, Diagnostics> {
    let mut diags = Diagnostics::new();
    let mut fields = BTreeMap::new();

    for attr in &body.attributes {
        if fields.contains_key(&attr.name) {
            diags.push(Diagnostic::error(
                "Duplicate attribute",
                format!("the attribute {:?} is defined more than once", attr.name),
                attr.name_span,
            ));
            continue;
        }
        match eval_expr(&attr.value, ctx) {
            Ok(value) => {
                fields.insert(attr.name.clone(), value);
            }
            Err(errs) => diags.extend(errs),
        }
    }

    if diags.has_errors() {
        Err(diags)
    } else {
        Ok(fields)
    }
}

/// Evaluate a body against `ctx` and decode it into `T`.
pub fn decode_body<T: FromValue>(body: &Body, ctx: &EvalContext) -> Result<T, Diagnostics> {
    let mut diags = Diagnostics::new();

    for block in &body.blocks {
        diags.push(Diagnostic::error(
            "Unexpected block",
            format!("nested {:?} blocks are not allowed here", block.name),
            block.span,
        ));
    }

    let fields = match decode_attributes(body, ctx) {
        Ok(fields) => fields,
        Err(errs) => {
            diags.extend(errs);
            return Err(diags);
        }
    };
    if diags.has_errors() {
        return Err(diags);
    }

    T::from_value(&Value::Object(fields)).map_err(|err| {
        // Point at the offending attribute when the error names one.
        let span = err
            .field_name()
            .and_then(|name| body.attribute(name))
            .map_or(body.span, |attr| attr.value.span);
        diags.push(Diagnostic::error("Invalid configuration", err.to_string(), span));
        diags
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_file;
    use crate::value::Number;

    fn body_of(source: &str) -> Body {
        parse_file(source).unwrap().body
    }

    #[test]
    fn target_group_round_trip() {
        let value = Value::object([
            (
                "targets".to_string(),
                Value::List(vec![Value::object([(
                    "__address__".to_string(),
                    Value::string("a:1"),
                )])]),
            ),
            (
                "labels".to_string(),
                Value::object([("env".to_string(), Value::string("dev"))]),
            ),
        ]);

        let group = TargetGroup::from_value(&value).unwrap();
        assert_eq!(group.targets.len(), 1);
        assert_eq!(group.labels.get("env").map(String::as_str), Some("dev"));
        assert_eq!(group.into_value().unwrap(), value);
    }

    #[test]
    fn type_mismatch_reports_the_field() {
        let value = Value::object([(
            "targets".to_string(),
            Value::Number(Number::Integer(3)),
        )]);

        let err = TargetGroup::from_value(&value).unwrap_err();
        assert_eq!(err.field_name(), Some("targets"));
        assert!(err.to_string().contains("expected list, found number"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let value = Value::object([
            ("targets".to_string(), Value::List(vec![])),
            ("bogus".to_string(), Value::Null),
        ]);
        assert_eq!(
            TargetGroup::from_value(&value),
            Err(ValueError::UnknownField("bogus".to_string()))
        );
    }

    #[test]
    fn decode_body_points_at_the_bad_attribute() {
        let body = body_of("targets = 42\nlabels = {}\n");
        let err = decode_body::<TargetGroup>(&body, &EvalContext::new()).unwrap_err();

        let diag = err.iter().next().unwrap();
        assert_eq!(diag.summary, "Invalid configuration");
        // The span covers the `42`, not the whole body.
        assert_eq!(diag.span, body.attribute("targets").map(|a| a.value.span));
    }

    #[test]
    fn decode_body_rejects_nested_blocks() {
        let body = body_of("targets = []\ninner \"x\" {\n}\n");
        let err = decode_body::<TargetGroup>(&body, &EvalContext::new()).unwrap_err();
        assert!(err.iter().any(|d| d.summary == "Unexpected block"));
    }
}
