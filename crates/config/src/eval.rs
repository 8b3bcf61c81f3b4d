//! Expression evaluation.

use std::collections::BTreeMap;

use crate::ast::{Expr, ExprKind, Traversal, TraversalStep};
use crate::diag::{Diagnostic, Diagnostics};
use crate::value::Value;

/// A built-in function available to every expression.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, String>;

/// The variable and function environment expressions are evaluated in.
///
/// Variables hold the namespaced component value tree, e.g.
/// `discovery.static.localhost` resolves to the object published by that
/// component.
pub struct EvalContext {
    pub variables: BTreeMap<String, Value>,
    functions: BTreeMap<&'static str, BuiltinFn>,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalContext {
    /// A context with no variables and the standard builtin functions.
    pub fn new() -> Self {
        let mut functions: BTreeMap<&'static str, BuiltinFn> = BTreeMap::new();
        functions.insert("concat", builtin_concat);
        Self {
            variables: BTreeMap::new(),
            functions,
        }
    }
}

/// `concat(list..)`: chain any number of lists into one.
fn builtin_concat(args: &[Value]) -> Result<Value, String> {
    let mut out = Vec::new();
    for arg in args {
        match arg.as_list() {
            Some(items) => out.extend(items.iter().cloned()),
            None => {
                return Err(format!(
                    "every argument must be a list, found {}",
                    arg.type_name()
                ))
            }
        }
    }
    Ok(Value::List(out))
}

/// Evaluate an expression against the context.
///
/// Problems are reported as positioned diagnostics; list and object
/// elements are all evaluated so a single pass reports every failing
/// element.
pub fn eval_expr(expr: &Expr, ctx: &EvalContext) -> Result<Value, Diagnostics> {
    match &expr.kind {
        ExprKind::Str(s) => Ok(Value::String(s.clone())),
        ExprKind::Number(n) => Ok(Value::Number(*n)),
        ExprKind::Bool(b) => Ok(Value::Bool(*b)),
        ExprKind::Null => Ok(Value::Null),
        ExprKind::List(items) => {
            let mut diags = Diagnostics::new();
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match eval_expr(item, ctx) {
                    Ok(v) => values.push(v),
                    Err(errs) => diags.extend(errs),
                }
            }
            if diags.has_errors() {
                Err(diags)
            } else {
                Ok(Value::List(values))
            }
        }
        ExprKind::Object(entries) => {
            let mut diags = Diagnostics::new();
            let mut fields = BTreeMap::new();
            for entry in entries {
                match eval_expr(&entry.value, ctx) {
                    Ok(v) => {
                        fields.insert(entry.key.clone(), v);
                    }
                    Err(errs) => diags.extend(errs),
                }
            }
            if diags.has_errors() {
                Err(diags)
            } else {
                Ok(Value::Object(fields))
            }
        }
        ExprKind::Call { name, args } => {
            let Some(function) = ctx.functions.get(name.as_str()) else {
                return Err(Diagnostic::error(
                    "Unknown function",
                    format!("there is no function named {:?}", name),
                    expr.span,
                )
                .into());
            };

            let mut diags = Diagnostics::new();
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                match eval_expr(arg, ctx) {
                    Ok(v) => values.push(v),
                    Err(errs) => diags.extend(errs),
                }
            }
            if diags.has_errors() {
                return Err(diags);
            }

            function(&values).map_err(|msg| {
                Diagnostics::from(Diagnostic::error(
                    "Error in function call",
                    format!("{}: {}", name, msg),
                    expr.span,
                ))
            })
        }
        ExprKind::Traversal(traversal) => eval_traversal(traversal, ctx),
    }
}

fn eval_traversal(traversal: &Traversal, ctx: &EvalContext) -> Result<Value, Diagnostics> {
    let Some(mut current) = ctx.variables.get(&traversal.root) else {
        return Err(Diagnostic::error(
            "Unknown variable",
            format!("there is no variable named {:?}", traversal.root),
            traversal.root_span,
        )
        .into());
    };

    for step in &traversal.steps {
        match step {
            TraversalStep::Attr { name, span } => match current.as_object() {
                Some(fields) => match fields.get(name) {
                    Some(next) => current = next,
                    None => {
                        return Err(Diagnostic::error(
                            "Unknown attribute",
                            format!("the object has no attribute named {:?}", name),
                            *span,
                        )
                        .into());
                    }
                },
                None => {
                    return Err(Diagnostic::error(
                        "Invalid traversal",
                        format!("cannot look up {:?} in a {}", name, current.type_name()),
                        *span,
                    )
                    .into());
                }
            },
            TraversalStep::Index { index, span } => match current.as_list() {
                Some(items) => match items.get(*index as usize) {
                    Some(next) => current = next,
                    None => {
                        return Err(Diagnostic::error(
                            "Index out of range",
                            format!("index {} on a list of {} elements", index, items.len()),
                            *span,
                        )
                        .into());
                    }
                },
                None => {
                    return Err(Diagnostic::error(
                        "Invalid traversal",
                        format!("cannot index into a {}", current.type_name()),
                        *span,
                    )
                    .into());
                }
            },
        }
    }

    Ok(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_file;
    use crate::value::Number;

    fn eval_attr(source: &str, ctx: &EvalContext) -> Result<Value, Diagnostics> {
        let file = parse_file(source).unwrap();
        eval_expr(&file.body.attributes[0].value, ctx)
    }

    fn ctx_with_static_a() -> EvalContext {
        let mut ctx = EvalContext::new();
        ctx.variables.insert(
            "discovery".to_string(),
            Value::object([(
                "static".to_string(),
                Value::object([(
                    "a".to_string(),
                    Value::object([(
                        "targets".to_string(),
                        Value::List(vec![Value::object([(
                            "__address__".to_string(),
                            Value::string("h1:1"),
                        )])]),
                    )]),
                )]),
            )]),
        );
        ctx
    }

    #[test]
    fn evaluates_literals_lists_and_objects() {
        let ctx = EvalContext::new();
        let value = eval_attr("x = [1, \"two\", { a = true, b = null }]\n", &ctx).unwrap();

        assert_eq!(
            value,
            Value::List(vec![
                Value::Number(Number::Integer(1)),
                Value::string("two"),
                Value::object([
                    ("a".to_string(), Value::Bool(true)),
                    ("b".to_string(), Value::Null),
                ]),
            ])
        );
    }

    #[test]
    fn traversal_resolves_through_the_variable_tree() {
        let ctx = ctx_with_static_a();
        let value = eval_attr("t = discovery.static.a.targets\n", &ctx).unwrap();
        assert_eq!(value.as_list().map(<[Value]>::len), Some(1));

        let first = eval_attr("t = discovery.static.a.targets[0]\n", &ctx).unwrap();
        assert!(first.as_object().is_some());
    }

    #[test]
    fn unknown_variable_is_an_eval_error() {
        let err = eval_attr("t = discovery.static.missing.targets\n", &EvalContext::new())
            .unwrap_err();
        assert!(err.has_errors());
        assert_eq!(err.iter().next().unwrap().summary, "Unknown variable");
    }

    #[test]
    fn missing_attribute_is_an_eval_error() {
        let ctx = ctx_with_static_a();
        let err = eval_attr("t = discovery.static.missing.targets\n", &ctx).unwrap_err();
        assert_eq!(err.iter().next().unwrap().summary, "Unknown attribute");
    }

    #[test]
    fn concat_chains_lists() {
        let ctx = ctx_with_static_a();
        let value = eval_attr(
            "t = concat(discovery.static.a.targets, discovery.static.a.targets)\n",
            &ctx,
        )
        .unwrap();
        assert_eq!(value.as_list().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn concat_rejects_non_lists() {
        let err = eval_attr("t = concat(\"nope\")\n", &EvalContext::new()).unwrap_err();
        assert_eq!(err.iter().next().unwrap().summary, "Error in function call");
    }
}
