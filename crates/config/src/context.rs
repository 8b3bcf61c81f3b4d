//! Folding evaluated component values into the variable tree.
//!
//! Every successful component evaluation appends a `(reference, value)`
//! record. The records are folded into a nested object tree keyed by the
//! reference segments, which becomes the evaluation context's variables:
//!
//! ```text
//! (discovery.static.localhost, V1), (scrape.foo, V2)
//!   =>
//! { discovery: { static: { localhost: V1 } }, scrape: { foo: V2 } }
//! ```

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::reference::Reference;
use crate::value::Value;

/// One published component value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceValue {
    pub reference: Reference,
    pub value: Value,
}

/// Incompatible nesting while building the variable tree: some reference
/// needs a path to be an intermediate namespace while another stored a
/// component value there (or vice versa).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("conflicting variable shapes at {path:?}: {detail}")]
pub struct ShapeConflict {
    pub path: String,
    pub detail: String,
}

/// Build the variable tree from the ordered records.
///
/// When two records push to the same leaf, the later record wins.
pub fn build_variables(
    records: &[ReferenceValue],
) -> Result<BTreeMap<String, Value>, ShapeConflict> {
    let mut variables: BTreeMap<String, Value> = BTreeMap::new();
    let mut leaf_paths: HashSet<String> = HashSet::new();
    let mut interior_paths: HashSet<String> = HashSet::new();

    for record in records {
        let segments = record.reference.segments();
        let Some((leaf, interior)) = segments.split_last() else {
            continue;
        };

        let mut cursor = &mut variables;
        let mut path = String::new();

        for segment in interior {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);

            if leaf_paths.contains(&path) {
                return Err(ShapeConflict {
                    path: path.clone(),
                    detail: "the path already holds a component value".to_string(),
                });
            }
            interior_paths.insert(path.clone());

            let entry = cursor
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(BTreeMap::new()));
            match entry {
                Value::Object(fields) => cursor = fields,
                other => {
                    return Err(ShapeConflict {
                        path: path.clone(),
                        detail: format!("expected an object namespace, found {}", other.type_name()),
                    });
                }
            }
        }

        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(leaf);
        if interior_paths.contains(&path) {
            return Err(ShapeConflict {
                path,
                detail: "the path is already used as a namespace".to_string(),
            });
        }
        leaf_paths.insert(path);

        cursor.insert(leaf.clone(), record.value.clone());
    }

    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;

    fn record(reference: Reference, value: Value) -> ReferenceValue {
        ReferenceValue { reference, value }
    }

    #[test]
    fn builds_a_nested_namespace_tree() {
        let v1 = Value::object([("targets".to_string(), Value::List(vec![]))]);
        let v2 = Value::object([("url".to_string(), Value::string("https://example/push"))]);

        let variables = build_variables(&[
            record(Reference::discovery("static", "localhost"), v1.clone()),
            record(Reference::remote_write("primary"), v2.clone()),
        ])
        .unwrap();

        assert_eq!(
            variables.get("discovery"),
            Some(&Value::object([(
                "static".to_string(),
                Value::object([("localhost".to_string(), v1)]),
            )]))
        );
        assert_eq!(
            variables.get("remote_write"),
            Some(&Value::object([("primary".to_string(), v2)]))
        );
    }

    #[test]
    fn later_record_wins_at_the_same_leaf() {
        let first = Value::Number(Number::Integer(1));
        let second = Value::Number(Number::Integer(2));

        let variables = build_variables(&[
            record(Reference::scrape("s"), first),
            record(Reference::scrape("s"), second.clone()),
        ])
        .unwrap();

        let scrape = variables.get("scrape").and_then(Value::as_object).unwrap();
        assert_eq!(scrape.get("s"), Some(&second));
    }

    #[test]
    fn leaf_used_as_namespace_is_a_shape_conflict() {
        // scrape.s is a leaf; a second record needs it as a namespace.
        let err = build_variables(&[
            record(Reference::scrape("s"), Value::Null),
            record(
                Reference::from_segments(["scrape", "s", "x"].map(String::from)),
                Value::Null,
            ),
        ])
        .unwrap_err();
        assert_eq!(err.path, "scrape.s");
    }

    #[test]
    fn namespace_used_as_leaf_is_a_shape_conflict() {
        let err = build_variables(&[
            record(Reference::discovery("static", "a"), Value::Null),
            record(
                Reference::from_segments(["discovery", "static"].map(String::from)),
                Value::Null,
            ),
        ])
        .unwrap_err();
        assert_eq!(err.path, "discovery.static");
    }
}
