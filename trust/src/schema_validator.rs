use crate::{
    error::{Violation, ViolationKind},
    expectation::{child_path, BodyType, ExpectationTree, FieldExpectation, ValueType},
    ResponseData, ResponseExpectation,
};
use serde_json::{Map, Value};

/// Runtime shape of an observed value, as far as an expectation tree cares.
enum Observed<'a> {
    Absent,
    Null,
    Object(&'a Map<String, Value>),
    Other,
}

impl<'a> From<Option<&'a Value>> for Observed<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        match value {
            None => Observed::Absent,
            Some(Value::Null) => Observed::Null,
            Some(Value::Object(map)) => Observed::Object(map),
            Some(_) => Observed::Other,
        }
    }
}

/// Checks `observed` against `expected`, returning the first violation.
///
/// Without a tree the value must be absent, unless `allow_unspecified_keys`
/// is set. With a tree, objects are closed-world unless
/// `allow_unspecified_keys` is set; nested trees are always closed-world.
pub fn validate_value(
    observed: Option<&Value>,
    expected: Option<&ExpectationTree>,
    allow_unspecified_keys: bool,
) -> Result<(), Violation> {
    validate_at(observed, expected, allow_unspecified_keys, "")
}

/// Status, content type, top-level body shape, body tree, then headers.
pub fn check_response(
    expectation: &ResponseExpectation,
    response: &ResponseData,
) -> Result<(), Violation> {
    if response.status_code != expectation.expected_code() {
        return Err(Violation::new(ViolationKind::InvalidHttpCode));
    }

    match response.content_type() {
        Some(content_type) if expectation.expected_content_type().is_match(content_type) => {}
        _ => return Err(Violation::new(ViolationKind::IncorrectContentType)),
    }

    let body_type = expectation.expected_body_type();
    let body = match &response.body {
        Some(body) if body_type.value_type().matches(body) => body,
        _ => return Err(Violation::new(ViolationKind::IncorrectType)),
    };

    match (body_type, body) {
        (BodyType::Array, Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                validate_at(
                    Some(item),
                    expectation.expected_body(),
                    false,
                    &element_path("", index),
                )?;
            }
        }
        _ => validate_value(Some(body), expectation.expected_body(), false)?,
    }

    validate_value(
        Some(&response.headers_value()),
        expectation.expected_headers(),
        true,
    )
    .map_err(Violation::in_headers)
}

fn validate_at(
    observed: Option<&Value>,
    expected: Option<&ExpectationTree>,
    allow_unspecified_keys: bool,
    path: &str,
) -> Result<(), Violation> {
    let observed = Observed::from(observed);

    let tree = match expected {
        Some(tree) => tree,
        None => {
            return match observed {
                Observed::Absent => Ok(()),
                _ if allow_unspecified_keys => Ok(()),
                _ => Err(violation(ViolationKind::UnexpectedBody, path)),
            }
        }
    };

    match observed {
        Observed::Absent | Observed::Null => Err(violation(ViolationKind::MissingBody, path)),
        Observed::Other => Err(violation(ViolationKind::IncorrectType, path)),
        Observed::Object(map) => validate_object(map, tree, allow_unspecified_keys, path),
    }
}

fn validate_object(
    observed: &Map<String, Value>,
    tree: &ExpectationTree,
    allow_unspecified_keys: bool,
    path: &str,
) -> Result<(), Violation> {
    if !allow_unspecified_keys {
        if let Some(key) = observed.keys().find(|key| !tree.contains_key(key.as_str())) {
            return Err(violation(ViolationKind::UnknownKey, &child_path(path, key)));
        }
    }

    for (key, field) in tree.iter() {
        let key_path = child_path(path, key);

        match observed.get(key) {
            Some(value) => validate_field(value, field, &key_path)?,
            None if field.required => {
                return Err(violation(ViolationKind::MissingKey, &key_path));
            }
            None => {}
        }
    }

    Ok(())
}

fn validate_field(value: &Value, field: &FieldExpectation, path: &str) -> Result<(), Violation> {
    if let Some(expected) = &field.value {
        if !json_eq(expected, value) {
            return Err(violation(ViolationKind::IncorrectValue, path));
        }
    }

    let null_allowed = field.allow_null && value.is_null();

    if let Some(value_type) = field.value_type {
        if !null_allowed && !value_type.matches(value) {
            return Err(violation(ViolationKind::IncorrectType, path));
        }
    }

    let nested = match &field.nested {
        Some(nested) if !null_allowed => nested,
        _ => return Ok(()),
    };

    match (field.value_type, value) {
        (Some(ValueType::Object), _) => validate_at(Some(value), Some(nested), false, path),
        (Some(ValueType::Array), Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                validate_at(Some(item), Some(nested), false, &element_path(path, index))?;
            }
            Ok(())
        }
        // nested rules only apply under an object or array type
        _ => Ok(()),
    }
}

/// Deep equality where numbers compare by value, so `1 == 1.0`.
pub fn json_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(l), Value::Number(r)) => {
            l == r
                || match (l.as_f64(), r.as_f64()) {
                    (Some(l), Some(r)) => l == r,
                    _ => false,
                }
        }
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(l, r)| json_eq(l, r))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l.iter()
                    .all(|(key, l)| r.get(key).map_or(false, |r| json_eq(l, r)))
        }
        _ => lhs == rhs,
    }
}

fn element_path(path: &str, index: usize) -> String {
    format!("{}[{}]", path, index)
}

fn violation(kind: ViolationKind, path: &str) -> Violation {
    if path.is_empty() {
        Violation::new(kind)
    } else {
        Violation::at(kind, path)
    }
}
