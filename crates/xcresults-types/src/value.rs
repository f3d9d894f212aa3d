//! Accessors for the `xcresulttool get --format json` document shape.
//!
//! Every object carries `_type._name`; scalars are wrapped as
//! `{ "_type": {..}, "_value": "<text>" }` (numbers and dates arrive as text);
//! arrays are `{ "_type": {"_name": "Array"}, "_values": [..] }`.

use serde_json::Value;

use crate::record::{DecodeError, RecordId, Reference};

pub const TYPE: &str = "_type";
pub const NAME: &str = "_name";
pub const VALUE: &str = "_value";
pub const VALUES: &str = "_values";

pub const REFERENCE_TYPE: &str = "Reference";

/// The `_type._name` tag of an object, if present.
#[must_use]
pub fn type_name(node: &Value) -> Option<&str> {
    node.get(TYPE)?.get(NAME)?.as_str()
}

#[must_use]
pub fn has_field(node: &Value, field: &str) -> bool {
    node.get(field).is_some()
}

/// Text of a wrapped scalar field. Numeric `_value`s are not coerced.
#[must_use]
pub fn string_field<'a>(node: &'a Value, field: &str) -> Option<&'a str> {
    node.get(field)?.get(VALUE)?.as_str()
}

/// Owned text of a wrapped scalar field.
#[must_use]
pub fn owned_string(node: &Value, field: &str) -> Option<String> {
    string_field(node, field).map(str::to_owned)
}

/// Parse a wrapped numeric field. Absent is `Ok(None)`; present but not a
/// number is an error.
pub fn f64_field(node: &Value, field: &'static str) -> Result<Option<f64>, DecodeError> {
    let Some(raw) = node.get(field).and_then(|wrapped| wrapped.get(VALUE)) else {
        return Ok(None);
    };
    let parsed = match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(DecodeError::BadValue {
            field,
            detail: format!("expected a finite number, found {raw}"),
        }),
    }
}

pub fn i64_field(node: &Value, field: &'static str) -> Result<Option<i64>, DecodeError> {
    let Some(raw) = node.get(field).and_then(|wrapped| wrapped.get(VALUE)) else {
        return Ok(None);
    };
    let parsed = match raw {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| DecodeError::BadValue {
        field,
        detail: format!("expected an integer, found {raw}"),
    })
}

/// Elements of a wrapped array field; an absent field or absent `_values`
/// reads as empty.
#[must_use]
pub fn array_field<'a>(node: &'a Value, field: &str) -> &'a [Value] {
    node.get(field)
        .and_then(|wrapped| wrapped.get(VALUES))
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// Like [`array_field`] but the field itself must exist.
pub fn required_array<'a>(node: &'a Value, field: &'static str) -> Result<&'a [Value], DecodeError> {
    if has_field(node, field) {
        Ok(array_field(node, field))
    } else {
        Err(DecodeError::MissingField(field))
    }
}

/// Decode `node` as a `Reference` object if it is tagged as one.
pub fn as_reference(node: &Value) -> Result<Option<Reference>, DecodeError> {
    if type_name(node) != Some(REFERENCE_TYPE) {
        return Ok(None);
    }
    let id = string_field(node, "id").ok_or(DecodeError::MissingField("id"))?;
    let id = RecordId::new(id)?;
    let target_type = node
        .get("targetType")
        .and_then(|target| string_field(target, "name"))
        .map(str::to_owned);
    Ok(Some(Reference { id, target_type }))
}

/// Decode a reference-valued field. Absent is `Ok(None)`.
pub fn reference_field(node: &Value, field: &'static str) -> Result<Option<Reference>, DecodeError> {
    let Some(child) = node.get(field) else {
        return Ok(None);
    };
    match as_reference(child)? {
        Some(reference) => Ok(Some(reference)),
        None => Err(DecodeError::UnexpectedType {
            expected: REFERENCE_TYPE.to_owned(),
            found: type_name(child).unwrap_or("<untagged>").to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_wrapped_scalars() {
        let node = json!({
            "_type": {"_name": "ActionTestSummary"},
            "name": {"_type": {"_name": "String"}, "_value": "testFoo()"},
            "duration": {"_type": {"_name": "Double"}, "_value": "1.25"},
            "lineNumber": {"_type": {"_name": "Int"}, "_value": "42"}
        });
        assert_eq!(type_name(&node), Some("ActionTestSummary"));
        assert_eq!(string_field(&node, "name"), Some("testFoo()"));
        assert_eq!(f64_field(&node, "duration").unwrap(), Some(1.25));
        assert_eq!(i64_field(&node, "lineNumber").unwrap(), Some(42));
        assert_eq!(f64_field(&node, "missing").unwrap(), None);
    }

    #[test]
    fn malformed_number_is_an_error() {
        let node = json!({"duration": {"_value": "soon"}});
        let err = f64_field(&node, "duration").unwrap_err();
        assert!(matches!(err, DecodeError::BadValue { field: "duration", .. }));
    }

    #[test]
    fn absent_array_reads_empty_but_required_array_fails() {
        let node = json!({"_type": {"_name": "X"}});
        assert!(array_field(&node, "tests").is_empty());
        assert!(matches!(
            required_array(&node, "tests"),
            Err(DecodeError::MissingField("tests"))
        ));
    }

    #[test]
    fn decodes_reference_with_target_type() {
        let node = json!({
            "testsRef": {
                "_type": {"_name": "Reference"},
                "id": {"_type": {"_name": "String"}, "_value": "0~abc"},
                "targetType": {
                    "_type": {"_name": "TypeDefinition"},
                    "name": {"_type": {"_name": "String"}, "_value": "ActionTestPlanRunSummaries"}
                }
            }
        });
        let reference = reference_field(&node, "testsRef").unwrap().unwrap();
        assert_eq!(reference.id.as_str(), "0~abc");
        assert_eq!(
            reference.target_type.as_deref(),
            Some("ActionTestPlanRunSummaries")
        );
    }

    #[test]
    fn reference_with_empty_id_is_rejected() {
        let node = json!({"_type": {"_name": "Reference"}, "id": {"_value": ""}});
        assert!(as_reference(&node).is_err());
    }

    #[test]
    fn non_reference_in_reference_slot_is_rejected() {
        let node = json!({"summaryRef": {"_type": {"_name": "String"}, "_value": "x"}});
        assert!(matches!(
            reference_field(&node, "summaryRef"),
            Err(DecodeError::UnexpectedType { .. })
        ));
    }
}
