//! The boundary between loosely typed model output and domain types.
//!
//! Everything past [`validate`] may assume the fields it reads exist and have
//! the declared type.

use crate::parser::{FieldValue, ParsedFields};
use crate::shape::{FieldKind, FieldSpec, StructuredShape};
use crate::{Error, Result};

/// Fields that passed validation against a [`StructuredShape`].
#[derive(Debug, Clone)]
pub struct ValidatedFields {
    shape: &'static str,
    fields: ParsedFields,
}

impl ValidatedFields {
    pub fn shape_name(&self) -> &'static str {
        self.shape
    }

    pub fn string(&mut self, name: &str) -> Result<String> {
        match self.fields.remove(name) {
            Some(FieldValue::Text(s)) => Ok(s),
            _ => Err(Error::schema_violation(name, "string")),
        }
    }

    pub fn optional_string(&mut self, name: &str) -> Option<String> {
        match self.fields.remove(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Result<f64> {
        match self.fields.get(name) {
            Some(FieldValue::Number(n)) => Ok(*n),
            _ => Err(Error::schema_violation(name, "number")),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool> {
        match self.fields.get(name) {
            Some(FieldValue::Bool(b)) => Ok(*b),
            _ => Err(Error::schema_violation(name, "boolean")),
        }
    }
}

/// Domain types built from validated model output.
pub trait FromFields: Sized {
    fn from_fields(fields: ValidatedFields) -> Result<Self>;
}

/// Check `fields` against `shape`, failing on the first violation in
/// declaration order. Unknown extra fields are ignored.
pub fn validate(fields: ParsedFields, shape: &StructuredShape) -> Result<ValidatedFields> {
    for spec in &shape.fields {
        match fields.get(spec.name) {
            None | Some(FieldValue::Null) => {
                if spec.required {
                    return Err(Error::schema_violation(spec.name, spec.expected()));
                }
            }
            Some(value) => check_value(spec, value)?,
        }
    }

    Ok(ValidatedFields {
        shape: shape.name,
        fields,
    })
}

/// Validate and convert in one step.
pub fn validate_into<T: FromFields>(fields: ParsedFields, shape: &StructuredShape) -> Result<T> {
    T::from_fields(validate(fields, shape)?)
}

fn check_value(spec: &FieldSpec, value: &FieldValue) -> Result<()> {
    let violation = || Error::schema_violation(spec.name, spec.expected());

    match (spec.kind, value) {
        (FieldKind::String, FieldValue::Text(s)) => {
            if spec.non_empty && s.trim().is_empty() {
                return Err(violation());
            }
        }
        (FieldKind::Number, FieldValue::Number(n)) => {
            if !n.is_finite() {
                return Err(violation());
            }
            if let Some((min, max)) = spec.range {
                if *n < min || *n > max {
                    return Err(violation());
                }
            }
        }
        (FieldKind::Boolean, FieldValue::Bool(_)) => {}
        (_, other) => {
            tracing::debug!(
                field = spec.name,
                expected = %spec.kind,
                found = other.type_name(),
                "Field type mismatch"
            );
            return Err(violation());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn article_shape() -> StructuredShape {
        StructuredShape::new("article", "")
            .field(FieldSpec::string("body").non_empty())
            .field(FieldSpec::string("headline").non_empty())
            .field(FieldSpec::string("category").non_empty())
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_missing_required_field_is_named() {
        let fields: ParsedFields = [("body", text("b")), ("category", text("c"))]
            .into_iter()
            .collect();
        match validate(fields, &article_shape()) {
            Err(Error::SchemaViolation { field, expected }) => {
                assert_eq!(field, "headline");
                assert_eq!(expected, "non-empty string");
            }
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    #[test]
    fn test_null_counts_as_missing() {
        let fields = parse("{\"body\": \"b\", \"headline\": null, \"category\": \"c\"}").unwrap();
        let err = validate(fields, &article_shape()).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref field, .. } if field == "headline"));
    }

    #[test]
    fn test_first_violation_in_declaration_order() {
        let fields = ParsedFields::new();
        let err = validate(fields, &article_shape()).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref field, .. } if field == "body"));
    }

    #[test]
    fn test_numbers_are_not_coerced_from_strings() {
        let shape = StructuredShape::new("score", "").field(FieldSpec::number("newsValue"));
        let fields = parse("{\"newsValue\": \"7\"}").unwrap();
        let err = validate(fields, &shape).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref expected, .. } if expected == "number"));
    }

    #[test]
    fn test_booleans_are_not_coerced() {
        let shape = StructuredShape::new("flag", "").field(FieldSpec::boolean("isRelatedToSweden"));
        for raw in ["{\"isRelatedToSweden\": \"true\"}", "{\"isRelatedToSweden\": 1}"] {
            let err = validate(parse(raw).unwrap(), &shape).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::SchemaViolation);
        }
    }

    #[test]
    fn test_range_boundaries() {
        let shape = StructuredShape::new("score", "")
            .field(FieldSpec::number("newsValue").within(0.0, 10.0));

        for ok in ["0", "10", "5.5"] {
            let fields = parse(&format!("{{\"newsValue\": {}}}", ok)).unwrap();
            assert!(validate(fields, &shape).is_ok(), "{ok} should pass");
        }
        for bad in ["10.5", "-1", "11"] {
            let fields = parse(&format!("{{\"newsValue\": {}}}", bad)).unwrap();
            assert!(validate(fields, &shape).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_empty_string_rejected_when_non_empty() {
        let fields = parse("{\"body\": \"  \", \"headline\": \"h\", \"category\": \"c\"}").unwrap();
        let err = validate(fields, &article_shape()).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref field, .. } if field == "body"));
    }

    #[test]
    fn test_optional_fields() {
        let shape = StructuredShape::new("opt", "")
            .field(FieldSpec::boolean("flag"))
            .field(FieldSpec::string("note").optional());

        let mut ok = validate(parse("{\"flag\": false}").unwrap(), &shape).unwrap();
        assert_eq!(ok.optional_string("note"), None);
        assert!(!ok.boolean("flag").unwrap());

        let err = validate(parse("{\"flag\": false, \"note\": 3}").unwrap(), &shape).unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref field, .. } if field == "note"));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let fields = parse("{\"body\": \"b\", \"headline\": \"h\", \"category\": \"c\", \"mood\": \"calm\"}")
            .unwrap();
        let mut validated = validate(fields, &article_shape()).unwrap();
        assert_eq!(validated.shape_name(), "article");
        assert_eq!(validated.string("headline").unwrap(), "h");
    }
}
