use serde_json::{json, Map, Value};
use std::fmt;

/// Primitive type a model is asked to produce for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
}

impl FieldKind {
    pub fn json_type(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_type())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
    /// Inclusive bounds, only checked for numbers.
    pub range: Option<(f64, f64)>,
    /// Reject empty or whitespace-only strings.
    pub non_empty: bool,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            description: "",
            range: None,
            non_empty: false,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn within(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }

    /// Human readable form used in `SchemaViolation` errors.
    pub fn expected(&self) -> String {
        match (self.kind, self.range, self.non_empty) {
            (FieldKind::Number, Some((min, max)), _) => format!("number in [{}, {}]", min, max),
            (FieldKind::String, _, true) => "non-empty string".to_string(),
            (kind, _, _) => kind.to_string(),
        }
    }
}

/// Declarative description of the output expected from one model task.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredShape {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl StructuredShape {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// JSON-Schema `parameters` object for this shape.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = Map::new();
            property.insert("type".to_string(), json!(field.kind.json_type()));
            if !field.description.is_empty() {
                property.insert("description".to_string(), json!(field.description));
            }
            if let Some((min, max)) = field.range {
                property.insert("minimum".to_string(), json!(min));
                property.insert("maximum".to_string(), json!(max));
            }
            properties.insert(field.name.to_string(), Value::Object(property));
        }

        let required: Vec<&str> = self.required_fields().map(|f| f.name).collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Function definition in the shape OpenAI-compatible providers accept
    /// for forced function calls.
    pub fn function_definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.json_schema(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_shape() -> StructuredShape {
        StructuredShape::new("classifyNewsValue", "Classify the news value")
            .field(FieldSpec::number("newsValue").within(0.0, 10.0))
            .field(FieldSpec::string("reason").optional())
    }

    #[test]
    fn test_function_definition() {
        let def = score_shape().function_definition();
        assert_eq!(def["name"], "classifyNewsValue");
        assert_eq!(def["parameters"]["type"], "object");
        assert_eq!(def["parameters"]["properties"]["newsValue"]["type"], "number");
        assert_eq!(def["parameters"]["properties"]["newsValue"]["maximum"], 10.0);
        assert_eq!(def["parameters"]["required"], json!(["newsValue"]));
    }

    #[test]
    fn test_expected_descriptions() {
        let shape = score_shape();
        assert_eq!(shape.get("newsValue").unwrap().expected(), "number in [0, 10]");
        assert_eq!(FieldSpec::string("body").non_empty().expected(), "non-empty string");
        assert_eq!(FieldSpec::boolean("flag").expected(), "boolean");
    }
}
