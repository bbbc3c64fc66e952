//! Typed view of a tool's JSON-schema parameters.
//!
//! Only the narrow subset of JSON Schema that tool catalogs actually use is
//! modeled: an object with `properties` and `required`, whose fields are
//! integers, strings, booleans, enums, or arrays of enum values. Anything
//! else becomes [`FieldSpec::Unsupported`] and contributes no candidates.

pub mod catalog;

pub use catalog::{Catalog, CatalogTool};

use crate::ToolDef;
use crate::error::SchemaError;
use serde_json::Value;

/// The shape of a single field, as far as enumeration cares.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// Any field carrying an `enum` list, whatever its declared type.
    Enum(Vec<Value>),
    Integer,
    String,
    Boolean,
    /// `{"type": "array", "items": {"enum": [...]}}`.
    EnumArray(Vec<Value>),
    /// Objects, numbers, free-form arrays, missing types.
    Unsupported,
}

impl FieldSpec {
    /// Classify a property's schema fragment. An `enum` wins over the type.
    pub fn from_value(value: &Value) -> Self {
        if let Some(values) = value.get("enum").and_then(Value::as_array) {
            return FieldSpec::Enum(values.clone());
        }
        match value.get("type").and_then(Value::as_str) {
            Some("integer") => FieldSpec::Integer,
            Some("string") => FieldSpec::String,
            Some("boolean") => FieldSpec::Boolean,
            Some("array") => value
                .get("items")
                .and_then(|items| items.get("enum"))
                .and_then(Value::as_array)
                .map_or(FieldSpec::Unsupported, |values| {
                    FieldSpec::EnumArray(values.clone())
                }),
            _ => FieldSpec::Unsupported,
        }
    }
}

/// One declared property.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub description: Option<String>,
    pub spec: FieldSpec,
}

/// A tool's `parameters` block: properties in declaration order plus the
/// ordered list of required names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSpec {
    fields: Vec<Field>,
    required: Vec<String>,
}

impl ParameterSpec {
    /// Build a spec directly. Every required name must be a declared field.
    pub fn new(fields: Vec<Field>, required: Vec<String>) -> Result<Self, SchemaError> {
        for (i, name) in required.iter().enumerate() {
            if !fields.iter().any(|f| &f.name == name) {
                return Err(SchemaError::UnknownRequired(name.clone()));
            }
            if required[..i].contains(name) {
                return Err(SchemaError::DuplicateRequired(name.clone()));
            }
        }
        Ok(Self { fields, required })
    }

    /// Parse a JSON-schema `parameters` object. A missing `properties` or
    /// `required` key is treated as empty.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let obj = value.as_object().ok_or(SchemaError::NotAnObject)?;

        let fields = match obj.get("properties") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(props)) => props
                .iter()
                .map(|(name, schema)| Field {
                    name: name.clone(),
                    description: schema
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    spec: FieldSpec::from_value(schema),
                })
                .collect(),
            Some(_) => return Err(SchemaError::PropertiesNotObject),
        };

        let required = match obj.get("required") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(names)) => names
                .iter()
                .map(|n| n.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or(SchemaError::InvalidRequired)?,
            Some(_) => return Err(SchemaError::InvalidRequired),
        };

        Self::new(fields, required)
    }

    /// All declared fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Required field names in declared order.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }}

/// A tool as the enumerator sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSpec,
}

impl ToolSchema {
    pub fn from_tool_def(def: &ToolDef) -> Result<Self, SchemaError> {
        Ok(Self {
            name: def.function.name.clone(),
            description: def.function.description.clone(),
            parameters: ParameterSpec::from_value(&def.function.parameters)?,
        })
    }
}
