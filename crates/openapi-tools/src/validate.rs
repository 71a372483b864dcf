//! Structural validation of synthesized tools.

use crate::error::ValidationError;
use crate::schema::{InputSchema, OBJECT_TYPE, PropertyNode};
use crate::tool::Tool;

/// Validate a synthesized tool.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate_tool(tool: &Tool) -> Result<(), ValidationError> {
    if tool.name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if tool.description.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    validate_input_schema(&tool.input_schema)
}

/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate_input_schema(schema: &InputSchema) -> Result<(), ValidationError> {
    if schema.schema_type.is_empty() {
        return Err(ValidationError::EmptySchemaType);
    }
    if schema.schema_type != OBJECT_TYPE {
        return Err(ValidationError::NonObjectSchema(schema.schema_type.clone()));
    }

    for (name, property) in &schema.properties {
        if name.is_empty() {
            return Err(ValidationError::EmptyPropertyName);
        }
        validate_property(name, property)?;
    }

    for name in &schema.required {
        if name.is_empty() {
            return Err(ValidationError::EmptyRequiredName);
        }
        if !schema.properties.contains_key(name) {
            return Err(ValidationError::MissingRequired(name.clone()));
        }
    }

    Ok(())
}

/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate_property(name: &str, property: &PropertyNode) -> Result<(), ValidationError> {
    if property.property_type.is_empty() {
        return Err(ValidationError::EmptyPropertyType {
            property: name.to_string(),
        });
    }

    match property.property_type.as_str() {
        "string" => {
            if let (Some(min), Some(max)) = (property.min_length, property.max_length)
                && min > max
            {
                return Err(ValidationError::LengthBounds {
                    property: name.to_string(),
                    min,
                    max,
                });
            }
        }
        "integer" | "number" => {
            if let (Some(min), Some(max)) = (property.minimum, property.maximum)
                && min > max
            {
                return Err(ValidationError::NumericBounds {
                    property: name.to_string(),
                    min,
                    max,
                });
            }
        }
        _ => {}
    }

    if property.enum_values.is_some() && property.property_type != "string" {
        return Err(ValidationError::EnumOnNonString {
            property: name.to_string(),
            property_type: property.property_type.clone(),
        });
    }

    Ok(())
}
