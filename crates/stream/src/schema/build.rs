use super::{array, atom, boolean, number, object, string, Descriptor};
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("expected an object")]
    ExpectedObject,
    #[error("expected a string 'type' keyword")]
    ExpectedType,
    #[error("expected an 'items' schema for array type")]
    ExpectedItems,
    #[error("expected a 'properties' object for object type")]
    ExpectedProperties,
    #[error("unsupported schema type {0:?}")]
    UnsupportedType(String),
    #[error("at property {name:?}: {detail}")]
    AtProperty {
        name: String,
        #[source]
        detail: Box<Error>,
    },
    #[error("at array items: {0}")]
    AtItems(#[source] Box<Error>),
}

/// Build a Descriptor tree from an external validation schema, inverting
/// `Descriptor::to_external_schema`. String schemas stream character-wise;
/// numeric, boolean and enum schemas become whole-validated atoms carrying
/// the schema they were built from; arrays and objects recurse. Nullable
/// wrappers unwrap to their inner shape.
pub fn from_external_schema(schema: &Value) -> Result<Descriptor, Error> {
    let map = schema.as_object().ok_or(Error::ExpectedObject)?;

    // An enumeration is atomic regardless of its value type.
    if map.contains_key("enum") {
        return Ok(atom(schema.clone()));
    }

    let typ = match map.get("type") {
        Some(Value::String(typ)) => typ.clone(),
        // Nullable rendered as {"type": ["T", "null"]}: unwrap to T.
        Some(Value::Array(types)) => {
            let mut inner = types
                .iter()
                .filter(|t| !matches!(t, Value::String(s) if s == "null"));
            match (inner.next(), inner.next()) {
                (Some(Value::String(typ)), None) => typ.clone(),
                _ => return Err(Error::ExpectedType),
            }
        }
        None => {
            // Nullable rendered as {"anyOf": [T, {"type": "null"}]}: unwrap to T.
            if let Some(Value::Array(variants)) = map.get("anyOf") {
                let mut inner = variants
                    .iter()
                    .filter(|v| v.get("type") != Some(&Value::String("null".to_string())));
                if let (Some(variant), None) = (inner.next(), inner.next()) {
                    return from_external_schema(variant);
                }
            }
            return Err(Error::ExpectedType);
        }
        Some(_) => return Err(Error::ExpectedType),
    };

    match typ.as_str() {
        "string" => Ok(annotate(string(), map)),
        "number" | "integer" => Ok(annotate(number(), map)),
        "boolean" => Ok(annotate(boolean(), map)),
        "array" => {
            let items = map.get("items").ok_or(Error::ExpectedItems)?;
            let element =
                from_external_schema(items).map_err(|err| Error::AtItems(Box::new(err)))?;
            Ok(array(element))
        }
        "object" => {
            let properties = match map.get("properties") {
                Some(Value::Object(properties)) => properties,
                _ => return Err(Error::ExpectedProperties),
            };
            let fields = properties
                .iter()
                .map(|(name, child)| {
                    from_external_schema(child)
                        .map(|d| (name.clone(), d))
                        .map_err(|err| Error::AtProperty {
                            name: name.clone(),
                            detail: Box::new(err),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(object(fields))
        }
        other => Err(Error::UnsupportedType(other.to_string())),
    }
}

// String, number and boolean descriptors re-attach metadata so that a
// rendered schema round-trips. Atoms built from enum or opaque schemas
// instead keep the schema itself, which already carries its metadata.
fn annotate(d: Descriptor, map: &serde_json::Map<String, Value>) -> Descriptor {
    let d = match map.get("description").and_then(Value::as_str) {
        // Describe cannot conflict: these descriptors carry no external schema.
        Some(text) => d.describe(text).unwrap(),
        None => d,
    };
    match map.get("default") {
        Some(default) => d.with_default(default.clone()).unwrap(),
        None => d,
    }
}
