use crate::node::{ArrayNode, AtomNode, Node, ObjectNode, StringNode};
use serde_json::{json, Value};
use std::sync::Arc;

pub mod build;
pub use build::from_external_schema;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot set a description on a descriptor which carries an external schema")]
    DescribeConflict,
    #[error("cannot set a default on a descriptor which carries an external schema")]
    DefaultConflict,
    #[error("cannot set an external schema on a descriptor which carries a description or default")]
    ExternalConflict,
}

/// Invalid is a validation failure surfaced by an injected Validate implementation.
#[derive(thiserror::Error, Debug)]
#[error("value failed validation: {reason}")]
pub struct Invalid {
    pub reason: String,
}

/// Validate is the injected interface to a third-party schema validator.
/// Atoms validate exactly once, at completion; streamed strings are never
/// re-validated mid-stream.
pub trait Validate {
    fn validate(&self, schema: Option<&Value>, value: &Value) -> Result<(), Invalid>;
}

impl<F> Validate for F
where
    F: Fn(Option<&Value>, &Value) -> Result<(), Invalid>,
{
    fn validate(&self, schema: Option<&Value>, value: &Value) -> Result<(), Invalid> {
        self(schema, value)
    }
}

/// Descriptor declares the streaming shape of a document location.
/// Descriptors are immutable once built; `create` materializes the
/// runtime Node which accumulates values and raises callbacks.
#[derive(Clone)]
pub struct Descriptor {
    kind: Kind,
    description: Option<String>,
    default: Option<Value>,
    external: Option<Value>,
    validator: Option<Arc<dyn Validate>>,
}

#[derive(Clone)]
enum Kind {
    /// A string leaf, streamed character-wise.
    String,
    /// A leaf validated as a whole on completion.
    Atom(AtomKind),
    /// An array whose elements stream individually.
    Array(Box<Descriptor>),
    /// An object with fields in declaration order.
    Object(Vec<(String, Descriptor)>),
}

#[derive(Copy, Clone, Debug)]
enum AtomKind {
    Number,
    Boolean,
    Opaque,
}

/// A string leaf which streams character-wise.
pub fn string() -> Descriptor {
    Descriptor::new(Kind::String)
}

/// A numeric leaf, exposed only once complete.
pub fn number() -> Descriptor {
    Descriptor::new(Kind::Atom(AtomKind::Number))
}

/// A boolean leaf, exposed only once complete.
pub fn boolean() -> Descriptor {
    Descriptor::new(Kind::Atom(AtomKind::Boolean))
}

/// A leaf validated as a whole against the given external schema.
pub fn atom(external: Value) -> Descriptor {
    let mut d = Descriptor::new(Kind::Atom(AtomKind::Opaque));
    d.external = Some(external);
    d
}

/// An array of the given element shape.
pub fn array(element: Descriptor) -> Descriptor {
    Descriptor::new(Kind::Array(Box::new(element)))
}

/// An object whose fields stream in declaration order.
pub fn object<I, K>(fields: I) -> Descriptor
where
    I: IntoIterator<Item = (K, Descriptor)>,
    K: Into<String>,
{
    Descriptor::new(Kind::Object(
        fields.into_iter().map(|(k, d)| (k.into(), d)).collect(),
    ))
}

impl Descriptor {
    fn new(kind: Kind) -> Descriptor {
        Descriptor {
            kind,
            description: None,
            default: None,
            external: None,
            validator: None,
        }
    }

    /// Attach a human description, rendered into the external schema.
    /// Conflicts with an explicit external schema, which is the source
    /// of truth for its own metadata.
    pub fn describe(mut self, text: impl Into<String>) -> Result<Descriptor, Error> {
        if self.external.is_some() {
            return Err(Error::DescribeConflict);
        }
        self.description = Some(text.into());
        Ok(self)
    }

    /// Attach a default value, rendered into the external schema.
    pub fn with_default(mut self, value: Value) -> Result<Descriptor, Error> {
        if self.external.is_some() {
            return Err(Error::DefaultConflict);
        }
        self.default = Some(value);
        Ok(self)
    }

    /// Replace the rendered external schema with an explicit one.
    pub fn with_external_schema(mut self, schema: Value) -> Result<Descriptor, Error> {
        if self.description.is_some() || self.default.is_some() {
            return Err(Error::ExternalConflict);
        }
        self.external = Some(schema);
        Ok(self)
    }

    /// Attach a validator consulted when atoms beneath this descriptor complete.
    pub fn with_validator(mut self, validator: Arc<dyn Validate>) -> Descriptor {
        self.validator = Some(validator);
        self
    }

    /// Render the external validation schema of this descriptor, suitable
    /// for handing to an SDK which constrains generation. An explicit
    /// external schema is returned verbatim.
    pub fn to_external_schema(&self) -> Value {
        if let Some(external) = &self.external {
            return external.clone();
        }

        let mut schema = match &self.kind {
            Kind::String => json!({"type": "string"}),
            Kind::Atom(AtomKind::Number) => json!({"type": "number"}),
            Kind::Atom(AtomKind::Boolean) => json!({"type": "boolean"}),
            Kind::Atom(AtomKind::Opaque) => json!({}),
            Kind::Array(element) => json!({
                "type": "array",
                "items": element.to_external_schema(),
            }),
            Kind::Object(fields) => {
                let properties: serde_json::Map<_, _> = fields
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_external_schema()))
                    .collect();
                let required: Vec<_> = fields.iter().map(|(key, _)| key.clone()).collect();
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                    "additionalProperties": false,
                })
            }
        };

        let map = schema.as_object_mut().unwrap();
        if let Some(text) = &self.description {
            map.insert("description".to_string(), Value::String(text.clone()));
        }
        if let Some(default) = &self.default {
            map.insert("default".to_string(), default.clone());
        }
        schema
    }

    /// Materialize the runtime node tree for this descriptor.
    pub fn create(&self) -> Node {
        match &self.kind {
            Kind::String => Node::String(StringNode::new()),
            Kind::Atom(_) => Node::Atom(AtomNode::new(
                self.external.clone(),
                self.validator.clone(),
            )),
            Kind::Array(element) => Node::Array(ArrayNode::new((**element).clone())),
            Kind::Object(fields) => Node::Object(ObjectNode::new(
                fields
                    .iter()
                    .map(|(key, child)| (key.clone(), child.create()))
                    .collect(),
            )),
        }
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Descriptor");
        match &self.kind {
            Kind::String => s.field("kind", &"String"),
            Kind::Atom(atom) => s.field("kind", &format_args!("Atom({atom:?})")),
            Kind::Array(element) => s.field("kind", &format_args!("Array({element:?})")),
            Kind::Object(fields) => s.field(
                "kind",
                &format_args!(
                    "Object({})",
                    fields.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(", ")
                ),
            ),
        };
        if let Some(description) = &self.description {
            s.field("description", description);
        }
        if let Some(default) = &self.default {
            s.field("default", default);
        }
        if self.external.is_some() {
            s.field("external", &"...");
        }
        s.finish()
    }
}
