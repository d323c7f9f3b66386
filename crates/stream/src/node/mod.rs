use serde_json::Value;

mod array;
mod atom;
mod object;
mod string;

pub use array::ArrayNode;
pub use atom::AtomNode;
pub use object::ObjectNode;
pub use string::StringNode;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("streamed value {got:?} is not a prefix extension of {have:?}")]
    Continuity { have: String, got: String },
    #[error("key {key:?} arrived out of declaration order, after {after:?}")]
    OutOfOrderKey { key: String, after: String },
    #[error("atom failed validation on completion")]
    Validation(#[from] crate::schema::Invalid),
    #[error("expected {expected} at this location, observed {observed}")]
    UnexpectedShape {
        expected: &'static str,
        observed: String,
    },
}

impl Error {
    fn shape(expected: &'static str, observed: &Value) -> Error {
        Error::UnexpectedShape {
            expected,
            observed: observed.to_string(),
        }
    }
}

// Lifecycle callbacks are boxed closures owned by their node. They fire
// synchronously on the stack of the update or complete which triggered
// them; a callback registered after its event has fired never back-fires.
pub(crate) type StartFn = Box<dyn FnMut()>;
pub(crate) type AppendFn = Box<dyn FnMut(&str)>;
pub(crate) type ChildFn = Box<dyn FnMut(&mut Node, usize)>;
pub(crate) type ValueFn = Box<dyn FnMut(&Value)>;

/// Node is the runtime counterpart of a Descriptor: a stateful container
/// which accumulates the document value and raises lifecycle callbacks.
/// Every node moves `idle -> started -> (streaming) -> completed`, with
/// `start` and `complete` each firing at most once.
pub enum Node {
    String(StringNode),
    Atom(AtomNode),
    Array(ArrayNode),
    Object(ObjectNode),
}

impl Node {
    /// Forward the next (partial) observation of this location.
    pub fn update(&mut self, v: &Value) -> Result<(), Error> {
        match self {
            Node::String(n) => n.update(v),
            Node::Atom(n) => n.update(v),
            Node::Array(n) => n.update(v),
            Node::Object(n) => n.update(v),
        }
    }

    /// Mark this location final, completing children as appropriate.
    pub fn complete(&mut self) -> Result<(), Error> {
        match self {
            Node::String(n) => n.complete(),
            Node::Atom(n) => n.complete(),
            Node::Array(n) => n.complete(),
            Node::Object(n) => n.complete(),
        }
    }

    /// Current accumulated value of this location.
    pub fn value(&self) -> Value {
        match self {
            Node::String(n) => n.value(),
            Node::Atom(n) => n.value(),
            Node::Array(n) => n.value(),
            Node::Object(n) => n.value(),
        }
    }

    pub fn is_started(&self) -> bool {
        match self {
            Node::String(n) => n.is_started(),
            Node::Atom(n) => n.is_started(),
            Node::Array(n) => n.is_started(),
            Node::Object(n) => n.is_started(),
        }
    }

    pub fn is_completed(&self) -> bool {
        match self {
            Node::String(n) => n.is_completed(),
            Node::Atom(n) => n.is_completed(),
            Node::Array(n) => n.is_completed(),
            Node::Object(n) => n.is_completed(),
        }
    }

    pub fn as_string_mut(&mut self) -> Option<&mut StringNode> {
        match self {
            Node::String(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_atom_mut(&mut self) -> Option<&mut AtomNode> {
        match self {
            Node::Atom(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayNode> {
        match self {
            Node::Array(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectNode> {
        match self {
            Node::Object(n) => Some(n),
            _ => None,
        }
    }
}
