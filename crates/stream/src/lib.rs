// Schema-bound streaming over JSON which arrives a chunk at a time,
// as produced by a language model emitting structured output.
//
// A Descriptor declares the document shape and materializes a tree of
// streaming Nodes. A Parser feeds character chunks through a tolerant
// Scanner and routes each observation onto the node tree, which raises
// start / append / update / complete callbacks as the document grows.

// Descriptors declare the streaming shape of a document, and map to and
// from external validation schemas.
pub mod schema;
pub use schema::{array, atom, boolean, number, object, string};
pub use schema::{from_external_schema, Descriptor, Invalid, Validate};

// Nodes are the runtime counterparts of descriptors, holding the
// accumulating value and lifecycle callbacks.
pub mod node;
pub use node::{ArrayNode, AtomNode, Node, ObjectNode, StringNode};

// Scanner turns a chunked character stream into observations of the
// current partial document.
pub mod scan;
pub use scan::{Observation, Scanner, Status};

// Parser drives observations onto a node tree.
pub mod parser;
pub use parser::Parser;
