// Mutation tracking over in-memory JSON documents. A tracked document
// interposes its containers so that every mutation synthesizes a JSON
// Patch operation against the container's JSON-Pointer path, batched in
// a change buffer for shipment to a remote replica which replays them
// with `apply_change`.

// A JSON Pointer implementation used by every operation path.
pub mod ptr;
pub use ptr::{Pointer, Token};

// The operation wire format: RFC 6902 plus the `append` extension.
pub mod op;
pub use op::Operation;

// Tracked containers and the change buffer.
pub mod track;
pub use track::{track_change, ChangeBuffer, Strategy, Tracked, TrackedArray, TrackedObject};

// Replay of operation sequences into a plain document.
pub mod apply;
pub use apply::apply_change;
