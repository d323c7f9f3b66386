use crate::op::Operation;
use crate::ptr::Pointer;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Strategy selects how a scalar overwrite is classified.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Strategy {
    /// Emit only standard RFC 6902 operations.
    Standard,
    /// Emit `append` for string overwrites which extend the prior value.
    #[default]
    Efficient,
}

struct Shared {
    strategy: Strategy,
    ops: RefCell<Vec<Operation>>,
}

impl Shared {
    fn record(&self, op: Operation) {
        tracing::trace!(path = op.path(), "recording operation");
        self.ops.borrow_mut().push(op);
    }
}

/// ChangeBuffer accumulates the operations synthesized by every tracked
/// container of one document, in mutation order. It is single-consumer:
/// `flush` both returns and forgets.
#[derive(Clone)]
pub struct ChangeBuffer(Rc<Shared>);

impl ChangeBuffer {
    /// Return the buffered operations and clear the buffer.
    pub fn flush(&self) -> Vec<Operation> {
        std::mem::take(&mut *self.0.ops.borrow_mut())
    }

    /// Return a copy of the buffered operations without clearing.
    pub fn changes(&self) -> Vec<Operation> {
        self.0.ops.borrow().clone()
    }

    /// Discard the buffered operations.
    pub fn clear(&self) {
        self.0.ops.borrow_mut().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.ops.borrow().is_empty()
    }
}

/// Wrap `root` so that every subsequent mutation through the returned
/// handle is recorded as an operation in the returned buffer. Containers
/// are interposed eagerly; containers assigned later are interposed at
/// assignment. Scalars are never interposed.
pub fn track_change(root: Value, strategy: Strategy) -> (Tracked, ChangeBuffer) {
    let shared = Rc::new(Shared {
        strategy,
        ops: RefCell::new(Vec::new()),
    });
    let wrapped = wrap(root, Pointer::empty(), &shared);
    (wrapped, ChangeBuffer(shared))
}

fn wrap(value: Value, path: Pointer, shared: &Rc<Shared>) -> Tracked {
    match value {
        Value::Object(map) => {
            let entries = map
                .into_iter()
                .map(|(key, child)| {
                    let wrapped = wrap(child, path.with_property(&key), shared);
                    (key, wrapped)
                })
                .collect();
            Tracked::Object(TrackedObject(Rc::new(RefCell::new(ObjectInner {
                path,
                entries,
                shared: shared.clone(),
            }))))
        }
        Value::Array(items) => {
            let items = items
                .into_iter()
                .enumerate()
                .map(|(index, child)| wrap(child, path.with_index(index), shared))
                .collect();
            Tracked::Array(TrackedArray(Rc::new(RefCell::new(ArrayInner {
                path,
                items,
                shared: shared.clone(),
            }))))
        }
        scalar => Tracked::Value(scalar),
    }
}

// Classify a scalar-or-container overwrite at `path`, or None when the
// write changes nothing. Under the Efficient strategy a string write
// which strictly extends the prior string becomes an `append` of the
// suffix; everything else replaces.
fn classify(strategy: Strategy, old: &Tracked, new: &Value, path: &Pointer) -> Option<Operation> {
    let old = old.to_value();
    if old == *new {
        return None;
    }
    if let (Strategy::Efficient, Value::String(old), Value::String(new)) = (strategy, &old, new) {
        if new.len() > old.len() && new.starts_with(old.as_str()) {
            return Some(Operation::Append {
                path: path.to_string(),
                value: new[old.len()..].to_string(),
            });
        }
    }
    Some(Operation::Replace {
        path: path.to_string(),
        value: new.clone(),
    })
}

/// Tracked is one node of a wrapped document. Container variants are
/// cheap shared handles: cloning a handle aliases the same container,
/// and reads return the same stable handles, so wrapping is idempotent.
#[derive(Clone)]
pub enum Tracked {
    Object(TrackedObject),
    Array(TrackedArray),
    /// Scalar leaf, read by value.
    Value(Value),
}

impl Tracked {
    /// Plain value of this node and everything beneath it.
    pub fn to_value(&self) -> Value {
        match self {
            Tracked::Object(object) => object.to_value(),
            Tracked::Array(array) => array.to_value(),
            Tracked::Value(value) => value.clone(),
        }
    }

    pub fn as_object(&self) -> Option<TrackedObject> {
        match self {
            Tracked::Object(object) => Some(object.clone()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<TrackedArray> {
        match self {
            Tracked::Array(array) => Some(array.clone()),
            _ => None,
        }
    }
}

struct ObjectInner {
    path: Pointer,
    entries: Vec<(String, Tracked)>,
    shared: Rc<Shared>,
}

/// TrackedObject is an interposed JSON object. Its path is fixed at wrap
/// time: reassigning the same contents elsewhere wraps anew at the new
/// site rather than migrating this handle.
#[derive(Clone)]
pub struct TrackedObject(Rc<RefCell<ObjectInner>>);

impl TrackedObject {
    /// Stable handle (or scalar copy) of the value at `key`.
    pub fn get(&self, key: &str) -> Option<Tracked> {
        self.0
            .borrow()
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, child)| child.clone())
    }

    /// Set `key`, recording `add` for a previously-absent key and a
    /// replace (or append) otherwise.
    pub fn set(&self, key: &str, value: Value) {
        let mut inner = self.0.borrow_mut();
        let shared = inner.shared.clone();
        let path = inner.path.with_property(key);

        match inner.entries.iter().position(|(k, _)| k == key) {
            None => {
                shared.record(Operation::Add {
                    path: path.to_string(),
                    value: value.clone(),
                });
                let wrapped = wrap(value, path, &shared);
                inner.entries.push((key.to_string(), wrapped));
            }
            Some(at) => {
                let op = classify(shared.strategy, &inner.entries[at].1, &value, &path);
                if let Some(op) = op {
                    shared.record(op);
                }
                inner.entries[at].1 = wrap(value, path, &shared);
            }
        }
    }

    /// Remove `key`, recording `remove`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.0.borrow_mut();
        let Some(at) = inner.entries.iter().position(|(k, _)| k == key) else {
            return false;
        };
        inner.entries.remove(at);

        let path = inner.path.with_property(key);
        inner.shared.record(Operation::Remove {
            path: path.to_string(),
        });
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().entries.iter().any(|(k, _)| k == key)
    }

    /// Property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0
            .borrow()
            .entries
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .borrow()
                .entries
                .iter()
                .map(|(k, child)| (k.clone(), child.to_value()))
                .collect(),
        )
    }

    /// The JSON pointer this container was wrapped at.
    pub fn pointer(&self) -> Pointer {
        self.0.borrow().path.clone()
    }
}

struct ArrayInner {
    path: Pointer,
    items: Vec<Tracked>,
    shared: Rc<Shared>,
}

/// TrackedArray is an interposed JSON array, mutated through index
/// assignment, push, pop and splice.
#[derive(Clone)]
pub struct TrackedArray(Rc<RefCell<ArrayInner>>);

impl TrackedArray {
    /// Stable handle (or scalar copy) of the element at `index`.
    pub fn get(&self, index: usize) -> Option<Tracked> {
        self.0.borrow().items.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().items.is_empty()
    }

    /// Assign `index`. An index at or beyond the extent appends, recorded
    /// as `add` of the next index "-"; an in-range assignment replaces
    /// (or appends to) the prior element.
    pub fn set(&self, index: usize, value: Value) {
        let mut inner = self.0.borrow_mut();
        let shared = inner.shared.clone();

        if index < inner.items.len() {
            let path = inner.path.with_index(index);
            let op = classify(shared.strategy, &inner.items[index], &value, &path);
            if let Some(op) = op {
                shared.record(op);
            }
            inner.items[index] = wrap(value, path, &shared);
        } else {
            let path = inner.path.with_index(inner.items.len());
            shared.record(Operation::Add {
                path: inner.path.with_next_index().to_string(),
                value: value.clone(),
            });
            inner.items.push(wrap(value, path, &shared));
        }
    }

    /// Append one element, recorded as `add` of the next index "-".
    pub fn push(&self, value: Value) {
        let len = self.len();
        self.set(len, value);
    }

    /// Append many elements, one `add` each.
    pub fn extend<I: IntoIterator<Item = Value>>(&self, values: I) {
        for value in values {
            self.push(value);
        }
    }

    /// Remove and return the last element, recording `remove` at its index.
    pub fn pop(&self) -> Option<Value> {
        let mut inner = self.0.borrow_mut();
        if inner.items.is_empty() {
            return None;
        }
        let path = inner.path.with_index(inner.items.len() - 1);
        inner.shared.record(Operation::Remove {
            path: path.to_string(),
        });
        inner.items.pop().map(|child| child.to_value())
    }

    /// Remove `delete` elements at `start` and insert `insert` in their
    /// place, returning the removed values. Removals are recorded
    /// deepest-index first so that sequential replay removes exactly the
    /// spliced range; insertions are recorded in index order.
    pub fn splice(&self, start: usize, delete: usize, insert: Vec<Value>) -> Vec<Value> {
        let mut inner = self.0.borrow_mut();
        let shared = inner.shared.clone();

        let start = start.min(inner.items.len());
        let delete = delete.min(inner.items.len() - start);

        for index in (start..start + delete).rev() {
            shared.record(Operation::Remove {
                path: inner.path.with_index(index).to_string(),
            });
        }
        let removed = inner
            .items
            .drain(start..start + delete)
            .map(|child| child.to_value())
            .collect();

        for (offset, value) in insert.into_iter().enumerate() {
            let path = inner.path.with_index(start + offset);
            shared.record(Operation::Add {
                path: path.to_string(),
                value: value.clone(),
            });
            inner.items.insert(start + offset, wrap(value, path, &shared));
        }
        removed
    }

    pub fn to_value(&self) -> Value {
        Value::Array(
            self.0
                .borrow()
                .items
                .iter()
                .map(Tracked::to_value)
                .collect(),
        )
    }

    /// The JSON pointer this container was wrapped at.
    pub fn pointer(&self) -> Pointer {
        self.0.borrow().path.clone()
    }
}
