use super::{ChildFn, Error, Node, StartFn, ValueFn};
use crate::schema::Descriptor;
use serde_json::Value;

/// ArrayNode materializes a child node per element, in index order.
/// When an observation grows the array, every element which is no longer
/// last is known to be final: its child receives the final value and
/// completes. The trailing element keeps streaming until the array itself
/// grows past it or completes.
pub struct ArrayNode {
    element: Descriptor,
    started: bool,
    completed: bool,
    children: Vec<Node>,
    on_start: Vec<StartFn>,
    on_append: Vec<ChildFn>,
    on_complete: Vec<ValueFn>,
}

impl ArrayNode {
    pub(crate) fn new(element: Descriptor) -> ArrayNode {
        ArrayNode {
            element,
            started: false,
            completed: false,
            children: Vec::new(),
            on_start: Vec::new(),
            on_append: Vec::new(),
            on_complete: Vec::new(),
        }
    }

    /// Fired once, on the first observation of this location.
    pub fn on_start(&mut self, cb: impl FnMut() + 'static) {
        self.on_start.push(Box::new(cb));
    }

    /// Fired with each newly-observed element, in strictly increasing
    /// index order, before the child observes its first value. Register
    /// the child's callbacks here.
    pub fn on_append(&mut self, cb: impl FnMut(&mut Node, usize) + 'static) {
        self.on_append.push(Box::new(cb));
    }

    /// Fired once with the final array of element values. A location the
    /// document held null (or never populated) completes as the empty array.
    pub fn on_complete(&mut self, cb: impl FnMut(&Value) + 'static) {
        self.on_complete.push(Box::new(cb));
    }

    pub fn value(&self) -> Value {
        Value::Array(self.children.iter().map(Node::value).collect())
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.children.get_mut(index)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn update(&mut self, v: &Value) -> Result<(), Error> {
        if self.completed {
            return Ok(());
        }
        if !self.started {
            self.started = true;
            for cb in self.on_start.iter_mut() {
                cb();
            }
        }

        let items = match v {
            // Null is recorded; the array completes empty unless items arrive.
            Value::Null => return Ok(()),
            Value::Array(items) => items,
            other => return Err(Error::shape("an array", other)),
        };

        let prev = self.children.len();
        if items.len() < prev {
            return Err(Error::shape("a monotonically growing array", v));
        }

        if items.len() == prev {
            if let Some(last) = self.children.last_mut() {
                last.update(&items[prev - 1])?;
            }
            return Ok(());
        }

        // The element previously last is now known to be final.
        if prev > 0 {
            let last = &mut self.children[prev - 1];
            last.update(&items[prev - 1])?;
            last.complete()?;
        }

        for (index, item) in items.iter().enumerate().skip(prev) {
            self.children.push(self.element.create());

            let (children, on_append) = (&mut self.children, &mut self.on_append);
            let child = children.last_mut().unwrap();
            for cb in on_append.iter_mut() {
                cb(child, index);
            }

            child.update(item)?;
            if index + 1 < items.len() {
                child.complete()?;
            }
        }
        Ok(())
    }

    pub(crate) fn complete(&mut self) -> Result<(), Error> {
        if self.completed {
            return Ok(());
        }
        if let Some(last) = self.children.last_mut() {
            last.complete()?;
        }
        self.completed = true;
        let value = self.value();
        for cb in self.on_complete.iter_mut() {
            cb(&value);
        }
        Ok(())
    }
}
