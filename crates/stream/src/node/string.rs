use super::{AppendFn, Error, StartFn, ValueFn};
use serde_json::Value;

/// StringNode accumulates a string leaf which only ever grows by prefix
/// extension. Each extension fires `append` with the newly-arrived suffix.
pub struct StringNode {
    started: bool,
    completed: bool,
    value: Option<String>,
    on_start: Vec<StartFn>,
    on_append: Vec<AppendFn>,
    on_complete: Vec<ValueFn>,
}

impl StringNode {
    pub(crate) fn new() -> StringNode {
        StringNode {
            started: false,
            completed: false,
            value: None,
            on_start: Vec::new(),
            on_append: Vec::new(),
            on_complete: Vec::new(),
        }
    }

    /// Fired once, on the first observation of this location.
    pub fn on_start(&mut self, cb: impl FnMut() + 'static) {
        self.on_start.push(Box::new(cb));
    }

    /// Fired with each appended chunk, in document order. Concatenating
    /// every chunk yields the final string.
    pub fn on_append(&mut self, cb: impl FnMut(&str) + 'static) {
        self.on_append.push(Box::new(cb));
    }

    /// Fired once with the final value, which is null if the document
    /// held null (or nothing) at this location.
    pub fn on_complete(&mut self, cb: impl FnMut(&Value) + 'static) {
        self.on_complete.push(Box::new(cb));
    }

    pub fn value(&self) -> Value {
        match &self.value {
            Some(s) => Value::String(s.clone()),
            None => Value::Null,
        }
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

        let next = match v {
            // Null is recorded, but appends only begin once a string arrives.
            Value::Null => return Ok(()),
            Value::String(next) => next,
            other => return Err(Error::shape("a string", other)),
        };

        if let Some(have) = &self.value {
            if next == have {
                return Ok(());
            }
            if !next.starts_with(have.as_str()) {
                return Err(Error::Continuity {
                    have: have.clone(),
                    got: next.clone(),
                });
            }
            let delta = next[have.len()..].to_string();
            self.value = Some(next.clone());
            for cb in self.on_append.iter_mut() {
                cb(&delta);
            }
        } else {
            self.value = Some(next.clone());
            if !next.is_empty() {
                for cb in self.on_append.iter_mut() {
                    cb(next);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn complete(&mut self) -> Result<(), Error> {
        if self.completed {
            return Ok(());
        }
        self.completed = true;
        let value = self.value();
        for cb in self.on_complete.iter_mut() {
            cb(&value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorded() -> (StringNode, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut node = StringNode::new();

        let l = log.clone();
        node.on_start(move || l.borrow_mut().push("start".to_string()));
        let l = log.clone();
        node.on_append(move |chunk| l.borrow_mut().push(format!("append {chunk:?}")));
        let l = log.clone();
        node.on_complete(move |v| l.borrow_mut().push(format!("complete {v}")));

        (node, log)
    }

    #[test]
    fn test_prefix_extension() {
        let (mut node, log) = recorded();

        node.update(&json!("Hel")).unwrap();
        node.update(&json!("Hel")).unwrap(); // Identical: no event.
        node.update(&json!("Hello, wor")).unwrap();
        node.update(&json!("Hello, world")).unwrap();
        node.complete().unwrap();
        node.complete().unwrap(); // Idempotent.

        assert_eq!(
            log.borrow().as_slice(),
            [
                "start",
                "append \"Hel\"",
                "append \"lo, wor\"",
                "append \"ld\"",
                "complete \"Hello, world\"",
            ]
        );
    }

    #[test]
    fn test_continuity_violation() {
        let (mut node, _log) = recorded();

        node.update(&json!("Hello")).unwrap();
        let err = node.update(&json!("Goodbye")).unwrap_err();
        assert!(matches!(err, Error::Continuity { .. }));
    }

    #[test]
    fn test_null_value() {
        let (mut node, log) = recorded();

        node.update(&Value::Null).unwrap();
        node.complete().unwrap();

        assert_eq!(log.borrow().as_slice(), ["start", "complete null"]);
    }

    #[test]
    fn test_late_registration_does_not_back_fire() {
        let (mut node, log) = recorded();
        node.update(&json!("x")).unwrap();

        let l = log.clone();
        node.on_start(move || l.borrow_mut().push("late start".to_string()));
        node.complete().unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            ["start", "append \"x\"", "complete \"x\""]
        );
    }
}
