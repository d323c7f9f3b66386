use super::{Error, Node, StartFn, ValueFn};
use itertools::Itertools;
use serde_json::Value;

/// ObjectNode holds its fields in declaration order, which doubles as the
/// order keys are expected to arrive on the wire. Observing a
/// later-declared field confirms that every earlier observed field has
/// received its final value, so those children complete eagerly. This is
/// what makes fine-grained streaming possible before the closing brace
/// arrives.
pub struct ObjectNode {
    started: bool,
    completed: bool,
    fields: Vec<(String, Node)>,
    last_key_index: Option<usize>,
    on_start: Vec<StartFn>,
    on_update: Vec<ValueFn>,
    on_complete: Vec<ValueFn>,
}

impl ObjectNode {
    pub(crate) fn new(fields: Vec<(String, Node)>) -> ObjectNode {
        ObjectNode {
            started: false,
            completed: false,
            fields,
            last_key_index: None,
            on_start: Vec::new(),
            on_update: Vec::new(),
            on_complete: Vec::new(),
        }
    }

    /// Fired once, on the first observation of this location.
    pub fn on_start(&mut self, cb: impl FnMut() + 'static) {
        self.on_start.push(Box::new(cb));
    }

    /// Fired with the raw partial value after each observation routes.
    pub fn on_update(&mut self, cb: impl FnMut(&Value) + 'static) {
        self.on_update.push(Box::new(cb));
    }

    /// Fired once with the final value. Fields never observed do not
    /// appear, and their own complete callbacks never fire.
    pub fn on_complete(&mut self, cb: impl FnMut(&Value) + 'static) {
        self.on_complete.push(Box::new(cb));
    }

    /// Field names in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.fields.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn field_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.fields
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node)
    }

    pub fn value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .filter(|(_, node)| node.is_started())
                .map(|(key, node)| (key.clone(), node.value()))
                .collect(),
        )
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

        let map = match v {
            Value::Null => return Ok(()),
            Value::Object(map) => map,
            other => return Err(Error::shape("an object", other)),
        };

        // Declared keys present in the observation, in arrival order.
        // Keys outside the schema are skipped: the schema constrains
        // generation, but a tolerant reader steps over strays.
        let present: Vec<(usize, &str)> = map
            .keys()
            .filter_map(|key| {
                self.fields
                    .iter()
                    .position(|(k, _)| k == key)
                    .map(|index| (index, key.as_str()))
            })
            .collect();

        // Declaration indices must be increasing in arrival order.
        for ((prev_index, prev_key), (index, key)) in present.iter().tuple_windows() {
            if index < prev_index {
                return Err(Error::OutOfOrderKey {
                    key: key.to_string(),
                    after: prev_key.to_string(),
                });
            }
        }

        let Some((max_index, _)) = present.last().copied() else {
            for cb in self.on_update.iter_mut() {
                cb(v);
            }
            return Ok(());
        };

        // Every earlier declared field which is present has received its
        // final value: forward it and complete, before the current field
        // observes anything.
        for index in 0..max_index {
            let (key, child) = &mut self.fields[index];
            let Some(fv) = map.get(key.as_str()) else {
                continue;
            };
            if child.is_completed() {
                continue;
            }
            child.update(fv)?;
            child.complete()?;
        }

        let (key, child) = &mut self.fields[max_index];
        if let Some(fv) = map.get(key.as_str()) {
            child.update(fv)?;
        }
        self.last_key_index = Some(max_index);

        for cb in self.on_update.iter_mut() {
            cb(v);
        }
        Ok(())
    }

    pub(crate) fn complete(&mut self) -> Result<(), Error> {
        if self.completed {
            return Ok(());
        }
        if let Some(index) = self.last_key_index {
            self.fields[index].1.complete()?;
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
    use crate::schema;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorded() -> (ObjectNode, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let descriptor = schema::object([("a", schema::string()), ("b", schema::string())]);
        let Node::Object(mut node) = descriptor.create() else {
            panic!("expected an object node");
        };

        for key in ["a", "b"] {
            let child = node.field_mut(key).unwrap().as_string_mut().unwrap();
            let l = log.clone();
            child.on_append(move |chunk| l.borrow_mut().push(format!("append {key} {chunk:?}")));
            let l = log.clone();
            child.on_complete(move |v| l.borrow_mut().push(format!("complete {key} {v}")));
        }
        let l = log.clone();
        node.on_complete(move |v| l.borrow_mut().push(format!("complete {v}")));

        (node, log)
    }

    #[test]
    fn test_later_field_finalizes_earlier() {
        let (mut node, log) = recorded();

        // Both fields arrive in one observation: `a` is final before any
        // callback on `b`.
        node.update(&json!({"a": "x", "b": "y"})).unwrap();
        node.complete().unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            [
                "append a \"x\"",
                "complete a \"x\"",
                "append b \"y\"",
                "complete b \"y\"",
                "complete {\"a\":\"x\",\"b\":\"y\"}",
            ]
        );
    }

    #[test]
    fn test_incremental_arrival() {
        let (mut node, log) = recorded();

        node.update(&json!({"a": "x"})).unwrap();
        node.update(&json!({"a": "xy"})).unwrap();
        node.update(&json!({"a": "xy", "b": ""})).unwrap();
        node.update(&json!({"a": "xy", "b": "z"})).unwrap();
        node.complete().unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            [
                "append a \"x\"",
                "append a \"y\"",
                "complete a \"xy\"",
                "append b \"z\"",
                "complete b \"z\"",
                "complete {\"a\":\"xy\",\"b\":\"z\"}",
            ]
        );
    }

    #[test]
    fn test_unobserved_fields_never_complete() {
        let (mut node, log) = recorded();

        node.update(&json!({"a": "x"})).unwrap();
        node.complete().unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            ["append a \"x\"", "complete a \"x\"", "complete {\"a\":\"x\"}"]
        );
    }

    #[test]
    fn test_out_of_order_key() {
        let (mut node, _log) = recorded();

        node.update(&json!({"b": "y"})).unwrap();
        // `a` newly arrives after the later-declared `b` was observed.
        let err = node
            .update(&serde_json::from_str(r#"{"b": "y", "a": "x"}"#).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::OutOfOrderKey { .. }));
    }

    #[test]
    fn test_stray_keys_are_ignored() {
        let (mut node, log) = recorded();

        node.update(&json!({"extra": 1, "a": "x"})).unwrap();
        node.complete().unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            ["append a \"x\"", "complete a \"x\"", "complete {\"a\":\"x\"}"]
        );
    }
}
