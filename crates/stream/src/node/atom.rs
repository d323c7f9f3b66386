use super::{Error, StartFn, ValueFn};
use crate::schema::Validate;
use serde_json::Value;
use std::sync::Arc;

/// AtomNode records a value which is meaningful only as a whole. The raw
/// value is re-recorded as observations arrive and validated exactly once,
/// at completion, so partial mid-stream values can never fail validation.
pub struct AtomNode {
    schema: Option<Value>,
    validator: Option<Arc<dyn Validate>>,
    started: bool,
    completed: bool,
    raw: Option<Value>,
    on_start: Vec<StartFn>,
    on_complete: Vec<ValueFn>,
}

impl AtomNode {
    pub(crate) fn new(schema: Option<Value>, validator: Option<Arc<dyn Validate>>) -> AtomNode {
        AtomNode {
            schema,
            validator,
            started: false,
            completed: false,
            raw: None,
            on_start: Vec::new(),
            on_complete: Vec::new(),
        }
    }

    /// Fired once, on the first observation of this location.
    pub fn on_start(&mut self, cb: impl FnMut() + 'static) {
        self.on_start.push(Box::new(cb));
    }

    /// Fired once with the validated value.
    pub fn on_complete(&mut self, cb: impl FnMut(&Value) + 'static) {
        self.on_complete.push(Box::new(cb));
    }

    pub fn value(&self) -> Value {
        self.raw.clone().unwrap_or(Value::Null)
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
        self.raw = Some(v.clone());
        Ok(())
    }

    pub(crate) fn complete(&mut self) -> Result<(), Error> {
        if self.completed {
            return Ok(());
        }
        let value = self.value();
        if let Some(validator) = &self.validator {
            validator.validate(self.schema.as_ref(), &value)?;
        }
        self.completed = true;
        for cb in self.on_complete.iter_mut() {
            cb(&value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::Invalid;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn non_negative(_schema: Option<&Value>, value: &Value) -> Result<(), Invalid> {
        match value.as_i64() {
            Some(n) if n >= 0 => Ok(()),
            _ => Err(Invalid {
                reason: format!("{value} is not a non-negative integer"),
            }),
        }
    }

    #[test]
    fn test_validates_only_on_complete() {
        let mut node = AtomNode::new(None, Some(Arc::new(non_negative)));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        node.on_complete(move |v| s.borrow_mut().push(v.clone()));

        // Intermediate values are recorded without validation.
        node.update(&json!(-3)).unwrap();
        node.update(&json!(42)).unwrap();
        node.complete().unwrap();

        assert_eq!(seen.borrow().as_slice(), [json!(42)]);
    }

    #[test]
    fn test_validation_failure_surfaces() {
        let mut node = AtomNode::new(None, Some(Arc::new(non_negative)));
        node.update(&json!(-3)).unwrap();

        let err = node.complete().unwrap_err();
        assert_eq!(
            err.to_string(),
            "atom failed validation on completion"
        );
        assert!(!node.is_completed());
    }
}
