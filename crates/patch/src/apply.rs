use crate::op::Operation;
use crate::ptr::{Pointer, Token};
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("location {path:?} does not exist in the document")]
    PathNotFound { path: String },
    #[error("array index is out of bounds at {path:?}")]
    OutOfBounds { path: String },
    #[error("cannot remove the document root")]
    RemoveRoot,
    #[error("append target at {path:?} is not a string")]
    AppendTarget { path: String },
    #[error("test failed at {path:?}: document holds {actual}")]
    TestFailed { path: String, actual: Value },
}

/// Replay a sequence of operations into a plain document. Standard
/// operations follow RFC 6902; `append` concatenates onto an existing
/// string at the path. The document is left partially modified if an
/// operation fails.
pub fn apply_change(doc: &mut Value, ops: &[Operation]) -> Result<(), Error> {
    for op in ops {
        apply_one(doc, op)?;
    }
    Ok(())
}

fn apply_one(doc: &mut Value, op: &Operation) -> Result<(), Error> {
    match op {
        Operation::Add { path, value } => add(doc, path, value.clone()),
        Operation::Remove { path } => remove(doc, path).map(|_| ()),
        Operation::Replace { path, value } => {
            let target = Pointer::from(path)
                .query_mut(doc)
                .ok_or_else(|| Error::PathNotFound { path: path.clone() })?;
            *target = value.clone();
            Ok(())
        }
        Operation::Move { from, path } => {
            let value = remove(doc, from)?;
            add(doc, path, value)
        }
        Operation::Copy { from, path } => {
            let value = Pointer::from(from)
                .query(doc)
                .ok_or_else(|| Error::PathNotFound { path: from.clone() })?
                .clone();
            add(doc, path, value)
        }
        Operation::Test { path, value } => {
            let actual = Pointer::from(path)
                .query(doc)
                .ok_or_else(|| Error::PathNotFound { path: path.clone() })?;
            if actual != value {
                return Err(Error::TestFailed {
                    path: path.clone(),
                    actual: actual.clone(),
                });
            }
            Ok(())
        }
        Operation::Append { path, value } => {
            let target = Pointer::from(path)
                .query_mut(doc)
                .ok_or_else(|| Error::PathNotFound { path: path.clone() })?;
            match target {
                Value::String(s) => {
                    s.push_str(value);
                    Ok(())
                }
                _ => Err(Error::AppendTarget { path: path.clone() }),
            }
        }
    }
}

// Split `path` into the parent location and final token, resolving the
// parent. The root path has no parent and is handled by callers.
fn parent_of<'v>(
    doc: &'v mut Value,
    path: &str,
) -> Result<Option<(&'v mut Value, Token)>, Error> {
    let mut ptr = Pointer::from(path);
    let Some(last) = ptr.pop() else {
        return Ok(None);
    };
    let parent = ptr
        .query_mut(doc)
        .ok_or_else(|| Error::PathNotFound {
            path: path.to_string(),
        })?;
    Ok(Some((parent, last)))
}

fn add(doc: &mut Value, path: &str, value: Value) -> Result<(), Error> {
    let Some((parent, last)) = parent_of(doc, path)? else {
        *doc = value;
        return Ok(());
    };
    match (parent, last) {
        (Value::Object(map), Token::Property(key)) => {
            map.insert(key, value);
            Ok(())
        }
        (Value::Object(map), Token::Index(index)) => {
            map.insert(index.to_string(), value);
            Ok(())
        }
        (Value::Object(map), Token::NextIndex) => {
            map.insert("-".to_string(), value);
            Ok(())
        }
        (Value::Array(arr), Token::Index(index)) if index <= arr.len() => {
            arr.insert(index, value);
            Ok(())
        }
        (Value::Array(arr), Token::NextIndex) => {
            arr.push(value);
            Ok(())
        }
        (Value::Array(_), _) => Err(Error::OutOfBounds {
            path: path.to_string(),
        }),
        _ => Err(Error::PathNotFound {
            path: path.to_string(),
        }),
    }
}

fn remove(doc: &mut Value, path: &str) -> Result<Value, Error> {
    let Some((parent, last)) = parent_of(doc, path)? else {
        return Err(Error::RemoveRoot);
    };
    match (parent, last) {
        (Value::Object(map), Token::Property(key)) => {
            map.remove(&key).ok_or_else(|| Error::PathNotFound {
                path: path.to_string(),
            })
        }
        (Value::Object(map), Token::Index(index)) => {
            map.remove(&index.to_string())
                .ok_or_else(|| Error::PathNotFound {
                    path: path.to_string(),
                })
        }
        (Value::Array(arr), Token::Index(index)) if index < arr.len() => Ok(arr.remove(index)),
        (Value::Array(_), _) => Err(Error::OutOfBounds {
            path: path.to_string(),
        }),
        _ => Err(Error::PathNotFound {
            path: path.to_string(),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ops(v: Value) -> Vec<Operation> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_apply_round_trip() {
        let mut doc = json!({"todos": []});
        apply_change(
            &mut doc,
            &ops(json!([
                {"op": "add", "path": "/todos/-", "value": "a"},
                {"op": "add", "path": "/todos/-", "value": "b"},
                {"op": "append", "path": "/todos/0", "value": " !"},
            ])),
        )
        .unwrap();

        assert_eq!(doc, json!({"todos": ["a !", "b"]}));
    }

    #[test]
    fn test_standard_operations() {
        let mut doc = json!({"a": {"b": 1}, "arr": [1, 2, 3]});
        apply_change(
            &mut doc,
            &ops(json!([
                {"op": "replace", "path": "/a/b", "value": 2},
                {"op": "add", "path": "/arr/1", "value": 99},
                {"op": "remove", "path": "/arr/0"},
                {"op": "move", "from": "/a/b", "path": "/moved"},
                {"op": "copy", "from": "/moved", "path": "/copied"},
                {"op": "test", "path": "/copied", "value": 2},
            ])),
        )
        .unwrap();

        assert_eq!(
            doc,
            json!({"a": {}, "arr": [99, 2, 3], "moved": 2, "copied": 2})
        );
    }

    #[test]
    fn test_add_at_root_replaces_document() {
        let mut doc = json!(null);
        apply_change(
            &mut doc,
            &ops(json!([{"op": "add", "path": "", "value": {"fresh": true}}])),
        )
        .unwrap();
        assert_eq!(doc, json!({"fresh": true}));
    }

    #[test]
    fn test_apply_errors() {
        let cases = [
            (
                json!({"op": "replace", "path": "/missing", "value": 1}),
                "location \"/missing\" does not exist in the document",
            ),
            (
                json!({"op": "append", "path": "/n", "value": "x"}),
                "append target at \"/n\" is not a string",
            ),
            (
                json!({"op": "add", "path": "/arr/9", "value": 1}),
                "array index is out of bounds at \"/arr/9\"",
            ),
            (
                json!({"op": "remove", "path": "/arr/-"}),
                "array index is out of bounds at \"/arr/-\"",
            ),
            (
                json!({"op": "test", "path": "/n", "value": 2}),
                "test failed at \"/n\": document holds 1",
            ),
            (
                json!({"op": "remove", "path": ""}),
                "cannot remove the document root",
            ),
        ];

        for (op, expect) in cases {
            let mut doc = json!({"n": 1, "arr": []});
            let err = apply_change(&mut doc, &ops(json!([op]))).unwrap_err();
            assert_eq!(err.to_string(), expect);
        }
    }
}
