use serde_json::Value;

/// Operation is one JSON Patch operation. The wire format is RFC 6902
/// `{op, path, value?, from?}`, extended with `append`, which means
/// "concatenate `value` onto the string at `path`". Receivers which know
/// the extension apply it in place; all other operations are standard.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
    Append { path: String, value: String },
}

impl Operation {
    pub fn path(&self) -> &str {
        match self {
            Operation::Add { path, .. }
            | Operation::Remove { path }
            | Operation::Replace { path, .. }
            | Operation::Move { path, .. }
            | Operation::Copy { path, .. }
            | Operation::Test { path, .. }
            | Operation::Append { path, .. } => path,
        }
    }
}
