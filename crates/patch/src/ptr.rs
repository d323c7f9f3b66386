use serde_json::Value;
use std::fmt::{self, Display, Write};

/// Token is one reference token of a JSON pointer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Token {
    /// A canonical decimal array index. Objects resolve it as a property
    /// of the same spelling.
    Index(usize),
    /// An object property name. Never a canonical integer.
    Property(String),
    /// The "-" token: one past the current extent of an array.
    NextIndex,
}

impl Token {
    // Classify one raw (still-escaped) reference token. A token is an
    // Index only when it is the canonical rendering of a usize, so
    // "007", "+1", and out-of-range digit runs stay properties.
    fn parse(raw: &str) -> Token {
        let text = unescape(raw);
        if text == "-" {
            return Token::NextIndex;
        }
        match text.parse::<usize>() {
            Ok(index) if index.to_string() == text => Token::Index(index),
            _ => Token::Property(text),
        }
    }
}

// Decode the "~0" / "~1" escapes of one reference token. A dangling or
// unrecognized escape passes through undecoded rather than failing:
// pointer parsing is infallible and bad escapes surface as lookup misses.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            Some(other) => {
                out.push('~');
                out.push(other);
            }
            None => out.push('~'),
        }
    }
    out
}

/// Pointer is a parsed JSON pointer.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Pointer(Vec<Token>);

impl Pointer {
    /// Builds an empty Pointer which references the document root.
    pub fn empty() -> Pointer {
        Pointer(Vec::new())
    }

    /// Parse an encoded JSON pointer. The empty string is the root, and a
    /// missing leading '/' is tolerated (the first token then starts at
    /// the beginning of the string).
    pub fn from_str(s: &str) -> Pointer {
        let mut tokens = Vec::new();
        for (i, raw) in s.split('/').enumerate() {
            // Everything before the first '/' is empty in a well-formed
            // pointer. When it is not, treat it as an un-rooted token.
            if i == 0 && raw.is_empty() {
                continue;
            }
            tokens.push(Token::parse(raw));
        }
        Pointer(tokens)
    }

    /// Push a new Token onto the Pointer.
    pub fn push(&mut self, token: Token) -> &mut Pointer {
        self.0.push(token);
        self
    }

    /// Pop the last token from the Pointer.
    pub fn pop(&mut self) -> Option<Token> {
        self.0.pop()
    }

    /// Pointer extended with an object property.
    pub fn with_property(&self, name: &str) -> Pointer {
        let mut next = self.clone();
        next.push(Token::Property(name.to_string()));
        next
    }

    /// Pointer extended with an array index.
    pub fn with_index(&self, index: usize) -> Pointer {
        let mut next = self.clone();
        next.push(Token::Index(index));
        next
    }

    /// Pointer extended with the next-index token "-".
    pub fn with_next_index(&self) -> Pointer {
        let mut next = self.clone();
        next.push(Token::NextIndex);
        next
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.0.iter()
    }

    /// Query an existing value at the pointer location within the document.
    /// Returns None if the pointed location (or a parent thereof) does not exist.
    pub fn query<'v>(&self, doc: &'v Value) -> Option<&'v Value> {
        let mut v = doc;

        for token in self.iter() {
            let next = match v {
                Value::Object(map) => match token {
                    Token::Index(ind) => map.get(&ind.to_string()),
                    Token::Property(prop) => map.get(prop),
                    Token::NextIndex => map.get("-"),
                },
                Value::Array(arr) => match token {
                    Token::Index(ind) => arr.get(*ind),
                    Token::Property(_) | Token::NextIndex => None,
                },
                _ => None,
            };

            match next {
                Some(vv) => v = vv,
                None => return None,
            }
        }
        Some(v)
    }

    /// Query a mutable existing value at the pointer location, without
    /// creating locations which do not exist.
    pub fn query_mut<'v>(&self, doc: &'v mut Value) -> Option<&'v mut Value> {
        let mut v = doc;

        for token in self.iter() {
            let next = match v {
                Value::Object(map) => match token {
                    Token::Index(ind) => map.get_mut(&ind.to_string()),
                    Token::Property(prop) => map.get_mut(prop),
                    Token::NextIndex => map.get_mut("-"),
                },
                Value::Array(arr) => match token {
                    Token::Index(ind) => arr.get_mut(*ind),
                    Token::Property(_) | Token::NextIndex => None,
                },
                _ => None,
            };

            match next {
                Some(vv) => v = vv,
                None => return None,
            }
        }
        Some(v)
    }
}

impl Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.iter() {
            f.write_char('/')?;
            match token {
                Token::NextIndex => f.write_char('-')?,
                Token::Index(index) => write!(f, "{index}")?,
                Token::Property(prop) => {
                    for c in prop.chars() {
                        match c {
                            '~' => f.write_str("~0")?,
                            '/' => f.write_str("~1")?,
                            c => f.write_char(c)?,
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl<S: AsRef<str>> From<S> for Pointer {
    fn from(s: S) -> Self {
        Pointer::from_str(s.as_ref())
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_token_classification() {
        use Token::*;

        // Only the canonical decimal rendering of a usize is an Index;
        // signs, zero-padding, and overflow all classify as properties.
        let ptr = Pointer::from("/todos/0/note~0s/a~1b/-/007/+1/9999/99999999999999999999999");
        assert_eq!(
            ptr.tokens(),
            [
                Property("todos".to_string()),
                Index(0),
                Property("note~s".to_string()),
                Property("a/b".to_string()),
                NextIndex,
                Property("007".to_string()),
                Property("+1".to_string()),
                Index(9999),
                Property("99999999999999999999999".to_string()),
            ]
        );
    }

    #[test]
    fn test_degenerate_pointers() {
        use Token::*;

        assert!(Pointer::from("").tokens().is_empty());
        // "/" addresses the property named "".
        assert_eq!(Pointer::from("/").tokens(), [Property(String::new())]);
        // A dangling or unknown escape passes through undecoded.
        assert_eq!(Pointer::from("/~").tokens(), [Property("~".to_string())]);
        assert_eq!(Pointer::from("/x~2y").tokens(), [Property("x~2y".to_string())]);
        // A missing leading slash is tolerated.
        assert_eq!(
            Pointer::from("a/1").tokens(),
            [Property("a".to_string()), Index(1)]
        );
    }

    #[test]
    fn test_display_escapes_and_round_trips() {
        let built = Pointer::empty()
            .with_property("todos")
            .with_index(3)
            .with_property("a/b~c")
            .with_next_index();

        assert_eq!(built.to_string(), "/todos/3/a~1b~0c/-");
        assert_eq!(Pointer::from("/todos/3/a~1b~0c/-"), built);
    }

    #[test]
    fn test_query() {
        let doc = json!({
            "todos": [
                {"name": "walk dog", "done": false},
                {"name": "water plants", "done": true},
            ],
            "owner/id": "u-1",
            "no~tes": null,
            "3": "a property, not an index",
        });

        assert_eq!(Pointer::from("").query(&doc), Some(&doc));
        assert_eq!(
            Pointer::from("/todos/1/name").query(&doc),
            Some(&json!("water plants"))
        );
        assert_eq!(Pointer::from("/owner~1id").query(&doc), Some(&json!("u-1")));
        assert_eq!(Pointer::from("/no~0tes").query(&doc), Some(&json!(null)));
        // An Index token resolves against an object by its spelling.
        assert_eq!(
            Pointer::from("/3").query(&doc),
            Some(&json!("a property, not an index"))
        );

        // Locations which do not resolve: an index past the extent, a
        // property of an array, a child of a scalar, an absent key.
        for miss in ["/todos/2", "/todos/done", "/todos/0/name/x", "/absent"] {
            assert_eq!(Pointer::from(miss).query(&doc), None, "{miss}");
        }
    }

    #[test]
    fn test_query_mut_writes_in_place() {
        let mut doc = json!({"todos": [{"done": false}]});

        *Pointer::from("/todos/0/done").query_mut(&mut doc).unwrap() = json!(true);
        assert_eq!(doc, json!({"todos": [{"done": true}]}));

        // NextIndex is one past the extent: never an existing element.
        assert!(Pointer::from("/todos/-").query_mut(&mut doc).is_none());
    }
}
