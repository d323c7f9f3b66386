use serde_json::{Map, Value};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("input continues past the end of the document at offset {offset}")]
    TrailingInput { offset: usize },
    #[error("malformed JSON at offset {offset}: {reason}")]
    Syntax { offset: usize, reason: &'static str },
}

/// Status of the accumulated document.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    Partial,
    Completed,
}

/// Observation of the current partial document: a value isomorphic to the
/// final JSON tree, with trailing unfinished strings exposed as their
/// accumulated prefix and unfinished containers as their known members.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub value: Value,
    pub status: Status,
}

/// Scanner consumes character chunks of a single JSON document. After each
/// push it exposes the longest partial value which is unambiguously
/// determined so far. Observations are monotone: every key and index
/// survives into the next observation, and string leaves only ever extend.
///
/// A trailing half-escape is withheld until it decodes (up to the twelve
/// characters of a surrogate-pair escape), and a trailing number or
/// `true`/`false`/`null` literal is withheld until a character arrives
/// which cannot extend it.
pub struct Scanner {
    buf: String,
}

impl Scanner {
    pub fn new() -> Scanner {
        Scanner { buf: String::new() }
    }

    /// Feed the next chunk, returning the current observation, or None
    /// while no value can be exposed yet.
    pub fn push(&mut self, chunk: &str) -> Result<Option<Observation>, Error> {
        self.buf.push_str(chunk);
        derive(&self.buf, false)
    }

    /// Signal end of input. A withheld trailing number or literal is
    /// resolved by the fact that nothing further can extend it.
    pub fn finish(&self) -> Result<Option<Observation>, Error> {
        derive(&self.buf, true)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Scanner::new()
    }
}

fn derive(buf: &str, at_end: bool) -> Result<Option<Observation>, Error> {
    let mut p = Parse {
        buf: buf.as_bytes(),
        at: 0,
        at_end,
    };
    p.ws();
    if p.eof() {
        return Ok(None);
    }
    match p.value()? {
        Parsed::Complete(value) => {
            p.ws();
            if !p.eof() {
                return Err(Error::TrailingInput { offset: p.at });
            }
            Ok(Some(Observation {
                value,
                status: Status::Completed,
            }))
        }
        Parsed::Partial(value) => Ok(Some(Observation {
            value,
            status: Status::Partial,
        })),
        Parsed::Pending => Ok(None),
    }
}

// A value as understood so far: fully closed, open at the end of input,
// or started but not yet exposable (a number or literal which could
// still extend).
enum Parsed {
    Complete(Value),
    Partial(Value),
    Pending,
}

enum Scanned {
    Complete(String),
    Partial(String),
}

enum Escape {
    Char(char),
    Incomplete,
}

struct Parse<'b> {
    buf: &'b [u8],
    at: usize,
    at_end: bool,
}

impl<'b> Parse<'b> {
    fn eof(&self) -> bool {
        self.at >= self.buf.len()
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.at).copied()
    }

    fn byte(&self, at: usize) -> Option<u8> {
        self.buf.get(at).copied()
    }

    fn ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.at += 1;
        }
    }

    fn err(&self, reason: &'static str) -> Error {
        Error::Syntax {
            offset: self.at,
            reason,
        }
    }

    fn value(&mut self) -> Result<Parsed, Error> {
        match self.peek() {
            Some(b'{') => self.object(),
            Some(b'[') => self.array(),
            Some(b'"') => Ok(match self.string()? {
                Scanned::Complete(s) => Parsed::Complete(Value::String(s)),
                Scanned::Partial(s) => Parsed::Partial(Value::String(s)),
            }),
            Some(b'-' | b'0'..=b'9') => self.number(),
            Some(b't' | b'f' | b'n') => self.literal(),
            Some(_) => Err(self.err("expected a JSON value")),
            None => Ok(Parsed::Pending),
        }
    }

    fn object(&mut self) -> Result<Parsed, Error> {
        self.at += 1; // Consume '{'.
        let mut map = Map::new();

        self.ws();
        if self.peek() == Some(b'}') {
            self.at += 1;
            return Ok(Parsed::Complete(Value::Object(map)));
        }
        loop {
            if self.eof() {
                return Ok(Parsed::Partial(Value::Object(map)));
            }
            if self.peek() != Some(b'"') {
                return Err(self.err("expected a property name"));
            }
            let key = match self.string()? {
                Scanned::Complete(key) => key,
                // A half-received key leaves the property unobserved.
                Scanned::Partial(_) => return Ok(Parsed::Partial(Value::Object(map))),
            };
            self.ws();
            match self.peek() {
                None => return Ok(Parsed::Partial(Value::Object(map))),
                Some(b':') => self.at += 1,
                Some(_) => return Err(self.err("expected ':'")),
            }
            self.ws();
            if self.eof() {
                return Ok(Parsed::Partial(Value::Object(map)));
            }
            match self.value()? {
                Parsed::Complete(v) => {
                    map.insert(key, v);
                }
                Parsed::Partial(v) => {
                    map.insert(key, v);
                    return Ok(Parsed::Partial(Value::Object(map)));
                }
                Parsed::Pending => return Ok(Parsed::Partial(Value::Object(map))),
            }
            self.ws();
            match self.peek() {
                None => return Ok(Parsed::Partial(Value::Object(map))),
                Some(b',') => {
                    self.at += 1;
                    self.ws();
                    if self.peek() == Some(b'}') {
                        return Err(self.err("trailing comma"));
                    }
                }
                Some(b'}') => {
                    self.at += 1;
                    return Ok(Parsed::Complete(Value::Object(map)));
                }
                Some(_) => return Err(self.err("expected ',' or '}'")),
            }
        }
    }

    fn array(&mut self) -> Result<Parsed, Error> {
        self.at += 1; // Consume '['.
        let mut items = Vec::new();

        self.ws();
        if self.peek() == Some(b']') {
            self.at += 1;
            return Ok(Parsed::Complete(Value::Array(items)));
        }
        loop {
            if self.eof() {
                return Ok(Parsed::Partial(Value::Array(items)));
            }
            match self.value()? {
                Parsed::Complete(v) => items.push(v),
                Parsed::Partial(v) => {
                    items.push(v);
                    return Ok(Parsed::Partial(Value::Array(items)));
                }
                Parsed::Pending => return Ok(Parsed::Partial(Value::Array(items))),
            }
            self.ws();
            match self.peek() {
                None => return Ok(Parsed::Partial(Value::Array(items))),
                Some(b',') => {
                    self.at += 1;
                    self.ws();
                    if self.peek() == Some(b']') {
                        return Err(self.err("trailing comma"));
                    }
                }
                Some(b']') => {
                    self.at += 1;
                    return Ok(Parsed::Complete(Value::Array(items)));
                }
                Some(_) => return Err(self.err("expected ',' or ']'")),
            }
        }
    }

    fn string(&mut self) -> Result<Scanned, Error> {
        self.at += 1; // Consume '"'.
        let mut out = String::new();

        loop {
            let Some(b) = self.peek() else {
                return Ok(Scanned::Partial(out));
            };
            match b {
                b'"' => {
                    self.at += 1;
                    return Ok(Scanned::Complete(out));
                }
                b'\\' => match self.escape()? {
                    Escape::Char(c) => out.push(c),
                    Escape::Incomplete => return Ok(Scanned::Partial(out)),
                },
                0x00..=0x1f => return Err(self.err("unescaped control character in string")),
                _ => {
                    // Copy the literal run up to the next quote, escape,
                    // or control byte. Chunks are &str, so the buffer is
                    // always complete UTF-8.
                    let start = self.at;
                    while let Some(b) = self.peek() {
                        if b == b'"' || b == b'\\' || b < 0x20 {
                            break;
                        }
                        self.at += 1;
                    }
                    out.push_str(unsafe {
                        std::str::from_utf8_unchecked(&self.buf[start..self.at])
                    });
                }
            }
        }
    }

    // Decode one escape sequence starting at the backslash under the
    // cursor, or report it incomplete so the caller withholds it.
    fn escape(&mut self) -> Result<Escape, Error> {
        let Some(e) = self.byte(self.at + 1) else {
            return Ok(Escape::Incomplete);
        };
        let c = match e {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{0008}',
            b'f' => '\u{000c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => return self.unicode_escape(),
            _ => {
                return Err(Error::Syntax {
                    offset: self.at + 1,
                    reason: "unknown escape",
                })
            }
        };
        self.at += 2;
        Ok(Escape::Char(c))
    }

    // `\uXXXX` under the cursor. A high surrogate is withheld until its
    // low half arrives in full; an unpairable surrogate decodes as
    // U+FFFD rather than exposing a malformed partial.
    fn unicode_escape(&mut self) -> Result<Escape, Error> {
        let Some(hi) = self.hex4(self.at + 2)? else {
            return Ok(Escape::Incomplete);
        };
        if (0xDC00..0xE000).contains(&hi) {
            self.at += 6;
            return Ok(Escape::Char('\u{FFFD}'));
        }
        if !(0xD800..0xDC00).contains(&hi) {
            self.at += 6;
            // Always in range: surrogates are excluded above.
            return Ok(Escape::Char(char::from_u32(hi).unwrap()));
        }

        let lo_at = self.at + 6;
        match (self.byte(lo_at), self.byte(lo_at + 1)) {
            (Some(b'\\'), Some(b'u')) => {
                let Some(lo) = self.hex4(lo_at + 2)? else {
                    return Ok(Escape::Incomplete);
                };
                if (0xDC00..0xE000).contains(&lo) {
                    let c = 0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00);
                    self.at = lo_at + 6;
                    Ok(Escape::Char(char::from_u32(c).unwrap()))
                } else {
                    // Unpaired high surrogate; resume at the next escape.
                    self.at = lo_at;
                    Ok(Escape::Char('\u{FFFD}'))
                }
            }
            (None, _) | (Some(b'\\'), None) => Ok(Escape::Incomplete),
            _ => {
                // Definitely not followed by a low surrogate.
                self.at += 6;
                Ok(Escape::Char('\u{FFFD}'))
            }
        }
    }

    // Four hex digits at `at`, or None while they have not all arrived.
    fn hex4(&self, at: usize) -> Result<Option<u32>, Error> {
        let mut v: u32 = 0;
        for i in at..at + 4 {
            let Some(b) = self.byte(i) else {
                return Ok(None);
            };
            match (b as char).to_digit(16) {
                Some(d) => v = v * 16 + d,
                None => {
                    return Err(Error::Syntax {
                        offset: i,
                        reason: "invalid unicode escape",
                    })
                }
            }
        }
        Ok(Some(v))
    }

    fn number(&mut self) -> Result<Parsed, Error> {
        let start = self.at;
        while matches!(
            self.peek(),
            Some(b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9')
        ) {
            self.at += 1;
        }
        if self.eof() && !self.at_end {
            // A later chunk could still extend this number.
            return Ok(Parsed::Pending);
        }
        let text = unsafe { std::str::from_utf8_unchecked(&self.buf[start..self.at]) };
        match serde_json::from_str::<serde_json::Number>(text) {
            Ok(n) => Ok(Parsed::Complete(Value::Number(n))),
            Err(_) => Err(Error::Syntax {
                offset: start,
                reason: "malformed number",
            }),
        }
    }

    fn literal(&mut self) -> Result<Parsed, Error> {
        let (text, value) = match self.peek() {
            Some(b't') => ("true", Value::Bool(true)),
            Some(b'f') => ("false", Value::Bool(false)),
            _ => ("null", Value::Null),
        };
        let rest = &self.buf[self.at..];
        if rest.len() >= text.len() {
            if &rest[..text.len()] == text.as_bytes() {
                self.at += text.len();
                Ok(Parsed::Complete(value))
            } else {
                Err(self.err("expected a JSON literal"))
            }
        } else if text.as_bytes().starts_with(rest) {
            if self.at_end {
                Err(self.err("truncated JSON literal"))
            } else {
                Ok(Parsed::Pending)
            }
        } else {
            Err(self.err("expected a JSON literal"))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    // Feed `input` one character at a time and render each distinct
    // observation.
    fn trace(input: &str) -> String {
        let mut scanner = Scanner::new();
        let mut out = Vec::new();
        let mut last = None;

        for c in input.chars() {
            let obs = scanner.push(&c.to_string()).unwrap();
            let Some(obs) = obs else { continue };
            if last.as_ref() == Some(&obs) {
                continue;
            }
            out.push(format!("{:?} {}", obs.status, obs.value));
            last = Some(obs);
        }
        out.join("\n")
    }

    #[test]
    fn test_character_stream_observations() {
        insta::assert_snapshot!(trace(r#"{"msg": "hi", "n": [10, 2]}"#), @r###"
        Partial {}
        Partial {"msg":""}
        Partial {"msg":"h"}
        Partial {"msg":"hi"}
        Partial {"msg":"hi","n":[]}
        Partial {"msg":"hi","n":[10]}
        Partial {"msg":"hi","n":[10,2]}
        Completed {"msg":"hi","n":[10,2]}
        "###);
    }

    #[test]
    fn test_string_escapes_are_withheld_until_decodable() {
        let mut scanner = Scanner::new();

        scanner.push(r#""ab\"#).unwrap();
        let obs = scanner.push(r#"u00e"#).unwrap().unwrap();
        // The half escape is not exposed.
        assert_eq!(obs.value, json!("ab"));

        let obs = scanner.push("9!").unwrap().unwrap();
        assert_eq!(obs.value, json!("ab\u{e9}!"));
    }

    #[test]
    fn test_surrogate_pair_split_across_chunks() {
        let mut scanner = Scanner::new();

        let obs = scanner.push(r#""x\ud83d"#).unwrap().unwrap();
        // A lone high surrogate cannot be exposed.
        assert_eq!(obs.value, json!("x"));

        let obs = scanner.push(r#"\ude00y""#).unwrap().unwrap();
        assert_eq!(obs.value, json!("x\u{1F600}y"));
        assert_eq!(obs.status, Status::Completed);
    }

    #[test]
    fn test_numbers_are_withheld_while_extendable() {
        let mut scanner = Scanner::new();

        let obs = scanner.push("[12").unwrap().unwrap();
        assert_eq!(obs.value, json!([]));

        let obs = scanner.push("3, 4").unwrap().unwrap();
        assert_eq!(obs.value, json!([123]));

        // finish() resolves the trailing number.
        let obs = scanner.finish().unwrap().unwrap();
        assert_eq!(obs.value, json!([123, 4]));
    }

    #[test]
    fn test_root_number_resolves_at_finish() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.push("12.5").unwrap(), None);
        assert_eq!(scanner.finish().unwrap().unwrap().value, json!(12.5));
    }

    #[test]
    fn test_literals() {
        let mut scanner = Scanner::new();
        assert_eq!(scanner.push("[tru").unwrap().unwrap().value, json!([]));
        assert_eq!(
            scanner.push("e, nul").unwrap().unwrap().value,
            json!([true])
        );
        assert_eq!(
            scanner.push("l]").unwrap().unwrap().value,
            json!([true, null])
        );
    }

    #[test]
    fn test_trailing_input() {
        let mut scanner = Scanner::new();
        scanner.push(r#"{"a": 1}"#).unwrap();
        let err = scanner.push("{").unwrap_err();
        assert!(matches!(err, Error::TrailingInput { offset: 8 }));
    }

    #[test]
    fn test_syntax_errors() {
        for (input, reason) in [
            ("{]", "expected a property name"),
            (r#"{"a" 1}"#, "expected ':'"),
            ("[1,]", "trailing comma"),
            ("[1 2]", "expected ',' or ']'"),
            ("frob", "expected a JSON literal"),
            ("01 ", "malformed number"),
        ] {
            let err = Scanner::new().push(input).unwrap_err();
            let Error::Syntax { reason: got, .. } = err else {
                panic!("expected a syntax error for {input:?}");
            };
            assert_eq!(got, reason, "for {input:?}");
        }
    }

    #[test]
    fn test_observations_are_monotone() {
        // Every observation extends the previous one: string leaves by
        // prefix, containers by membership.
        let input = r#"{"a": "hello é😀", "b": [1, 2.5, true], "c": {"d": null}}"#;
        let mut scanner = Scanner::new();
        let mut prev: Option<Value> = None;

        for c in input.chars() {
            let Some(obs) = scanner.push(&c.to_string()).unwrap() else {
                continue;
            };
            if let Some(prev) = &prev {
                assert!(extends(prev, &obs.value), "{prev} -/-> {}", obs.value);
            }
            prev = Some(obs.value);
        }
        assert_eq!(
            prev,
            Some(json!({"a": "hello \u{e9}\u{1F600}", "b": [1, 2.5, true], "c": {"d": null}}))
        );
    }

    fn extends(prev: &Value, next: &Value) -> bool {
        match (prev, next) {
            (Value::String(p), Value::String(n)) => n.starts_with(p.as_str()),
            (Value::Array(p), Value::Array(n)) => {
                p.len() <= n.len() && p.iter().zip(n).all(|(p, n)| extends(p, n))
            }
            (Value::Object(p), Value::Object(n)) => p
                .iter()
                .all(|(k, pv)| n.get(k).map_or(false, |nv| extends(pv, nv))),
            (p, n) => p == n,
        }
    }
}
