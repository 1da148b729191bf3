//! Configuration value types
//!
//! Option values are primitives (null, bool, int, float, string) or
//! sequences of primitives. Mappings only appear as builder input and as
//! export output; inside a built tree they become nodes.
//!
//! Raw option text is turned into a typed value by [`Value::infer`], which
//! understands Python-style literals: `None`, `True`, `False`, integers,
//! floats, quoted strings and bracketed sequences. Anything else stays a
//! string.

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[derive(Default)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value (may contain references like ${section.subsection.option})
    String(String),
    /// Sequence of values
    Sequence(Vec<Value>),
    /// Mapping of string keys to values
    Mapping(IndexMap<String, Value>),
}

/// Tokens accepted as `true` by boolean coercion (case-insensitive)
pub const TRUTHY: [&str; 4] = ["1", "yes", "true", "on"];
/// Tokens accepted as `false` by boolean coercion (case-insensitive)
pub const FALSY: [&str; 4] = ["0", "no", "false", "off"];

impl Value {
    /// Check if this value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Get as i64 if this is an Integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float or Integer
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as mapping if this is a Mapping
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Get a nested value by dotted path (e.g., "db.main.host")
    pub fn get_path(&self, path: &str) -> Result<&Value> {
        if path.is_empty() {
            return Ok(self);
        }

        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                Value::Mapping(map) => map
                    .get(segment)
                    .ok_or_else(|| Error::no_key(path).with_path(path))?,
                _ => return Err(Error::no_key(path).with_path(path)),
            };
        }

        Ok(current)
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    /// Infer a typed value from raw text, keeping the text when it is not a literal
    pub fn infer(text: &str) -> Value {
        parse_literal(text).unwrap_or_else(|| Value::String(text.to_string()))
    }

    /// Interpret this value as a boolean using the `yes/no`, `on/off` vocabulary
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(1) => Some(true),
            Value::Integer(0) => Some(false),
            Value::String(s) => {
                let lower = s.trim().to_lowercase();
                if TRUTHY.contains(&lower.as_str()) {
                    Some(true)
                } else if FALSY.contains(&lower.as_str()) {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Render this value as literal text that [`Value::infer`] maps back to the same value.
    ///
    /// Strings render bare at the top level (they are spliced into
    /// surrounding text) and quoted inside sequences.
    pub fn to_literal(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => literal_repr(other),
        }
    }
}

fn literal_repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Integer(i) => i.to_string(),
        // Debug keeps a fractional part or exponent, so the text stays a float
        Value::Float(f) => format!("{:?}", f),
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Sequence(seq) => {
            let items: Vec<String> = seq.iter().map(literal_repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            let items: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("'{}': {}", k, literal_repr(v)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
    }
}

fn int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:0(?:_?0)*|[1-9](?:_?[0-9])*)$").expect("valid integer pattern")
    })
}

fn radix_int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([+-]?)0([xXoObB])((?:_?[0-9a-fA-F])+)$").expect("valid radix pattern")
    })
}

fn float_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+-]?(?:(?:[0-9]+\.[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+)$")
            .expect("valid float pattern")
    })
}

/// Parse `text` as a literal, or `None` if it is not one
pub fn parse_literal(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match text {
        "None" => return Some(Value::Null),
        "True" => return Some(Value::Bool(true)),
        "False" => return Some(Value::Bool(false)),
        _ => {}
    }

    if int_re().is_match(text) {
        return text.replace('_', "").parse::<i64>().ok().map(Value::Integer);
    }

    if let Some(caps) = radix_int_re().captures(text) {
        let radix = match &caps[2] {
            "x" | "X" => 16,
            "o" | "O" => 8,
            _ => 2,
        };
        let digits = caps[3].replace('_', "");
        let magnitude = i64::from_str_radix(&digits, radix).ok()?;
        return Some(Value::Integer(if &caps[1] == "-" {
            -magnitude
        } else {
            magnitude
        }));
    }

    if float_re().is_match(text) {
        return text.parse::<f64>().ok().map(Value::Float);
    }

    let first = text.chars().next()?;
    match first {
        '\'' | '"' => parse_quoted(text, first).map(Value::String),
        '[' if text.ends_with(']') => parse_sequence(&text[1..text.len() - 1], false),
        '(' if text.ends_with(')') => parse_sequence(&text[1..text.len() - 1], true),
        _ => None,
    }
}

/// Parse a whole quoted string; the closing quote must be the last character
fn parse_quoted(text: &str, quote: char) -> Option<String> {
    let mut out = String::new();
    let mut chars = text[quote.len_utf8()..].chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                other => {
                    // unknown escapes keep the backslash
                    out.push('\\');
                    out.push(other);
                }
            },
            c if c == quote => {
                return if chars.as_str().is_empty() {
                    Some(out)
                } else {
                    None
                };
            }
            c => out.push(c),
        }
    }

    None
}

/// Parse the inside of a bracketed sequence; every element must be a literal
fn parse_sequence(inner: &str, tuple: bool) -> Option<Value> {
    let parts = split_top_level(inner)?;
    let mut items = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        if part.trim().is_empty() {
            // a single trailing comma is allowed: [1, 2,] or (1,)
            if i == parts.len() - 1 && i > 0 {
                continue;
            }
            if parts.len() == 1 {
                break;
            }
            return None;
        }
        items.push(parse_literal(part)?);
    }

    // `(x)` is a parenthesized expression, not a tuple
    if tuple && parts.len() == 1 && !items.is_empty() {
        return items.pop();
    }

    Some(Value::Sequence(items))
}

/// Split on commas that are not nested in brackets or quotes
fn split_top_level(inner: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if quote.is_some() || depth != 0 {
        return None;
    }
    parts.push(&inner[start..]);
    Some(parts)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Mapping(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_infer_keywords() {
        assert_eq!(Value::infer("None"), Value::Null);
        assert_eq!(Value::infer("True"), Value::Bool(true));
        assert_eq!(Value::infer("False"), Value::Bool(false));
        // only the capitalized spellings are literals
        assert_eq!(Value::infer("true"), Value::String("true".into()));
        assert_eq!(Value::infer("none"), Value::String("none".into()));
    }

    #[test]
    fn test_infer_integers() {
        assert_eq!(Value::infer("2"), Value::Integer(2));
        assert_eq!(Value::infer("-17"), Value::Integer(-17));
        assert_eq!(Value::infer(" 42 "), Value::Integer(42));
        assert_eq!(Value::infer("1_000"), Value::Integer(1000));
        assert_eq!(Value::infer("0"), Value::Integer(0));
        assert_eq!(Value::infer("0x1F"), Value::Integer(31));
        assert_eq!(Value::infer("0o17"), Value::Integer(15));
        assert_eq!(Value::infer("-0b101"), Value::Integer(-5));
    }

    #[test]
    fn test_infer_rejects_malformed_numbers() {
        assert_eq!(Value::infer("007"), Value::String("007".into()));
        assert_eq!(Value::infer("1__0"), Value::String("1__0".into()));
        assert_eq!(Value::infer("0b102"), Value::String("0b102".into()));
        assert_eq!(
            Value::infer("99999999999999999999"),
            Value::String("99999999999999999999".into())
        );
    }

    #[test]
    fn test_infer_floats() {
        assert_eq!(Value::infer("1.5"), Value::Float(1.5));
        assert_eq!(Value::infer(".5"), Value::Float(0.5));
        assert_eq!(Value::infer("3."), Value::Float(3.0));
        assert_eq!(Value::infer("-2.5e-3"), Value::Float(-0.0025));
        assert_eq!(Value::infer("1e3"), Value::Float(1000.0));
        assert_eq!(Value::infer("1.2.3"), Value::String("1.2.3".into()));
    }

    #[test]
    fn test_infer_quoted_strings() {
        assert_eq!(Value::infer("'hello'"), Value::String("hello".into()));
        assert_eq!(Value::infer("\"a b\""), Value::String("a b".into()));
        assert_eq!(Value::infer(r"'it\'s'"), Value::String("it's".into()));
        assert_eq!(Value::infer("'42'"), Value::String("42".into()));
        // unbalanced or trailing text is not a literal
        assert_eq!(Value::infer("'abc"), Value::String("'abc".into()));
        assert_eq!(Value::infer("'a' b"), Value::String("'a' b".into()));
    }

    #[test]
    fn test_infer_sequences() {
        assert_eq!(
            Value::infer("[1, 'two', 3.0, None]"),
            Value::Sequence(vec![
                Value::Integer(1),
                Value::String("two".into()),
                Value::Float(3.0),
                Value::Null,
            ])
        );
        assert_eq!(Value::infer("[]"), Value::Sequence(vec![]));
        assert_eq!(
            Value::infer("(1,)"),
            Value::Sequence(vec![Value::Integer(1)])
        );
        assert_eq!(Value::infer("(7)"), Value::Integer(7));
        assert_eq!(
            Value::infer("[[1, 2], ['a,b']]"),
            Value::Sequence(vec![
                Value::Sequence(vec![Value::Integer(1), Value::Integer(2)]),
                Value::Sequence(vec![Value::String("a,b".into())]),
            ])
        );
    }

    #[test]
    fn test_infer_non_literal_sequences_stay_text() {
        assert_eq!(
            Value::infer("[a, b]"),
            Value::String("[a, b]".into())
        );
        assert_eq!(Value::infer("[1, , 2]"), Value::String("[1, , 2]".into()));
        assert_eq!(Value::infer("[1, 2"), Value::String("[1, 2".into()));
    }

    #[test]
    fn test_infer_keeps_interpolation_text() {
        let raw = "Nguyen Sinh Tu with nick = ${tuns.profile.nick}";
        assert_eq!(Value::infer(raw), Value::String(raw.into()));
        assert_eq!(Value::infer(""), Value::String(String::new()));
    }

    #[test]
    fn test_to_literal_round_trips_type() {
        for value in [
            Value::Null,
            Value::Bool(true),
            Value::Integer(-3),
            Value::Float(1.0),
            Value::Float(2.5e-8),
            Value::Sequence(vec![Value::String("it's".into()), Value::Integer(1)]),
        ] {
            assert_eq!(Value::infer(&value.to_literal()), value);
        }
        assert_eq!(Value::String("plain".into()).to_literal(), "plain");
    }

    #[test]
    fn test_to_bool_vocabulary() {
        for token in ["1", "yes", "TRUE", "On"] {
            assert_eq!(Value::String(token.into()).to_bool(), Some(true));
        }
        for token in ["0", "No", "false", "OFF"] {
            assert_eq!(Value::String(token.into()).to_bool(), Some(false));
        }
        assert_eq!(Value::Integer(1).to_bool(), Some(true));
        assert_eq!(Value::Integer(0).to_bool(), Some(false));
        assert_eq!(Value::Bool(false).to_bool(), Some(false));
        assert_eq!(Value::Integer(2).to_bool(), None);
        assert_eq!(Value::String("maybe".into()).to_bool(), None);
    }

    #[test]
    fn test_value_get_path() {
        let mut main = IndexMap::new();
        main.insert("host".to_string(), Value::String("localhost".into()));
        let mut db = IndexMap::new();
        db.insert("main".to_string(), Value::Mapping(main));
        let mut root = IndexMap::new();
        root.insert("db".to_string(), Value::Mapping(db));
        let value = Value::Mapping(root);

        assert_eq!(
            value.get_path("db.main.host").unwrap().as_str(),
            Some("localhost")
        );
        assert!(value.get_path("db.main.port").is_err());
        assert!(value.get_path("db.main.host.deeper").is_err());
    }

    #[test]
    fn test_scalar_accessors() {
        assert!(Value::String("hello".into()).is_string());
        assert_eq!(Value::Integer(42).as_i64(), Some(42));
        assert_eq!(Value::Float(2.5).as_i64(), None);
        assert_eq!(Value::Integer(42).as_f64(), Some(42.0));
        assert_eq!(Value::String("4".into()).as_f64(), None);
        assert_eq!(Value::String("x".into()).as_str(), Some("x"));
    }
}
