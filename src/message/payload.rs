//! Message payload representation

use std::fmt;

/// Message payload
///
/// Payloads are opaque to correlation. The variants exist so that consumers
/// writing characters can treat text, character and byte payloads directly and
/// fall back to the textual representation for everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Absent payload; consumers drop it instead of writing it
    Null,
    Text(String),
    Chars(Vec<char>),
    Bytes(Vec<u8>),
    /// Structured value, rendered as compact JSON
    Value(serde_json::Value),
    /// Ordered collection, typically produced by aggregation
    List(Vec<Payload>),
}

impl Payload {
    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Null)
    }

    /// Convert a JSON value into a payload
    ///
    /// JSON strings become `Text`, `null` becomes `Null`, anything else is
    /// kept as a structured `Value`.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Payload::Null,
            serde_json::Value::String(text) => Payload::Text(text),
            other => Payload::Value(other),
        }
    }

    /// Approximate payload size in bytes
    pub fn byte_len(&self) -> usize {
        match self {
            Payload::Null => 0,
            Payload::Text(text) => text.len(),
            Payload::Chars(chars) => chars.iter().map(|c| c.len_utf8()).sum(),
            Payload::Bytes(bytes) => bytes.len(),
            Payload::Value(value) => value.to_string().len(),
            Payload::List(items) => items.iter().map(Payload::byte_len).sum(),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Null => f.write_str("null"),
            Payload::Text(text) => f.write_str(text),
            Payload::Chars(chars) => {
                for c in chars {
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Payload::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Payload::Value(value) => write!(f, "{value}"),
            Payload::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(value)
    }
}

impl From<Vec<char>> for Payload {
    fn from(value: Vec<char>) -> Self {
        Payload::Chars(value)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Value(value)
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(value: Vec<Payload>) -> Self {
        Payload::List(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_of_each_variant() {
        assert_eq!(Payload::from("hello").to_string(), "hello");
        assert_eq!(Payload::from(vec!['h', 'i']).to_string(), "hi");
        assert_eq!(Payload::from(b"bytes".to_vec()).to_string(), "bytes");
        assert_eq!(Payload::from(json!({"n": 1})).to_string(), r#"{"n":1}"#);
        assert_eq!(Payload::Null.to_string(), "null");
    }

    #[test]
    fn test_list_display_joins_items() {
        let list = Payload::List(vec![Payload::from("test1"), Payload::from(json!(2))]);
        assert_eq!(list.to_string(), "[test1, 2]");
        assert_eq!(Payload::List(Vec::new()).to_string(), "[]");
    }

    #[test]
    fn test_invalid_utf8_bytes_are_replaced() {
        let payload = Payload::Bytes(vec![b'o', b'k', 0xff]);
        assert_eq!(payload.to_string(), "ok\u{fffd}");
    }

    #[test]
    fn test_from_json_maps_strings_and_null() {
        assert_eq!(Payload::from_json(json!(null)), Payload::Null);
        assert_eq!(Payload::from_json(json!("text")), Payload::from("text"));
        assert_eq!(Payload::from_json(json!([1, 2])), Payload::Value(json!([1, 2])));
        assert!(Payload::from_json(json!(null)).is_null());
    }

    #[test]
    fn test_byte_len() {
        assert_eq!(Payload::Null.byte_len(), 0);
        assert_eq!(Payload::from("abc").byte_len(), 3);
        assert_eq!(Payload::from(vec!['é']).byte_len(), 2);
        let list = Payload::List(vec![Payload::from("ab"), Payload::from(vec![1u8])]);
        assert_eq!(list.byte_len(), 3);
    }
}
