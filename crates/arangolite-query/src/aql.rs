//! AQL literal rendering and pattern escaping.
//!
//! Every user-supplied value that ends up inside query text goes through
//! [`literal`]; clause builders never concatenate raw values. JSON literal
//! syntax is a subset of AQL literal syntax, so rendering via serde_json is
//! both safe (quoting, escaping) and exact.

use serde_json::Value;

/// Render a JSON value as an AQL literal.
///
/// Strings are double-quoted with JSON escaping, arrays and objects render
/// as AQL array/object literals, numbers and booleans pass through.
pub fn literal(value: &Value) -> String {
    // serde_json serialization of a Value is infallible.
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Render a string as a quoted AQL string literal.
pub fn str_literal(s: &str) -> String {
    literal(&Value::String(s.to_string()))
}

/// Escape the characters that are special inside a LIKE pattern so a literal
/// substring match is preserved once wildcards are wrapped around it.
///
/// The escaped set is exactly `* . + ? { } [ ] ^ $`.
pub fn escape_pattern(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '*' | '.' | '+' | '?' | '{' | '}' | '[' | ']' | '^' | '$' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
