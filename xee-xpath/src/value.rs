use xot::Node;

use crate::ast::CompareOp;
use crate::error::{Error, Result};
use crate::tree::Tree;

/// The result of evaluating an XPath 1.0 expression.
///
/// Node-sets are kept in document order without duplicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    NodeSet(Vec<Node>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NodeSet(_) => "node-set",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    pub fn to_number(&self, tree: &Tree) -> f64 {
        match self {
            Value::NodeSet(_) => string_to_number(&self.to_string_value(tree)),
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
        }
    }

    /// The string conversion of XPath's `string()` function. A node-set
    /// converts to the string-value of its first node.
    pub fn to_string_value(&self, tree: &Tree) -> String {
        match self {
            Value::NodeSet(nodes) => nodes
                .first()
                .map(|node| tree.string_value(*node))
                .unwrap_or_default(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
        }
    }

    pub fn into_node_set(self) -> Result<Vec<Node>> {
        match self {
            Value::NodeSet(nodes) => Ok(nodes),
            other => Err(Error::Type {
                expected: "node-set",
                found: other.type_name(),
            }),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
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

impl From<Vec<Node>> for Value {
    fn from(nodes: Vec<Node>) -> Self {
        Value::NodeSet(nodes)
    }
}

/// Convert a string to a number the way `number()` does: optional
/// whitespace, an optional minus sign and a decimal number. Anything else
/// is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let digits = s.strip_prefix('-').unwrap_or(s);
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let valid = (!integer.is_empty() || !fraction.is_empty())
        && integer.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// Format a number the way `string()` does.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        // also covers negative zero
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e18 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Compare two values with XPath 1.0 comparison semantics.
///
/// A comparison involving a node-set is true if it is true for at least one
/// node in the set, so `!=` is not the negation of `=`.
pub(crate) fn compare(op: CompareOp, left: &Value, right: &Value, tree: &Tree) -> bool {
    match (left, right) {
        (Value::NodeSet(_), Value::Boolean(_)) | (Value::Boolean(_), Value::NodeSet(_)) => {
            compare_atomic(
                op,
                &Value::Boolean(left.to_boolean()),
                &Value::Boolean(right.to_boolean()),
                tree,
            )
        }
        (Value::NodeSet(nodes), other) => nodes.iter().any(|node| {
            compare(op, &Value::String(tree.string_value(*node)), other, tree)
        }),
        (other, Value::NodeSet(_)) => compare(op.swap(), right, other, tree),
        _ => compare_atomic(op, left, right, tree),
    }
}

fn compare_atomic(op: CompareOp, left: &Value, right: &Value, tree: &Tree) -> bool {
    match op {
        CompareOp::Equal | CompareOp::NotEqual => {
            let equal = if matches!(left, Value::Boolean(_)) || matches!(right, Value::Boolean(_)) {
                left.to_boolean() == right.to_boolean()
            } else if matches!(left, Value::Number(_)) || matches!(right, Value::Number(_)) {
                left.to_number(tree) == right.to_number(tree)
            } else {
                left.to_string_value(tree) == right.to_string_value(tree)
            };
            (op == CompareOp::Equal) == equal
        }
        _ => {
            let (a, b) = (left.to_number(tree), right.to_number(tree));
            match op {
                CompareOp::LessThan => a < b,
                CompareOp::LessThanEqual => a <= b,
                CompareOp::GreaterThan => a > b,
                CompareOp::GreaterThanEqual => a >= b,
                CompareOp::Equal | CompareOp::NotEqual => unreachable!(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1", 1.0)]
    #[case("  -2.5 ", -2.5)]
    #[case(".5", 0.5)]
    #[case("3.", 3.0)]
    fn test_string_to_number(#[case] s: &str, #[case] expected: f64) {
        assert_eq!(string_to_number(s), expected);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("+1")]
    #[case("1e3")]
    #[case("-")]
    #[case(".")]
    #[case("Infinity")]
    fn test_string_to_number_nan(#[case] s: &str) {
        assert!(string_to_number(s).is_nan());
    }

    #[rstest]
    #[case(1.0, "1")]
    #[case(-0.0, "0")]
    #[case(0.5, "0.5")]
    #[case(-12.25, "-12.25")]
    #[case(f64::NAN, "NaN")]
    #[case(f64::INFINITY, "Infinity")]
    #[case(f64::NEG_INFINITY, "-Infinity")]
    fn test_number_to_string(#[case] n: f64, #[case] expected: &str) {
        assert_eq!(number_to_string(n), expected);
    }

    #[test]
    fn test_boolean_conversion() {
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::Number(0.0).to_boolean());
        assert!(Value::String("false".to_string()).to_boolean());
        assert!(!Value::NodeSet(vec![]).to_boolean());
    }
}
