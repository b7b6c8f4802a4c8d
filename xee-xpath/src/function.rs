use std::sync::LazyLock;

use ahash::HashMap;
use xee_name::XML_NAMESPACE;
use xot::Node;

use crate::ast::Expr;
use crate::error::{Error, Result};
use crate::eval::{evaluate, Context, Focus};
use crate::value::{string_to_number, Value};

/// The XPath 1.0 core function library, plus the two functions XSLT adds
/// that make sense outside of a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Last,
    Position,
    Count,
    Id,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
    Current,
    GenerateId,
}

struct Signature {
    function: Function,
    min: usize,
    max: Option<usize>,
}

const fn signature(function: Function, min: usize, max: Option<usize>) -> Signature {
    Signature { function, min, max }
}

static FUNCTIONS: LazyLock<HashMap<&'static str, Signature>> = LazyLock::new(|| {
    use Function::*;
    [
        ("last", signature(Last, 0, Some(0))),
        ("position", signature(Position, 0, Some(0))),
        ("count", signature(Count, 1, Some(1))),
        ("id", signature(Id, 1, Some(1))),
        ("local-name", signature(LocalName, 0, Some(1))),
        ("namespace-uri", signature(NamespaceUri, 0, Some(1))),
        ("name", signature(Name, 0, Some(1))),
        ("string", signature(String, 0, Some(1))),
        ("concat", signature(Concat, 2, None)),
        ("starts-with", signature(StartsWith, 2, Some(2))),
        ("contains", signature(Contains, 2, Some(2))),
        ("substring-before", signature(SubstringBefore, 2, Some(2))),
        ("substring-after", signature(SubstringAfter, 2, Some(2))),
        ("substring", signature(Substring, 2, Some(3))),
        ("string-length", signature(StringLength, 0, Some(1))),
        ("normalize-space", signature(NormalizeSpace, 0, Some(1))),
        ("translate", signature(Translate, 3, Some(3))),
        ("boolean", signature(Boolean, 1, Some(1))),
        ("not", signature(Not, 1, Some(1))),
        ("true", signature(True, 0, Some(0))),
        ("false", signature(False, 0, Some(0))),
        ("lang", signature(Lang, 1, Some(1))),
        ("number", signature(Number, 0, Some(1))),
        ("sum", signature(Sum, 1, Some(1))),
        ("floor", signature(Floor, 1, Some(1))),
        ("ceiling", signature(Ceiling, 1, Some(1))),
        ("round", signature(Round, 1, Some(1))),
        ("current", signature(Current, 0, Some(0))),
        ("generate-id", signature(GenerateId, 0, Some(1))),
    ]
    .into_iter()
    .collect()
});

/// Resolve a function name and check the number of arguments.
pub(crate) fn lookup(name: &str, arity: usize) -> Result<Function> {
    let signature = FUNCTIONS
        .get(name)
        .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
    if arity < signature.min || signature.max.is_some_and(|max| arity > max) {
        return Err(Error::Arity {
            name: name.to_string(),
            found: arity,
        });
    }
    Ok(signature.function)
}

pub(crate) fn call(
    function: Function,
    arguments: &[Expr],
    context: &Context,
    focus: &Focus,
) -> Result<Value> {
    let tree = context.tree();
    let argument = |i: usize| evaluate(&arguments[i], context, focus);
    let string_argument = |i: usize| -> Result<String> {
        match arguments.get(i) {
            Some(expr) => Ok(evaluate(expr, context, focus)?.to_string_value(tree)),
            None => Ok(tree.string_value(focus.node)),
        }
    };
    let number_argument = |i: usize| -> Result<f64> { Ok(argument(i)?.to_number(tree)) };
    // the first node of an optional node-set argument, defaulting to the
    // context node
    let node_argument = |i: usize| -> Result<Option<Node>> {
        match arguments.get(i) {
            Some(expr) => Ok(evaluate(expr, context, focus)?
                .into_node_set()?
                .first()
                .copied()),
            None => Ok(Some(focus.node)),
        }
    };

    let value = match function {
        Function::Last => Value::Number(focus.size as f64),
        Function::Position => Value::Number(focus.position as f64),
        Function::Count => Value::Number(argument(0)?.into_node_set()?.len() as f64),
        Function::Id => Value::NodeSet(id(argument(0)?, context, focus)),
        Function::LocalName => Value::String(
            node_argument(0)?
                .and_then(|node| tree.expanded_name(node))
                .map(|(local, _)| local.to_string())
                .unwrap_or_default(),
        ),
        Function::NamespaceUri => Value::String(
            node_argument(0)?
                .and_then(|node| tree.expanded_name(node))
                .map(|(_, uri)| uri.to_string())
                .unwrap_or_default(),
        ),
        Function::Name => Value::String(
            node_argument(0)?
                .map(|node| tree.qualified_name(node))
                .unwrap_or_default(),
        ),
        Function::String => Value::String(string_argument(0)?),
        Function::Concat => {
            let mut result = std::string::String::new();
            for i in 0..arguments.len() {
                result.push_str(&string_argument(i)?);
            }
            Value::String(result)
        }
        Function::StartsWith => {
            Value::Boolean(string_argument(0)?.starts_with(string_argument(1)?.as_str()))
        }
        Function::Contains => {
            Value::Boolean(string_argument(0)?.contains(string_argument(1)?.as_str()))
        }
        Function::SubstringBefore => {
            let s = string_argument(0)?;
            let pattern = string_argument(1)?;
            Value::String(
                s.split_once(pattern.as_str())
                    .map(|(before, _)| before.to_string())
                    .unwrap_or_default(),
            )
        }
        Function::SubstringAfter => {
            let s = string_argument(0)?;
            let pattern = string_argument(1)?;
            Value::String(
                s.split_once(pattern.as_str())
                    .map(|(_, after)| after.to_string())
                    .unwrap_or_default(),
            )
        }
        Function::Substring => {
            let s = string_argument(0)?;
            let start = round(number_argument(1)?);
            let end = if arguments.len() > 2 {
                start + round(number_argument(2)?)
            } else {
                f64::INFINITY
            };
            Value::String(substring(&s, start, end))
        }
        Function::StringLength => Value::Number(string_argument(0)?.chars().count() as f64),
        Function::NormalizeSpace => Value::String(
            string_argument(0)?
                .split(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        Function::Translate => Value::String(translate(
            &string_argument(0)?,
            &string_argument(1)?,
            &string_argument(2)?,
        )),
        Function::Boolean => Value::Boolean(argument(0)?.to_boolean()),
        Function::Not => Value::Boolean(!argument(0)?.to_boolean()),
        Function::True => Value::Boolean(true),
        Function::False => Value::Boolean(false),
        Function::Lang => Value::Boolean(lang(&string_argument(0)?, context, focus.node)),
        Function::Number => match arguments.first() {
            Some(_) => Value::Number(number_argument(0)?),
            None => Value::Number(string_to_number(&tree.string_value(focus.node))),
        },
        Function::Sum => Value::Number(
            argument(0)?
                .into_node_set()?
                .into_iter()
                .map(|node| string_to_number(&tree.string_value(node)))
                .sum(),
        ),
        Function::Floor => Value::Number(number_argument(0)?.floor()),
        Function::Ceiling => Value::Number(number_argument(0)?.ceil()),
        Function::Round => Value::Number(round(number_argument(0)?)),
        Function::Current => Value::NodeSet(vec![context.current.unwrap_or(focus.node)]),
        Function::GenerateId => Value::String(
            node_argument(0)?
                .map(|node| tree.generate_id(node))
                .unwrap_or_default(),
        ),
    };
    Ok(value)
}

/// XPath rounding: halves go towards positive infinity and the sign of zero
/// is kept.
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    if n < 0.0 && n >= -0.5 {
        return -0.0;
    }
    (n + 0.5).floor()
}

// Characters at 1-based position p are kept when start <= p < end. NaN
// bounds select nothing.
fn substring(s: &str, start: f64, end: f64) -> std::string::String {
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let position = (*i + 1) as f64;
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(s: &str, from: &str, to: &str) -> std::string::String {
    let from = from.chars().collect::<Vec<_>>();
    let to = to.chars().collect::<Vec<_>>();
    s.chars()
        .filter_map(|c| match from.iter().position(|f| *f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect()
}

fn lang(language: &str, context: &Context, node: Node) -> bool {
    let tree = context.tree();
    let xot = tree.xot();
    let found = xot
        .axis(xot::Axis::AncestorOrSelf, node)
        .filter(|ancestor| xot.is_element(*ancestor))
        .find_map(|element| {
            xot.axis(xot::Axis::Attribute, element)
                .find(|attribute| tree.expanded_name(*attribute) == Some(("lang", XML_NAMESPACE)))
                .map(|attribute| tree.string_value(attribute))
        });
    match found {
        Some(found) => {
            let found = found.to_lowercase();
            let language = language.to_lowercase();
            found == language
                || found
                    .strip_prefix(language.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
        }
        None => false,
    }
}

// Only `xml:id` attributes are IDs: there's no DTD to declare any others.
fn id(value: Value, context: &Context, focus: &Focus) -> Vec<Node> {
    let tree = context.tree();
    let ids = match &value {
        Value::NodeSet(nodes) => nodes
            .iter()
            .map(|node| tree.string_value(*node))
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string_value(tree),
    };
    let ids = ids.split_whitespace().collect::<Vec<_>>();
    if ids.is_empty() {
        return Vec::new();
    }
    let xot = tree.xot();
    let top = tree.top(focus.node);
    let mut found = Vec::new();
    for element in xot.descendants(top).filter(|node| xot.is_element(*node)) {
        let matches = xot.axis(xot::Axis::Attribute, element).any(|attribute| {
            let is_id = tree.expanded_name(attribute) == Some(("id", XML_NAMESPACE));
            is_id && ids.contains(&tree.string_value(attribute).as_str())
        });
        if matches {
            found.push(element);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use xee_name::NamespaceContext;
    use xot::Xot;

    use super::*;
    use crate::parser::parse;
    use crate::tree::Tree;

    fn eval(xml: &str, expr: &str) -> Value {
        let mut xot = Xot::new();
        let root = xot.parse(xml).unwrap();
        let tree = Tree::new(xot, root);
        let namespaces = NamespaceContext::default();
        let context = Context::new(&tree, &namespaces);
        let expr = parse(expr).unwrap();
        evaluate(&expr, &context, &Focus::new(tree.root())).unwrap()
    }

    fn string(expr: &str) -> String {
        match eval("<r/>", expr) {
            Value::String(s) => s,
            other => panic!("expected string, got {:?}", other),
        }
    }

    fn number(xml: &str, expr: &str) -> f64 {
        match eval(xml, expr) {
            Value::Number(n) => n,
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[rstest]
    #[case("substring('12345', 2, 3)", "234")]
    #[case("substring('12345', 2)", "2345")]
    #[case("substring('12345', 1.5, 2.6)", "234")]
    #[case("substring('12345', 0, 3)", "12")]
    #[case("substring('12345', 0 div 0, 3)", "")]
    #[case("substring('12345', 1, 0 div 0)", "")]
    #[case("substring('12345', -42, 1 div 0)", "12345")]
    #[case("substring-before('1999/04/01', '/')", "1999")]
    #[case("substring-after('1999/04/01', '/')", "04/01")]
    #[case("normalize-space('  a  b \n c ')", "a b c")]
    #[case("translate('bar', 'abc', 'ABC')", "BAr")]
    #[case("translate('--aaa--', 'abc-', 'ABC')", "AAA")]
    #[case("concat('a', 1, true())", "a1true")]
    #[case("string(1 div 0)", "Infinity")]
    #[case("string(0.5)", "0.5")]
    fn test_string_functions(#[case] expr: &str, #[case] expected: &str) {
        assert_eq!(string(expr), expected);
    }

    #[rstest]
    #[case("round(2.5)", 3.0)]
    #[case("round(-2.5)", -2.0)]
    #[case("floor(-1.5)", -2.0)]
    #[case("ceiling(1.2)", 2.0)]
    #[case("string-length('héllo')", 5.0)]
    #[case("number('  12 ')", 12.0)]
    fn test_number_functions(#[case] expr: &str, #[case] expected: f64) {
        assert_eq!(number("<r/>", expr), expected);
    }

    #[test]
    fn test_round_negative_half_is_negative_zero() {
        let n = number("<r/>", "round(-0.5)");
        assert_eq!(n, 0.0);
        assert!(n.is_sign_negative());
    }

    #[test]
    fn test_count_sum_last_position() {
        let xml = "<r><a>1</a><a>2</a><a>3</a></r>";
        assert_eq!(number(xml, "count(//a)"), 3.0);
        assert_eq!(number(xml, "sum(//a)"), 6.0);
        assert_eq!(number(xml, "count(//a[position() = last()])"), 1.0);
        assert_eq!(number(xml, "number(//a[last()])"), 3.0);
    }

    #[test]
    fn test_names() {
        let xml = r#"<p:r xmlns:p="urn:p"><?target data?></p:r>"#;
        assert_eq!(eval(xml, "name(/*)"), Value::String("p:r".to_string()));
        assert_eq!(eval(xml, "local-name(/*)"), Value::String("r".to_string()));
        assert_eq!(
            eval(xml, "namespace-uri(/*)"),
            Value::String("urn:p".to_string())
        );
        assert_eq!(
            eval(xml, "local-name(/*/processing-instruction())"),
            Value::String("target".to_string())
        );
        assert_eq!(eval(xml, "name(/*/nothing)"), Value::String(String::new()));
    }

    #[test]
    fn test_lang() {
        let xml = r#"<r xml:lang="en-US"><a/></r>"#;
        assert_eq!(eval(xml, "boolean(//a[lang('en')])"), Value::Boolean(true));
        assert_eq!(eval(xml, "boolean(//a[lang('EN-us')])"), Value::Boolean(true));
        assert_eq!(eval(xml, "boolean(//a[lang('de')])"), Value::Boolean(false));
    }

    #[test]
    fn test_id() {
        let xml = r#"<r><a xml:id="x">1</a><a xml:id="y">2</a><a xml:id="z">3</a></r>"#;
        assert_eq!(number(xml, "count(id('z x'))"), 2.0);
        assert_eq!(number(xml, "number(id('y'))"), 2.0);
    }

    #[test]
    fn test_id_ignores_plain_id_attributes() {
        let xml = r#"<r><a id="x">1</a><a xml:id="x">2</a></r>"#;
        assert_eq!(number(xml, "count(id('x'))"), 1.0);
        assert_eq!(number(xml, "number(id('x'))"), 2.0);
        assert_eq!(number("<r><a id='y'/></r>", "count(id('y'))"), 0.0);
    }

    #[test]
    fn test_generate_id_is_stable_and_distinct() {
        let xml = "<r><a/><b/></r>";
        assert_eq!(
            eval(xml, "generate-id(//a) = generate-id(//a)"),
            Value::Boolean(true)
        );
        assert_eq!(
            eval(xml, "generate-id(//a) = generate-id(//b)"),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("count", 1), Ok(Function::Count));
        assert_eq!(
            lookup("count", 2),
            Err(Error::Arity {
                name: "count".to_string(),
                found: 2
            })
        );
        assert_eq!(
            lookup("frobnicate", 0),
            Err(Error::UnknownFunction("frobnicate".to_string()))
        );
        assert!(lookup("concat", 7).is_ok());
    }
}
