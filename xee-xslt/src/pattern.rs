// patterns and their default priority:
// https://www.w3.org/TR/xslt#patterns
// https://www.w3.org/TR/xslt#conflict

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use xee_xpath::{Axis, Context, Expr, Function, KindTest, NameTest, NodeTest, PathStart, Tree, XPath};
use xot::Node;

use crate::ast::Namespaces;
use crate::error::{Error, Result};

/// A compiled match pattern.
///
/// A union pattern is kept as separate branches, since each alternative
/// has its own default priority.
#[derive(Debug)]
pub(crate) struct Pattern {
    branches: Vec<(XPath, Decimal)>,
    namespaces: Namespaces,
}

impl Pattern {
    pub(crate) fn compile(source: &str, namespaces: &Namespaces) -> Result<Self> {
        let xpath = XPath::compile(source).map_err(Error::xpath(source))?;
        let branches = xpath
            .branches()
            .into_iter()
            .map(|branch| {
                if !is_pattern(branch.ast()) {
                    return Err(Error::InvalidPattern(source.to_string()));
                }
                let priority = default_priority(branch.ast());
                Ok((branch, priority))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Pattern {
            branches,
            namespaces: namespaces.clone(),
        })
    }

    /// The highest default priority among the branches that match `node`,
    /// or `None` if none does.
    pub(crate) fn matches(&self, source: &Tree, node: Node) -> Result<Option<Decimal>> {
        let context = Context::new(source, &*self.namespaces);
        let mut best: Option<Decimal> = None;
        for (xpath, priority) in &self.branches {
            if best.is_some_and(|best| best >= *priority) {
                continue;
            }
            if branch_matches(xpath, &context, source, node)? {
                best = Some(*priority);
            }
        }
        Ok(best)
    }
}

// a node matches if some ancestor-or-self, used as the context node,
// selects it
fn branch_matches(xpath: &XPath, context: &Context, source: &Tree, node: Node) -> Result<bool> {
    let absolute = matches!(xpath.ast(), Expr::Path(PathStart::Root, _));
    let mut current = Some(node);
    while let Some(context_node) = current {
        let selected = xpath
            .select(context, context_node)
            .map_err(Error::xpath(xpath.source()))?;
        if selected.contains(&node) {
            return Ok(true);
        }
        if absolute {
            break;
        }
        current = source.xot().parent(context_node);
    }
    Ok(false)
}

fn is_pattern(expr: &Expr) -> bool {
    match expr {
        Expr::Path(PathStart::Context | PathStart::Root, steps) => steps.iter().all(|step| {
            matches!(
                step.axis,
                Axis::Child | Axis::Attribute | Axis::DescendantOrSelf
            )
        }),
        Expr::Path(PathStart::Filter(start), _) => is_id_call(start),
        other => is_id_call(other),
    }
}

fn is_id_call(expr: &Expr) -> bool {
    matches!(expr, Expr::FunctionCall(Function::Id, _))
}

pub(crate) fn default_priority(expr: &Expr) -> Decimal {
    match expr {
        Expr::Path(PathStart::Context, steps) if steps.len() == 1 => {
            let step = &steps[0];
            if !step.predicates.is_empty() || !matches!(step.axis, Axis::Child | Axis::Attribute)
            {
                return dec!(0.5);
            }
            match &step.test {
                NodeTest::Name(NameTest::Name { .. }) => dec!(0),
                NodeTest::Kind(KindTest::ProcessingInstruction(Some(_))) => dec!(0),
                NodeTest::Name(NameTest::Namespace(_)) => dec!(-0.25),
                NodeTest::Name(NameTest::Star) | NodeTest::Kind(_) => dec!(-0.5),
            }
        }
        _ => dec!(0.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn priority(pattern: &str) -> Decimal {
        default_priority(XPath::compile(pattern).unwrap().ast())
    }

    #[rstest]
    #[case("/", dec!(0.5))]
    #[case("foo", dec!(0))]
    #[case("@foo", dec!(0))]
    #[case("child::foo", dec!(0))]
    #[case("p:foo", dec!(0))]
    #[case("processing-instruction('foo')", dec!(0))]
    #[case("p:*", dec!(-0.25))]
    #[case("@p:*", dec!(-0.25))]
    #[case("*", dec!(-0.5))]
    #[case("@*", dec!(-0.5))]
    #[case("node()", dec!(-0.5))]
    #[case("text()", dec!(-0.5))]
    #[case("comment()", dec!(-0.5))]
    #[case("processing-instruction()", dec!(-0.5))]
    #[case("foo[1]", dec!(0.5))]
    #[case("a/b", dec!(0.5))]
    #[case("//foo", dec!(0.5))]
    #[case("/foo", dec!(0.5))]
    fn test_default_priority(#[case] pattern: &str, #[case] expected: Decimal) {
        assert_eq!(priority(pattern), expected);
    }

    #[test]
    fn test_union_branches_have_own_priority() {
        let pattern = Pattern::compile("foo | *", &Namespaces::default()).unwrap();
        let priorities = pattern
            .branches
            .iter()
            .map(|(_, priority)| *priority)
            .collect::<Vec<_>>();
        assert_eq!(priorities, vec![dec!(0), dec!(-0.5)]);
    }

    #[rstest]
    #[case("1")]
    #[case("'foo'")]
    #[case("ancestor::foo")]
    #[case("foo = 1")]
    fn test_invalid_pattern(#[case] pattern: &str) {
        assert!(matches!(
            Pattern::compile(pattern, &Namespaces::default()),
            Err(Error::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_matches() {
        let mut xot = xot::Xot::new();
        let root = xot.parse("<a><b/><c><b/></c></a>").unwrap();
        let tree = Tree::new(xot, root);
        let a = tree.xot().document_element(root).unwrap();
        let c = tree.xot().children(a).nth(1).unwrap();
        let nested = tree.xot().first_child(c).unwrap();

        let pattern = Pattern::compile("c/b", &Namespaces::default()).unwrap();
        assert_eq!(pattern.matches(&tree, nested).unwrap(), Some(dec!(0.5)));
        let first = tree.xot().first_child(a).unwrap();
        assert_eq!(pattern.matches(&tree, first).unwrap(), None);

        let pattern = Pattern::compile("/", &Namespaces::default()).unwrap();
        assert_eq!(pattern.matches(&tree, root).unwrap(), Some(dec!(0.5)));
        assert_eq!(pattern.matches(&tree, a).unwrap(), None);
    }
}
