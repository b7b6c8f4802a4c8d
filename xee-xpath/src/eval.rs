use ahash::HashMap;
use xee_name::{NamespaceLookup, XML_NAMESPACE};
use xot::Node;

use crate::ast::{ArithmeticOp, Axis, Expr, KindTest, NameTest, NodeTest, PathStart, Step};
use crate::error::{Error, Result};
use crate::function;
use crate::tree::{NodeKind, Tree};
use crate::value::{compare, Value};

/// Variable bindings, keyed by the name as written after `$`.
pub type Variables = HashMap<String, Value>;

/// Everything an expression can see besides the context node: the tree, how
/// to resolve prefixes, variable bindings and the XSLT current node.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub(crate) tree: &'a Tree,
    pub(crate) namespaces: &'a dyn NamespaceLookup,
    pub(crate) variables: Option<&'a Variables>,
    pub(crate) current: Option<Node>,
}

impl<'a> Context<'a> {
    pub fn new(tree: &'a Tree, namespaces: &'a dyn NamespaceLookup) -> Self {
        Context {
            tree,
            namespaces,
            variables: None,
            current: None,
        }
    }

    pub fn with_variables(self, variables: &'a Variables) -> Self {
        Context {
            variables: Some(variables),
            ..self
        }
    }

    /// Set the node `current()` returns.
    pub fn with_current(self, node: Node) -> Self {
        Context {
            current: Some(node),
            ..self
        }
    }

    #[inline]
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub(crate) fn resolve_prefix(&self, prefix: &str) -> Result<&'a str> {
        if prefix == "xml" {
            return Ok(XML_NAMESPACE);
        }
        self.namespaces
            .by_prefix(prefix)
            .ok_or_else(|| Error::UnboundPrefix(prefix.to_string()))
    }

    pub(crate) fn variable(&self, name: &str) -> Result<Value> {
        self.variables
            .and_then(|variables| variables.get(name))
            .cloned()
            .ok_or_else(|| Error::UndefinedVariable(name.to_string()))
    }
}

/// The context node together with its position in the context node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
    pub node: Node,
    /// 1-based.
    pub position: usize,
    pub size: usize,
}

impl Focus {
    pub fn new(node: Node) -> Self {
        Focus {
            node,
            position: 1,
            size: 1,
        }
    }
}

pub(crate) fn evaluate(expr: &Expr, context: &Context, focus: &Focus) -> Result<Value> {
    match expr {
        Expr::Or(left, right) => Ok(Value::Boolean(
            evaluate(left, context, focus)?.to_boolean()
                || evaluate(right, context, focus)?.to_boolean(),
        )),
        Expr::And(left, right) => Ok(Value::Boolean(
            evaluate(left, context, focus)?.to_boolean()
                && evaluate(right, context, focus)?.to_boolean(),
        )),
        Expr::Compare(left, op, right) => {
            let left = evaluate(left, context, focus)?;
            let right = evaluate(right, context, focus)?;
            Ok(Value::Boolean(compare(*op, &left, &right, context.tree)))
        }
        Expr::Arithmetic(left, op, right) => {
            let a = evaluate(left, context, focus)?.to_number(context.tree);
            let b = evaluate(right, context, focus)?.to_number(context.tree);
            Ok(Value::Number(match op {
                ArithmeticOp::Add => a + b,
                ArithmeticOp::Subtract => a - b,
                ArithmeticOp::Multiply => a * b,
                ArithmeticOp::Divide => a / b,
                // truncating remainder, as in Java and ECMAScript
                ArithmeticOp::Modulo => a % b,
            }))
        }
        Expr::Negate(operand) => Ok(Value::Number(
            -evaluate(operand, context, focus)?.to_number(context.tree),
        )),
        Expr::Union(left, right) => {
            let mut nodes = evaluate(left, context, focus)?.into_node_set()?;
            nodes.extend(evaluate(right, context, focus)?.into_node_set()?);
            context.tree.sort(&mut nodes);
            Ok(Value::NodeSet(nodes))
        }
        Expr::Literal(s) => Ok(Value::String(s.clone())),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Variable(name) => context.variable(name),
        Expr::FunctionCall(function, arguments) => {
            function::call(*function, arguments, context, focus)
        }
        Expr::Filter(primary, predicates) => {
            let nodes = evaluate(primary, context, focus)?.into_node_set()?;
            Ok(Value::NodeSet(filter(nodes, predicates, context)?))
        }
        Expr::Path(start, steps) => {
            let mut nodes = match start {
                PathStart::Context => vec![focus.node],
                PathStart::Root => vec![context.tree.top(focus.node)],
                PathStart::Filter(expr) => evaluate(expr, context, focus)?.into_node_set()?,
            };
            for step in steps {
                nodes = apply_step(step, &nodes, context)?;
            }
            Ok(Value::NodeSet(nodes))
        }
    }
}

fn apply_step(step: &Step, nodes: &[Node], context: &Context) -> Result<Vec<Node>> {
    let mut result = Vec::new();
    for node in nodes {
        let mut selected = Vec::new();
        for candidate in axis_nodes(step.axis, *node, context.tree) {
            if node_test(&step.test, step.axis, candidate, context)? {
                selected.push(candidate);
            }
        }
        context.tree.sort(&mut selected);
        if step.axis.is_reverse() {
            selected.reverse();
        }
        result.extend(filter(selected, &step.predicates, context)?);
    }
    context.tree.sort(&mut result);
    Ok(result)
}

/// Apply predicates in turn. Each predicate sees the nodes that survived
/// the previous one, with positions taken from their order in `nodes`.
fn filter(mut nodes: Vec<Node>, predicates: &[Expr], context: &Context) -> Result<Vec<Node>> {
    for predicate in predicates {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in nodes.into_iter().enumerate() {
            let focus = Focus {
                node,
                position: i + 1,
                size,
            };
            let keep = match evaluate(predicate, context, &focus)? {
                Value::Number(n) => n == (i + 1) as f64,
                value => value.to_boolean(),
            };
            if keep {
                kept.push(node);
            }
        }
        nodes = kept;
    }
    Ok(nodes)
}

fn axis_nodes(axis: Axis, node: Node, tree: &Tree) -> Vec<Node> {
    let xot = tree.xot();
    let xot_axis = match axis {
        Axis::Ancestor => xot::Axis::Ancestor,
        Axis::AncestorOrSelf => xot::Axis::AncestorOrSelf,
        Axis::Attribute => xot::Axis::Attribute,
        Axis::Child => xot::Axis::Child,
        Axis::Descendant => xot::Axis::Descendant,
        Axis::DescendantOrSelf => xot::Axis::DescendantOrSelf,
        Axis::Following => xot::Axis::Following,
        Axis::FollowingSibling => xot::Axis::FollowingSibling,
        Axis::Parent => xot::Axis::Parent,
        Axis::Preceding => xot::Axis::Preceding,
        Axis::PrecedingSibling => xot::Axis::PrecedingSibling,
        Axis::Self_ => xot::Axis::Self_,
        Axis::Namespace => return tree.namespace_nodes(node),
    };
    xot.axis(xot_axis, node).collect()
}

fn principal_node_kind(axis: Axis) -> NodeKind {
    match axis {
        Axis::Attribute => NodeKind::Attribute,
        Axis::Namespace => NodeKind::Namespace,
        _ => NodeKind::Element,
    }
}

fn node_test(test: &NodeTest, axis: Axis, node: Node, context: &Context) -> Result<bool> {
    let tree = context.tree;
    match test {
        NodeTest::Kind(kind_test) => Ok(match kind_test {
            KindTest::Node => true,
            KindTest::Text => tree.kind(node) == NodeKind::Text,
            KindTest::Comment => tree.kind(node) == NodeKind::Comment,
            KindTest::ProcessingInstruction(target) => {
                tree.kind(node) == NodeKind::ProcessingInstruction
                    && match target {
                        Some(target) => tree
                            .expanded_name(node)
                            .is_some_and(|(name, _)| name == target.trim()),
                        None => true,
                    }
            }
        }),
        NodeTest::Name(name_test) => {
            if tree.kind(node) != principal_node_kind(axis) {
                return Ok(false);
            }
            let Some((local, uri)) = tree.expanded_name(node) else {
                return Ok(false);
            };
            match name_test {
                NameTest::Star => Ok(true),
                NameTest::Namespace(prefix) => Ok(uri == context.resolve_prefix(prefix)?),
                NameTest::Name { prefix, local: l } => {
                    if local != l {
                        return Ok(false);
                    }
                    match prefix {
                        Some(prefix) => Ok(uri == context.resolve_prefix(prefix)?),
                        None => Ok(uri.is_empty()),
                    }
                }
            }
        }
    }
}
