use crate::function::Function;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    Self_,
}

impl Axis {
    pub(crate) fn from_name(name: &str) -> Option<Axis> {
        Some(match name {
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "attribute" => Axis::Attribute,
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "following" => Axis::Following,
            "following-sibling" => Axis::FollowingSibling,
            "namespace" => Axis::Namespace,
            "parent" => Axis::Parent,
            "preceding" => Axis::Preceding,
            "preceding-sibling" => Axis::PrecedingSibling,
            "self" => Axis::Self_,
            _ => return None,
        })
    }

    /// Reverse axes count proximity positions backwards from the context
    /// node.
    pub fn is_reverse(&self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameTest {
    /// `*`
    Star,
    /// `prefix:*`
    Namespace(String),
    /// `name` or `prefix:name`
    Name {
        prefix: Option<String>,
        local: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum KindTest {
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    Name(NameTest),
    Kind(KindTest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    /// `descendant-or-self::node()`, what `//` abbreviates.
    pub(crate) fn descendant_or_self() -> Self {
        Step {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Kind(KindTest::Node),
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathStart {
    /// A relative location path starts at the context node.
    Context,
    /// An absolute location path starts at the root of the context node's
    /// tree.
    Root,
    /// A filter expression followed by `/` or `//`.
    Filter(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl CompareOp {
    /// The operator to use when the operands are swapped.
    pub(crate) fn swap(self) -> Self {
        match self {
            CompareOp::LessThan => CompareOp::GreaterThan,
            CompareOp::LessThanEqual => CompareOp::GreaterThanEqual,
            CompareOp::GreaterThan => CompareOp::LessThan,
            CompareOp::GreaterThanEqual => CompareOp::LessThanEqual,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
    Arithmetic(Box<Expr>, ArithmeticOp, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Variable(String),
    FunctionCall(Function, Vec<Expr>),
    /// A primary expression with one or more predicates.
    Filter(Box<Expr>, Vec<Expr>),
    Path(PathStart, Vec<Step>),
}

impl Expr {
    /// Every namespace prefix used in a name test, in the order written.
    /// Repeated prefixes are reported once.
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes = Vec::new();
        self.collect_prefixes(&mut prefixes);
        prefixes
    }

    fn collect_prefixes<'a>(&'a self, prefixes: &mut Vec<&'a str>) {
        match self {
            Expr::Or(left, right)
            | Expr::And(left, right)
            | Expr::Compare(left, _, right)
            | Expr::Arithmetic(left, _, right)
            | Expr::Union(left, right) => {
                left.collect_prefixes(prefixes);
                right.collect_prefixes(prefixes);
            }
            Expr::Negate(operand) => operand.collect_prefixes(prefixes),
            Expr::Literal(_) | Expr::Number(_) | Expr::Variable(_) => {}
            Expr::FunctionCall(_, args) => {
                for arg in args {
                    arg.collect_prefixes(prefixes);
                }
            }
            Expr::Filter(primary, predicates) => {
                primary.collect_prefixes(prefixes);
                for predicate in predicates {
                    predicate.collect_prefixes(prefixes);
                }
            }
            Expr::Path(start, steps) => {
                if let PathStart::Filter(filter) = start {
                    filter.collect_prefixes(prefixes);
                }
                for step in steps {
                    let prefix = match &step.test {
                        NodeTest::Name(NameTest::Namespace(prefix))
                        | NodeTest::Name(NameTest::Name {
                            prefix: Some(prefix),
                            ..
                        }) => Some(prefix.as_str()),
                        _ => None,
                    };
                    if let Some(prefix) = prefix {
                        if !prefixes.contains(&prefix) {
                            prefixes.push(prefix);
                        }
                    }
                    for predicate in &step.predicates {
                        predicate.collect_prefixes(prefixes);
                    }
                }
            }
        }
    }
}
