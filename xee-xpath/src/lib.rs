//! An XPath 1.0 engine over [`xot`] trees.
//!
//! Expressions are compiled once with [`XPath::compile`] and can then be
//! evaluated any number of times against a [`Tree`]. [`evaluate`] compiles
//! and runs a node-selecting query in one go.

mod ast;
mod error;
mod eval;
mod function;
mod lexer;
mod parser;
mod query;
mod tree;
mod value;

pub use ast::{ArithmeticOp, Axis, CompareOp, Expr, KindTest, NameTest, NodeTest, PathStart, Step};
pub use error::{Error, Result, Span};
pub use eval::{Context, Focus, Variables};
pub use function::Function;
pub use query::{evaluate, MatchedNode, XPath};
pub use tree::{NodeKind, Tree};
pub use value::{number_to_string, string_to_number, Value};
