//! XSLT 1.0 transformations.
//!
//! [`compile`] turns stylesheet text into a [`Stylesheet`], which can then
//! be applied to any number of [`Tree`]s. Applying a stylesheet never
//! changes its input: the result is written to a new tree.
//!
//! Result tree fragments bound to variables are represented by their string
//! value.
mod ast;
mod compile;
mod error;
mod output;
mod parameters;
mod pattern;
mod run;
mod stylesheet;
mod value_template;

pub use compile::compile;
pub use error::{Error, Result};
pub use parameters::Parameters;
pub use stylesheet::Stylesheet;

use xee_xpath::Tree;
use xot::Xot;

/// Parse `xml`, compile `xslt` and apply it to the document.
pub fn evaluate(xml: &str, xslt: &str) -> Result<Tree> {
    let mut xot = Xot::new();
    let root = xot.parse(xml).map_err(|e| Error::Parse(e.to_string()))?;
    let source = Tree::new(xot, root);
    compile(xslt)?.apply(&source, source.root(), &Parameters::default())
}
