use rust_decimal::Decimal;
use xee_xpath::Tree;
use xot::Node;

use crate::ast::{Global, Template};
use crate::error::Result;
use crate::parameters::Parameters;
use crate::run::Runner;

/// A compiled stylesheet.
///
/// A stylesheet owns everything it needs and does not refer back to the
/// text it was compiled from, so it can be shared between threads and
/// applied any number of times.
#[derive(Debug)]
pub struct Stylesheet {
    pub(crate) templates: Vec<Template>,
    pub(crate) globals: Vec<Global>,
}

impl Stylesheet {
    /// Transform the tree at `node` into a new tree.
    ///
    /// The source is only read; the result is written to a fresh arena.
    pub fn apply(&self, source: &Tree, node: Node, parameters: &Parameters) -> Result<Tree> {
        Runner::new(self, source).run(node, parameters)
    }

    /// The template rule for `node` in `mode`: highest priority first, and
    /// the last declared among equals.
    pub(crate) fn matching(
        &self,
        source: &Tree,
        node: Node,
        mode: Option<&str>,
    ) -> Result<Option<&Template>> {
        let mut best: Option<(Decimal, &Template)> = None;
        for template in &self.templates {
            if template.mode.as_deref() != mode {
                continue;
            }
            let Some(pattern) = &template.pattern else {
                continue;
            };
            if let Some(default) = pattern.matches(source, node)? {
                let priority = template.priority.unwrap_or(default);
                if best.map_or(true, |(best, _)| priority >= best) {
                    best = Some((priority, template));
                }
            }
        }
        Ok(best.map(|(_, template)| template))
    }

    pub(crate) fn named(&self, name: &str) -> Option<&Template> {
        self.templates
            .iter()
            .rev()
            .find(|template| template.name.as_deref() == Some(name))
    }
}
