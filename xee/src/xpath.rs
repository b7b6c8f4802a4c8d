use std::path::PathBuf;

use clap::Parser;

use crate::common::{input_document, namespace_context};

#[derive(Debug, Parser)]
pub(crate) struct XPath {
    /// xpath expression, selecting text or attribute nodes
    pub(crate) xpath: String,
    /// input xml file (default stdin)
    pub(crate) infile: Option<PathBuf>,
    /// Namespace declaration to make available in XPath (can be repeated)
    /// The format is prefix=uri.
    #[arg(long)]
    pub(crate) namespace: Vec<String>,
}

impl XPath {
    pub(crate) fn run(&self) -> anyhow::Result<()> {
        let document = input_document(&self.infile)?;
        let document = document.merge_namespaces(&namespace_context(&self.namespace)?);
        for value in document.query(&self.xpath)? {
            println!("{}", value);
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
pub(crate) struct Nodes {
    /// xpath expression
    pub(crate) xpath: String,
    /// input xml file (default stdin)
    pub(crate) infile: Option<PathBuf>,
    /// Namespace declaration to make available in XPath (can be repeated)
    /// The format is prefix=uri.
    #[arg(long)]
    pub(crate) namespace: Vec<String>,
}

impl Nodes {
    pub(crate) fn run(&self) -> anyhow::Result<()> {
        let document = input_document(&self.infile)?;
        let document = document.merge_namespaces(&namespace_context(&self.namespace)?);
        for node in document.nodes(&self.xpath)? {
            println!("{}", node.render()?);
        }
        Ok(())
    }
}
