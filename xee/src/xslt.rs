use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use xee_document::Parameters;

use crate::common::{input_document, split_pair, write_output};

#[derive(Debug, Parser)]
pub(crate) struct Xslt {
    /// XSLT stylesheet file
    pub(crate) stylesheet: PathBuf,

    /// Input XML file (or use stdin if not provided)
    pub(crate) infile: Option<PathBuf>,

    /// Value for a top-level xsl:param (can be repeated)
    /// The format is name=value.
    #[arg(long)]
    pub(crate) param: Vec<String>,

    /// Output file (default stdout)
    #[arg(long, short)]
    pub(crate) output: Option<PathBuf>,
}

impl Xslt {
    pub(crate) fn run(&self) -> anyhow::Result<()> {
        let stylesheet = std::fs::read_to_string(&self.stylesheet).with_context(|| {
            format!(
                "Failed to read stylesheet file: {}",
                self.stylesheet.display()
            )
        })?;
        tracing::debug!(stylesheet = %self.stylesheet.display(), "read stylesheet");

        let document = input_document(&self.infile)?;

        let parameters = self
            .param
            .iter()
            .map(|param| split_pair(param))
            .collect::<anyhow::Result<Parameters>>()?;

        let result = document.transform_with(&stylesheet, &parameters)?;
        write_output(&result.render()?, self.output.as_deref())
    }
}
