use std::{fs::File, io::Write, path::PathBuf};

use clap::Parser;
use xot::output::{
    xml::{Declaration, Parameters},
    Indentation,
};

use crate::common::input_document;

#[derive(Debug, Parser)]
pub(crate) struct Format {
    /// input xml file (default stdin)
    pub(crate) infile: Option<PathBuf>,
    /// output xml file (default stdout)
    pub(crate) outfile: Option<PathBuf>,
    /// Indent the output
    #[arg(long)]
    pub(crate) indent: bool,
    /// Output the XML declaration (without encoding).
    #[arg(long)]
    pub(crate) declaration: bool,
    /// Escape gt (>) characters in text content. By default this is false.
    #[arg(long)]
    pub(crate) escape_gt: bool,
}

impl Format {
    pub(crate) fn run(&self) -> anyhow::Result<()> {
        let document = input_document(&self.infile)?;

        let mut writer: Box<dyn Write> = if let Some(outfile) = &self.outfile {
            Box::new(File::create(outfile)?)
        } else {
            Box::new(std::io::stdout())
        };

        let parameters = Parameters {
            indentation: self.indent.then(Indentation::default),
            cdata_section_elements: Vec::new(),
            doctype: None,
            declaration: self.declaration.then_some(Declaration {
                encoding: None,
                standalone: None,
            }),
            unescaped_gt: !self.escape_gt,
        };

        let node = document.node();
        node.xot()
            .serialize_xml_write(parameters, node.node(), &mut writer)?;
        writeln!(writer)?;
        Ok(())
    }
}
