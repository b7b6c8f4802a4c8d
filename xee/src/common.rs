use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use xee_document::{Document, NamespaceContext};

/// Load the input document from a file, or from stdin if no file is given.
pub(crate) fn input_document(infile: &Option<PathBuf>) -> anyhow::Result<Document> {
    if let Some(input_path) = infile {
        Document::from_file(input_path)
            .with_context(|| format!("Failed to load XML file: {}", input_path.display()))
    } else {
        Document::from_reader(io::stdin().lock()).context("Failed to load XML from stdin")
    }
}

/// Write `output` to a file, or to stdout if no file is given.
pub(crate) fn write_output(output: &str, outfile: Option<&Path>) -> anyhow::Result<()> {
    if let Some(output_path) = outfile {
        std::fs::write(output_path, output).with_context(|| {
            format!("Failed to write output to file: {}", output_path.display())
        })
    } else {
        println!("{}", output);
        Ok(())
    }
}

/// Parse a `name=value` pair given on the command line.
pub(crate) fn split_pair(pair: &str) -> anyhow::Result<(&str, &str)> {
    pair.split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected name=value, got {:?}", pair))
}

/// Build the namespace context for `prefix=uri` declarations, on top of the
/// standard bindings.
pub(crate) fn namespace_context(declarations: &[String]) -> anyhow::Result<NamespaceContext> {
    let declared = declarations.iter().try_fold(
        NamespaceContext::empty(),
        |context, declaration| -> anyhow::Result<NamespaceContext> {
            let (prefix, uri) = split_pair(declaration)?;
            context
                .try_add(prefix, uri)
                .with_context(|| format!("Invalid namespace declaration: {declaration}"))
        },
    )?;
    Ok(NamespaceContext::default().merge(&declared))
}
