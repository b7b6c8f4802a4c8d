mod common;
mod error;
mod format;
mod xpath;
mod xslt;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format an XML document.
    Format(format::Format),
    /// Print the text and attribute values an xpath expression selects.
    Xpath(xpath::XPath),
    /// Print every node an xpath expression selects, serialized as XML.
    Nodes(xpath::Nodes),
    /// Transform an XML document with an XSLT 1.0 stylesheet.
    Xslt(xslt::Xslt),
}

impl Commands {
    fn run(&self) -> anyhow::Result<()> {
        match self {
            Commands::Format(format) => format.run(),
            Commands::Xpath(xpath) => xpath.run(),
            Commands::Nodes(nodes) => nodes.run(),
            Commands::Xslt(xslt) => xslt.run(),
        }
    }
}

fn main() -> ExitCode {
    // logging goes to stderr and is off unless RUST_LOG asks for it
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error::render_error(&e);
            ExitCode::FAILURE
        }
    }
}
