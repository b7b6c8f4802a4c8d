// Constructors that read a document from somewhere other than a string.

use std::io::{self, Read};
use std::path::Path;

use url::Url;

use crate::document::Document;
use crate::error::Result;

impl Document {
    /// Read and parse the file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "read document");
        Self::from_text(&text)
    }

    /// Read `reader` to the end and parse what it produced.
    ///
    /// The reader is taken by value and dropped before this returns,
    /// whether parsing succeeds or not.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        drop(reader);
        Self::from_text(&text)
    }

    /// Load a document from a `file:` URL.
    pub fn from_url(url: &Url) -> Result<Self> {
        if url.scheme() != "file" {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported URL scheme {:?} in {}", url.scheme(), url),
            )
            .into());
        }
        let path = url.to_file_path().map_err(|()| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a local file path", url),
            )
        })?;
        Self::from_file(path)
    }

    /// Parse `uri` as a URL and load from it.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{}: {}", uri, e)))?;
        Self::from_url(&url)
    }
}
