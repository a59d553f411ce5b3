use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrophyError>;

/// Top level error for parsing a trophy package.
#[derive(Debug, Error)]
pub enum TrophyError {
    #[error(transparent)]
    Container(#[from] ContainerFormatError),

    #[error("configuration document `{name}` is missing from the package")]
    MissingConfig { name: String },

    #[error("malformed configuration document: {0}")]
    MalformedConfig(#[from] MalformedConfigError),

    #[error("trophy `{id}` has unknown type code `{code}`")]
    UnknownTrophyType { id: String, code: String },

    #[error("failed to open file {}: {source}", path.display())]
    FailedToOpenFile { path: PathBuf, source: io::Error },
}

/// Errors related to the binary container (fixed header and file table).
#[derive(Debug, Error)]
pub enum ContainerFormatError {
    #[error("buffer too small for file header (need {need} bytes, have {have})")]
    HeaderTruncated { need: usize, have: usize },

    #[error("unsupported container format version {version} (expected 1 or 2)")]
    UnsupportedVersion { version: u32 },

    #[error("file table entry stride {stride} is smaller than the {need} bytes an entry occupies")]
    EntryStrideTooSmall { stride: u32, need: usize },

    #[error(
        "buffer too small for file table of {count} entries at offset {offset} (need {need} bytes, have {have})"
    )]
    TableTruncated {
        count: u32,
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("entry `{name}` spans {offset}..{offset}+{size}, past the end of the buffer (len={len})")]
    EntryOutOfBounds {
        name: String,
        offset: u64,
        size: u64,
        len: usize,
    },

    #[error("{what} value {value:#x} does not fit in 32 bits")]
    ValueTooLarge { what: &'static str, value: u64 },
}

/// Errors related to the embedded XML configuration document.
#[derive(Debug, Error)]
pub enum MalformedConfigError {
    // `quick-xml` keeps the element stack for us, so structural problems (mismatched end tags
    // etc.) land here alongside syntax errors.
    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: u64,
        source: quick_xml::Error,
    },

    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("document has no root element")]
    MissingRoot,

    #[error("unexpected root element `{found}`, expected `{expected}`")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("missing `{field}` element")]
    MissingField { field: &'static str },

    #[error("trophy `{id}` is missing its `{field}` element")]
    MissingTrophyField { id: String, field: &'static str },

    #[error("`{element}` element is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("text outside of the root element at byte {position}")]
    TextOutsideRoot { position: u64 },

    #[error("document ended before the root element was closed")]
    UnexpectedEof,
}

/// Errors raised while writing file map entries to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}
