#![deny(unused_must_use)]
#![forbid(unsafe_code)]
//! A parser for TRP trophy packages.
//!
//! A package is a big-endian container: a fixed 64 byte header, a table of fixed-stride entries
//! (name, offset, size) and the blobs they point at. One blob, `TROP.SFM`, is an XML document
//! describing the trophy set; the others are PNG icons named after the trophies.
//!
//! ```no_run
//! use trophy::TrophyParser;
//!
//! let parser = TrophyParser::from_path("TROPHY.TRP").unwrap();
//! let package = parser.parse().unwrap();
//!
//! println!("{} ({})", package.title(), package.npcommid());
//! for trophy in package.trophies() {
//!     println!("{} {} - {}", trophy.id(), trophy.trophy_type(), trophy.name());
//! }
//! ```

pub use err::{ContainerFormatError, ExportError, MalformedConfigError, Result, TrophyError};
pub use export::{ExportFilter, export_files};
pub use trophy_conf::{TrophyConf, TrophyDescriptor};
pub use trophy_record::{TrophyRecord, TrophySet, TrophyType};
pub use trp_file_header::{TrpFileHeader, TrpVersion};
pub use trp_file_table::{FileMap, TrpFileEntry};
pub use trp_parser::{ParserSettings, TrophyPackage, TrophyParser};

pub mod data_uri;
pub mod err;
pub mod export;
pub mod trophy_conf;
pub mod trophy_record;
pub mod trp_file_header;
pub mod trp_file_table;
pub mod trp_parser;

mod utils;
