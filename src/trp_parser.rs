use crate::err::{Result, TrophyError};
use crate::trophy_conf::TrophyConf;
use crate::trophy_record::{TrophyRecord, TrophySet};
use crate::trp_file_header::TrpFileHeader;
use crate::trp_file_table::{FileMap, TrpFileEntry, build_file_map, read_file_table};

use log::{debug, info};
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "TROP.SFM";
pub const DEFAULT_ICON_PREFIX: &str = "TROP";
pub const DEFAULT_ICON_SUFFIX: &str = ".PNG";
pub const DEFAULT_PACKAGE_ICON_NAME: &str = "ICON0.PNG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    config_file_name: String,
    icon_prefix: String,
    icon_suffix: String,
    package_icon_name: String,
    skip_checksum_region: bool,
    trim_text: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            config_file_name: DEFAULT_CONFIG_FILE_NAME.to_string(),
            icon_prefix: DEFAULT_ICON_PREFIX.to_string(),
            icon_suffix: DEFAULT_ICON_SUFFIX.to_string(),
            package_icon_name: DEFAULT_PACKAGE_ICON_NAME.to_string(),
            skip_checksum_region: true,
            trim_text: false,
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    /// Name of the file map entry holding the XML configuration.
    pub fn config_file_name(mut self, name: impl Into<String>) -> Self {
        self.config_file_name = name.into();
        self
    }

    /// Trophy icons are looked up as `<prefix><id><suffix>`.
    pub fn icon_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.icon_prefix = prefix.into();
        self
    }

    pub fn icon_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.icon_suffix = suffix.into();
        self
    }

    pub fn package_icon_name(mut self, name: impl Into<String>) -> Self {
        self.package_icon_name = name.into();
        self
    }

    /// Whether version 2 file tables start after the 20 byte checksum (offset 84) or at 64.
    pub fn skip_checksum_region(mut self, skip: bool) -> Self {
        self.skip_checksum_region = skip;
        self
    }

    /// Strip whitespace around configuration text values.
    pub fn trim_text(mut self, trim: bool) -> Self {
        self.trim_text = trim;
        self
    }

    pub fn get_config_file_name(&self) -> &str {
        &self.config_file_name
    }

    pub fn get_package_icon_name(&self) -> &str {
        &self.package_icon_name
    }

    pub fn should_skip_checksum_region(&self) -> bool {
        self.skip_checksum_region
    }

    pub fn should_trim_text(&self) -> bool {
        self.trim_text
    }

    pub fn icon_file_name(&self, id: &str) -> String {
        format!("{}{}{}", self.icon_prefix, id, self.icon_suffix)
    }
}

/// Owns a package buffer; [`TrophyParser::parse`] borrows from it.
#[derive(Debug, Clone)]
pub struct TrophyParser {
    data: Vec<u8>,
    config: ParserSettings,
}

impl TrophyParser {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| TrophyError::FailedToOpenFile {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded {} ({} bytes)", path.display(), data.len());
        Ok(TrophyParser::from_buffer(data))
    }

    pub fn from_buffer(buffer: Vec<u8>) -> Self {
        TrophyParser {
            data: buffer,
            config: ParserSettings::default(),
        }
    }

    pub fn with_configuration(mut self, configuration: ParserSettings) -> Self {
        self.config = configuration;
        self
    }

    pub fn parse(&self) -> Result<TrophyPackage<'_>> {
        TrophyPackage::parse_with_settings(&self.data, &self.config)
    }

    /// Parses and keeps only the owned trophy set.
    pub fn parse_trophy_set(&self) -> Result<TrophySet> {
        self.parse().map(TrophyPackage::into_trophy_set)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

/// A fully parsed package: the container structures plus the assembled trophy set.
#[derive(Debug, Clone)]
pub struct TrophyPackage<'a> {
    header: TrpFileHeader,
    entries: Vec<TrpFileEntry>,
    files: FileMap<'a>,
    trophies: TrophySet,
}

impl<'a> TrophyPackage<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        Self::parse_with_settings(buf, &ParserSettings::default())
    }

    pub fn parse_with_settings(buf: &'a [u8], settings: &ParserSettings) -> Result<Self> {
        let header = TrpFileHeader::from_bytes(buf)?;
        let table_offset = header.file_table_offset(settings.should_skip_checksum_region());
        let entries = read_file_table(buf, &header, table_offset)?;
        let files = build_file_map(buf, &entries)?;
        debug!(
            "File table at {} holds {} entries ({} distinct names)",
            table_offset,
            entries.len(),
            files.len()
        );

        let conf = TrophyConf::from_file_map(&files, settings)?;
        let trophies = TrophySet::assemble(conf, &files, settings)?;

        Ok(TrophyPackage {
            header,
            entries,
            files,
            trophies,
        })
    }

    pub fn header(&self) -> &TrpFileHeader {
        &self.header
    }

    /// File table rows as declared, including duplicates.
    pub fn entries(&self) -> &[TrpFileEntry] {
        &self.entries
    }

    pub fn files(&self) -> &FileMap<'a> {
        &self.files
    }

    pub fn trophy_set(&self) -> &TrophySet {
        &self.trophies
    }

    /// Drops the file map so the input buffer can be released.
    pub fn into_trophy_set(self) -> TrophySet {
        self.trophies
    }

    pub fn npcommid(&self) -> &str {
        self.trophies.npcommid()
    }

    pub fn title(&self) -> &str {
        self.trophies.title()
    }

    pub fn detail(&self) -> &str {
        self.trophies.detail()
    }

    pub fn version(&self) -> &str {
        self.trophies.version()
    }

    pub fn trophies(&self) -> &[TrophyRecord] {
        self.trophies.trophies()
    }

    pub fn icon(&self) -> Option<&[u8]> {
        self.trophies.icon()
    }

    /// The package icon as a PNG data URI, or an empty string when there is none.
    pub fn icon_data_uri(&self) -> String {
        self.trophies.icon_data_uri()
    }
}
