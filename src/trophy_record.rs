use crate::data_uri::png_data_uri;
use crate::err::{Result, TrophyError};
use crate::trophy_conf::{TrophyConf, TrophyDescriptor};
use crate::trp_file_table::FileMap;
use crate::trp_parser::ParserSettings;

use log::trace;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrophyType {
    Platinum,
    Gold,
    Silver,
    Bronze,
}

impl TrophyType {
    /// Maps the `ttype` attribute (`P`, `G`, `S` or `B`).
    pub fn from_code(code: &str) -> Option<TrophyType> {
        match code {
            "P" => Some(TrophyType::Platinum),
            "G" => Some(TrophyType::Gold),
            "S" => Some(TrophyType::Silver),
            "B" => Some(TrophyType::Bronze),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            TrophyType::Platinum => 'P',
            TrophyType::Gold => 'G',
            TrophyType::Silver => 'S',
            TrophyType::Bronze => 'B',
        }
    }
}

impl fmt::Display for TrophyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrophyType::Platinum => "Platinum",
            TrophyType::Gold => "Gold",
            TrophyType::Silver => "Silver",
            TrophyType::Bronze => "Bronze",
        };
        f.write_str(name)
    }
}

fn serialize_icon<S: Serializer>(
    icon: &Option<Vec<u8>>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match icon {
        Some(data) => s.serialize_some(&png_data_uri(data)),
        None => s.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrophyRecord {
    id: String,
    #[serde(rename = "type")]
    trophy_type: TrophyType,
    hidden: bool,
    pid: Option<String>,
    name: String,
    description: String,
    #[serde(serialize_with = "serialize_icon")]
    icon: Option<Vec<u8>>,
}

impl TrophyRecord {
    fn from_descriptor(descriptor: TrophyDescriptor, icon: Option<&[u8]>) -> Result<Self> {
        let trophy_type =
            TrophyType::from_code(&descriptor.ttype).ok_or_else(|| TrophyError::UnknownTrophyType {
                id: descriptor.id.clone(),
                code: descriptor.ttype.clone(),
            })?;

        Ok(TrophyRecord {
            hidden: descriptor.hidden.as_deref() == Some("yes"),
            id: descriptor.id,
            trophy_type,
            pid: descriptor.pid,
            name: descriptor.name,
            description: descriptor.detail,
            icon: icon.map(<[u8]>::to_vec),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn trophy_type(&self) -> TrophyType {
        self.trophy_type
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// The `pid` attribute, passed through untouched.
    pub fn pid(&self) -> Option<&str> {
        self.pid.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn icon(&self) -> Option<&[u8]> {
        self.icon.as_deref()
    }

    /// The icon as a PNG data URI, if the package has one for this trophy.
    pub fn embed(&self) -> Option<String> {
        self.icon.as_deref().map(png_data_uri)
    }
}

impl fmt::Display for TrophyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[TrophyData#{}]", self.id)
    }
}

/// Everything a package says about its trophies. Owns its data, so it outlives the input buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrophySet {
    npcommid: String,
    title: String,
    detail: String,
    version: String,
    #[serde(serialize_with = "serialize_icon")]
    icon: Option<Vec<u8>>,
    trophies: Vec<TrophyRecord>,
}

impl TrophySet {
    /// Joins every descriptor in `conf` with its icon from `files`, keeping document order.
    pub fn assemble(conf: TrophyConf, files: &FileMap, settings: &ParserSettings) -> Result<Self> {
        let mut trophies = Vec::with_capacity(conf.trophies.len());

        for descriptor in conf.trophies {
            let icon_name = settings.icon_file_name(&descriptor.id);
            let icon = files.get(&icon_name);
            trace!(
                "Trophy `{}` ({}), icon `{}` {}",
                descriptor.id,
                descriptor.ttype,
                icon_name,
                if icon.is_some() { "found" } else { "missing" }
            );
            trophies.push(TrophyRecord::from_descriptor(descriptor, icon)?);
        }

        Ok(TrophySet {
            npcommid: conf.npcommid,
            title: conf.title_name,
            detail: conf.title_detail,
            version: conf.trophyset_version,
            icon: files
                .get(settings.get_package_icon_name())
                .map(<[u8]>::to_vec),
            trophies,
        })
    }

    /// The NP commerce id, e.g. `NPWR01234_00`.
    pub fn npcommid(&self) -> &str {
        &self.npcommid
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Version of the trophy set (`trophyset-version`), unrelated to the container version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Trophies in display order.
    pub fn trophies(&self) -> &[TrophyRecord] {
        &self.trophies
    }

    pub fn icon(&self) -> Option<&[u8]> {
        self.icon.as_deref()
    }

    /// The package icon as a PNG data URI, or an empty string when there is none.
    pub fn icon_data_uri(&self) -> String {
        self.icon.as_deref().map(png_data_uri).unwrap_or_default()
    }
}

impl fmt::Display for TrophySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Trophy#{}]", self.npcommid)
    }
}
