//! Parsing of the `TROP.SFM` configuration document.
//!
//! The document looks like this (elements we don't use, such as `parental-level`, are skipped):
//!
//! ```xml
//! <trophyconf version="1.1">
//!   <npcommid>NPWR00000_00</npcommid>
//!   <trophyset-version>01.00</trophyset-version>
//!   <title-name>Title</title-name>
//!   <title-detail>Detail</title-detail>
//!   <trophy id="000" hidden="no" ttype="P" pid="-1">
//!     <name>Name</name>
//!     <detail>Description</detail>
//!   </trophy>
//! </trophyconf>
//! ```
//!
//! Values are kept as raw strings here; interpreting `hidden` and `ttype` is the job of
//! [`crate::trophy_record`].

use crate::err::{MalformedConfigError, Result, TrophyError};
use crate::trp_file_table::FileMap;
use crate::trp_parser::ParserSettings;

use log::{debug, trace};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const ROOT: &str = "trophyconf";
const TROPHY: &str = "trophy";

/// Header fields and trophy descriptors, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrophyConf {
    pub npcommid: String,
    pub title_name: String,
    pub title_detail: String,
    pub trophyset_version: String,
    pub trophies: Vec<TrophyDescriptor>,
}

/// A `<trophy>` element before its attributes are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrophyDescriptor {
    pub id: String,
    pub hidden: Option<String>,
    pub ttype: String,
    pub pid: Option<String>,
    pub name: String,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    CommerceId,
    TitleName,
    TitleDetail,
    Version,
    Name,
    Detail,
}

impl Field {
    fn element(self) -> &'static str {
        match self {
            Field::CommerceId => "npcommid",
            Field::TitleName => "title-name",
            Field::TitleDetail => "title-detail",
            Field::Version => "trophyset-version",
            Field::Name => "name",
            Field::Detail => "detail",
        }
    }

    fn header_field(name: &[u8]) -> Option<Field> {
        [
            Field::CommerceId,
            Field::TitleName,
            Field::TitleDetail,
            Field::Version,
        ]
        .into_iter()
        .find(|f| f.element().as_bytes() == name)
    }

    fn trophy_field(name: &[u8]) -> Option<Field> {
        [Field::Name, Field::Detail]
            .into_iter()
            .find(|f| f.element().as_bytes() == name)
    }
}

#[derive(Debug)]
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

#[derive(Debug)]
struct PendingTrophy {
    id: String,
    hidden: Option<String>,
    ttype: String,
    pid: Option<String>,
    name: Option<String>,
    detail: Option<String>,
}

impl PendingTrophy {
    fn from_element(
        e: &BytesStart,
        position: u64,
    ) -> std::result::Result<Self, MalformedConfigError> {
        let xml_err = |source: quick_xml::Error| MalformedConfigError::Xml { position, source };

        let mut id = None;
        let mut hidden = None;
        let mut ttype = None;
        let mut pid = None;

        for attr in e.attributes() {
            let attr = attr.map_err(|err| xml_err(err.into()))?;
            let slot = match attr.key.as_ref() {
                b"id" => &mut id,
                b"hidden" => &mut hidden,
                b"ttype" => &mut ttype,
                b"pid" => &mut pid,
                _ => continue,
            };
            *slot = Some(attr.unescape_value().map_err(xml_err)?.into_owned());
        }

        let missing = |attribute: &'static str| MalformedConfigError::MissingAttribute {
            element: TROPHY,
            attribute,
        };

        Ok(PendingTrophy {
            id: id.ok_or_else(|| missing("id"))?,
            hidden,
            ttype: ttype.ok_or_else(|| missing("ttype"))?,
            pid,
            name: None,
            detail: None,
        })
    }
}

/// Walks the reader's events, tracking only the elements we care about.
#[derive(Debug, Default)]
struct ConfBuilder {
    trim_text: bool,
    depth: usize,
    seen_root: bool,
    npcommid: Option<String>,
    title_name: Option<String>,
    title_detail: Option<String>,
    trophyset_version: Option<String>,
    capture: Option<Capture>,
    current: Option<PendingTrophy>,
    trophies: Vec<TrophyDescriptor>,
}

impl ConfBuilder {
    fn open(
        &mut self,
        e: &BytesStart,
        is_empty: bool,
        position: u64,
    ) -> std::result::Result<(), MalformedConfigError> {
        let name = e.name();
        let name = name.as_ref();

        if self.depth == 0 {
            if name != ROOT.as_bytes() || self.seen_root {
                return Err(MalformedConfigError::UnexpectedRoot {
                    expected: ROOT,
                    found: String::from_utf8_lossy(name).into_owned(),
                });
            }
            self.seen_root = true;
        } else if self.capture.is_some() {
            // Markup nested inside a text field only contributes its text.
        } else if self.depth == 1 {
            if let Some(field) = Field::header_field(name) {
                self.begin_capture(field, is_empty)?;
            } else if name == TROPHY.as_bytes() {
                let trophy = PendingTrophy::from_element(e, position)?;
                trace!("Opened trophy `{}`", trophy.id);
                self.current = Some(trophy);
                if is_empty {
                    self.finish_trophy()?;
                }
            } else {
                trace!("Skipping `{}` element", String::from_utf8_lossy(name));
            }
        } else if self.depth == 2 && self.current.is_some() {
            if let Some(field) = Field::trophy_field(name) {
                self.begin_capture(field, is_empty)?;
            }
        }

        if !is_empty {
            self.depth += 1;
        }
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), MalformedConfigError> {
        self.depth = self.depth.saturating_sub(1);

        if self.capture.as_ref().is_some_and(|c| c.depth == self.depth) {
            self.finish_capture()?;
        } else if self.depth == 1 && self.current.is_some() && self.capture.is_none() {
            self.finish_trophy()?;
        }
        Ok(())
    }

    fn text(
        &mut self,
        text: &str,
        position: u64,
    ) -> std::result::Result<(), MalformedConfigError> {
        if self.depth == 0 {
            if !text.trim().is_empty() {
                return Err(MalformedConfigError::TextOutsideRoot { position });
            }
        } else if let Some(capture) = self.capture.as_mut() {
            capture.text.push_str(text);
        }
        Ok(())
    }

    fn begin_capture(
        &mut self,
        field: Field,
        is_empty: bool,
    ) -> std::result::Result<(), MalformedConfigError> {
        self.capture = Some(Capture {
            field,
            depth: self.depth,
            text: String::new(),
        });
        if is_empty {
            self.finish_capture()?;
        }
        Ok(())
    }

    fn finish_capture(&mut self) -> std::result::Result<(), MalformedConfigError> {
        let Some(capture) = self.capture.take() else {
            return Ok(());
        };

        let value = if self.trim_text {
            capture.text.trim().to_string()
        } else {
            capture.text
        };

        let slot = match capture.field {
            Field::CommerceId => &mut self.npcommid,
            Field::TitleName => &mut self.title_name,
            Field::TitleDetail => &mut self.title_detail,
            Field::Version => &mut self.trophyset_version,
            Field::Name | Field::Detail => {
                let Some(trophy) = self.current.as_mut() else {
                    return Ok(());
                };
                if capture.field == Field::Name {
                    &mut trophy.name
                } else {
                    &mut trophy.detail
                }
            }
        };

        // Repeated elements keep their first value.
        if slot.is_none() {
            *slot = Some(value);
        } else {
            debug!("Ignoring repeated `{}` element", capture.field.element());
        }
        Ok(())
    }

    fn finish_trophy(&mut self) -> std::result::Result<(), MalformedConfigError> {
        let Some(trophy) = self.current.take() else {
            return Ok(());
        };

        let name = trophy
            .name
            .ok_or_else(|| MalformedConfigError::MissingTrophyField {
                id: trophy.id.clone(),
                field: Field::Name.element(),
            })?;
        let detail = trophy
            .detail
            .ok_or_else(|| MalformedConfigError::MissingTrophyField {
                id: trophy.id.clone(),
                field: Field::Detail.element(),
            })?;

        self.trophies.push(TrophyDescriptor {
            id: trophy.id,
            hidden: trophy.hidden,
            ttype: trophy.ttype,
            pid: trophy.pid,
            name,
            detail,
        });
        Ok(())
    }

    fn finish(self) -> std::result::Result<TrophyConf, MalformedConfigError> {
        if !self.seen_root {
            return Err(MalformedConfigError::MissingRoot);
        }
        if self.depth != 0 {
            return Err(MalformedConfigError::UnexpectedEof);
        }

        let require = |value: Option<String>, field: Field| {
            value.ok_or(MalformedConfigError::MissingField {
                field: field.element(),
            })
        };

        Ok(TrophyConf {
            npcommid: require(self.npcommid, Field::CommerceId)?,
            title_name: require(self.title_name, Field::TitleName)?,
            title_detail: require(self.title_detail, Field::TitleDetail)?,
            trophyset_version: require(self.trophyset_version, Field::Version)?,
            trophies: self.trophies,
        })
    }
}

impl TrophyConf {
    /// Looks up the configuration document in `files` and parses it.
    pub fn from_file_map(files: &FileMap, settings: &ParserSettings) -> Result<TrophyConf> {
        let name = settings.get_config_file_name();
        let data = files.get(name).ok_or_else(|| TrophyError::MissingConfig {
            name: name.to_string(),
        })?;

        debug!("Parsing `{}` ({} bytes)", name, data.len());
        Ok(TrophyConf::from_bytes(data, settings.should_trim_text())?)
    }

    /// Parses a raw configuration document.
    ///
    /// When `trim_text` is set, whitespace around text values is removed.
    pub fn from_bytes(
        data: &[u8],
        trim_text: bool,
    ) -> std::result::Result<TrophyConf, MalformedConfigError> {
        let text = std::str::from_utf8(data)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = Reader::from_str(text);
        let mut builder = ConfBuilder {
            trim_text,
            ..ConfBuilder::default()
        };

        loop {
            let event = reader
                .read_event()
                .map_err(|source| MalformedConfigError::Xml {
                    position: reader.buffer_position() as u64,
                    source,
                })?;
            let position = reader.buffer_position() as u64;
            let xml_err = |source: quick_xml::Error| MalformedConfigError::Xml { position, source };

            match event {
                Event::Start(e) => builder.open(&e, false, position)?,
                Event::Empty(e) => builder.open(&e, true, position)?,
                Event::End(_) => builder.close()?,
                Event::Text(e) => builder.text(&e.unescape().map_err(xml_err)?, position)?,
                Event::CData(e) => {
                    let raw = e.into_inner();
                    builder.text(std::str::from_utf8(&raw)?, position)?
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let conf = builder.finish()?;
        debug!(
            "Parsed configuration for `{}` with {} trophies",
            conf.npcommid,
            conf.trophies.len()
        );
        Ok(conf)
    }
}
