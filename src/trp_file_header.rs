use crate::err::ContainerFormatError;
use crate::utils::bytes;

use log::{debug, warn};

/// Magic found at the start of every TRP package.
pub const TRP_MAGIC: u32 = 0xDCA2_4D00;
/// Size of the fixed header. The file table never starts before this offset.
pub const TRP_FILE_HEADER_SIZE: usize = 64;
/// Size of the checksum region carried by version 2 headers.
pub const TRP_CHECKSUM_SIZE: usize = 20;

const CHECKSUM_OFFSET: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrpVersion {
    V1,
    /// Adds a 20 byte checksum at offset 28.
    V2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrpFileHeader {
    pub magic: u32,
    pub version: TrpVersion,
    /// Low half of the 64 bit size field at offset 8. Packers write the total package length.
    pub file_table_size: u32,
    pub file_count: u32,
    pub entry_stride: u32,
    pub checksum: Option<[u8; TRP_CHECKSUM_SIZE]>,
}

impl TrpFileHeader {
    pub fn from_bytes(buf: &[u8]) -> Result<TrpFileHeader, ContainerFormatError> {
        if buf.len() < TRP_FILE_HEADER_SIZE {
            return Err(ContainerFormatError::HeaderTruncated {
                need: TRP_FILE_HEADER_SIZE,
                have: buf.len(),
            });
        }

        // Every read below is inside the first 64 bytes, which were checked above.
        let truncated = || ContainerFormatError::HeaderTruncated {
            need: TRP_FILE_HEADER_SIZE,
            have: buf.len(),
        };

        let magic = bytes::read_u32_be(buf, 0).ok_or_else(truncated)?;
        if magic != TRP_MAGIC {
            warn!(
                "Unexpected TRP magic `{:08x}` (expected `{:08x}`), continuing anyway",
                magic, TRP_MAGIC
            );
        }

        let version = match bytes::read_u32_be(buf, 4).ok_or_else(truncated)? {
            1 => TrpVersion::V1,
            2 => TrpVersion::V2,
            other => return Err(ContainerFormatError::UnsupportedVersion { version: other }),
        };

        let file_table_size = low_u32(
            bytes::read_u64_be(buf, 8).ok_or_else(truncated)?,
            "file table size",
        )?;
        let file_count = bytes::read_u32_be(buf, 16).ok_or_else(truncated)?;
        let entry_stride = bytes::read_u32_be(buf, 20).ok_or_else(truncated)?;
        // offset 24 is unused

        let checksum = match version {
            TrpVersion::V1 => None,
            TrpVersion::V2 => Some(
                bytes::read_array::<TRP_CHECKSUM_SIZE>(buf, CHECKSUM_OFFSET)
                    .ok_or_else(truncated)?,
            ),
        };

        let header = TrpFileHeader {
            magic,
            version,
            file_table_size,
            file_count,
            entry_stride,
            checksum,
        };

        debug!("TRP Header: {:?}", header);

        if header.file_table_size as usize != buf.len() {
            debug!(
                "Header declares {} bytes, but buffer holds {}",
                header.file_table_size,
                buf.len()
            );
        }

        Ok(header)
    }

    /// Offset of the first file table entry.
    ///
    /// Version 2 tables are shifted past the checksum region unless `skip_checksum_region` is off.
    pub fn file_table_offset(&self, skip_checksum_region: bool) -> usize {
        match self.version {
            TrpVersion::V2 if skip_checksum_region => TRP_FILE_HEADER_SIZE + TRP_CHECKSUM_SIZE,
            _ => TRP_FILE_HEADER_SIZE,
        }
    }
}

/// Narrows a nominally 64 bit field, refusing to silently drop the high half.
pub(crate) fn low_u32(value: u64, what: &'static str) -> Result<u32, ContainerFormatError> {
    u32::try_from(value).map_err(|_| ContainerFormatError::ValueTooLarge { what, value })
}
