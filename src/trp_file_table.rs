use crate::err::ContainerFormatError;
use crate::trp_file_header::{TrpFileHeader, low_u32};
use crate::utils::bytes;

use hashbrown::HashMap as FastMap;
use hashbrown::hash_map::Entry;
use log::trace;

/// Width of the NUL padded name field at the start of every entry.
pub const ENTRY_NAME_SIZE: usize = 32;
const ENTRY_OFFSET_FIELD: usize = 32;
const ENTRY_SIZE_FIELD: usize = 40;
/// Smallest stride that still covers the name, offset and size fields.
pub const MIN_ENTRY_STRIDE: usize = 48;

/// A single row of the file table, as declared by the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrpFileEntry {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

impl TrpFileEntry {
    /// Reads the entry starting at `entry_offset`. The caller has already checked the table bounds.
    fn from_bytes(buf: &[u8], entry_offset: usize) -> Result<Self, ContainerFormatError> {
        let truncated = || ContainerFormatError::TableTruncated {
            count: 1,
            offset: entry_offset,
            need: MIN_ENTRY_STRIDE,
            have: buf.len().saturating_sub(entry_offset),
        };

        let raw_name =
            bytes::read_array::<ENTRY_NAME_SIZE>(buf, entry_offset).ok_or_else(truncated)?;
        let offset = bytes::read_u64_be(buf, entry_offset + ENTRY_OFFSET_FIELD)
            .ok_or_else(truncated)?;
        let size =
            bytes::read_u64_be(buf, entry_offset + ENTRY_SIZE_FIELD).ok_or_else(truncated)?;

        Ok(TrpFileEntry {
            name: decode_entry_name(&raw_name),
            offset: low_u32(offset, "entry offset")?,
            size: low_u32(size, "entry size")?,
        })
    }
}

/// The name is everything before the first NUL, with surrounding whitespace removed.
fn decode_entry_name(raw: &[u8; ENTRY_NAME_SIZE]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

/// Filename → blob association decoded from the file table.
///
/// Blobs borrow from the package buffer. A name listed twice keeps the data of its last entry,
/// but stays at the position where it first appeared, so iteration follows the file table.
#[derive(Debug, Clone, Default)]
pub struct FileMap<'a> {
    entries: Vec<(String, &'a [u8])>,
    index: FastMap<String, usize, ahash::RandomState>,
}

impl<'a> FileMap<'a> {
    pub fn new() -> Self {
        FileMap {
            entries: Vec::new(),
            index: FastMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Inserts `data` under `name`, replacing the blob of an existing entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, data: &'a [u8]) {
        let name = name.into();
        match self.index.entry(name) {
            Entry::Occupied(existing) => {
                trace!("Duplicate file table entry `{}`, replacing", existing.key());
                self.entries[*existing.get()].1 = data;
            }
            Entry::Vacant(vacant) => {
                self.entries.push((vacant.key().clone(), data));
                vacant.insert(self.entries.len() - 1);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a [u8]> {
        self.index.get(name).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, blob)` pairs in file table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &'a [u8])> + '_ {
        self.entries.iter().map(|(name, data)| (name.as_str(), *data))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

/// Reads `header.file_count` entries starting at `table_offset`.
pub fn read_file_table(
    buf: &[u8],
    header: &TrpFileHeader,
    table_offset: usize,
) -> Result<Vec<TrpFileEntry>, ContainerFormatError> {
    let stride = usize::try_from(header.entry_stride).unwrap_or(usize::MAX);
    if stride < MIN_ENTRY_STRIDE {
        return Err(ContainerFormatError::EntryStrideTooSmall {
            stride: header.entry_stride,
            need: MIN_ENTRY_STRIDE,
        });
    }

    let count = usize::try_from(header.file_count).unwrap_or(usize::MAX);
    if count == 0 {
        // An empty table occupies no bytes, even when its start lies past the end of the buffer.
        return Ok(Vec::new());
    }

    let table_truncated = |need: usize| ContainerFormatError::TableTruncated {
        count: header.file_count,
        offset: table_offset,
        need,
        have: buf.len().saturating_sub(table_offset),
    };

    // The last entry only needs to be `MIN_ENTRY_STRIDE` wide, but a table padded to the full
    // stride is what packers produce, so require the declared size.
    let table_len = count
        .checked_mul(stride)
        .ok_or_else(|| table_truncated(usize::MAX))?;
    bytes::slice(buf, table_offset, table_len).ok_or_else(|| table_truncated(table_len))?;

    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let entry_offset = table_offset + i * stride;
        let entry = TrpFileEntry::from_bytes(buf, entry_offset)?;
        trace!(
            "File table entry {}: `{}` at {} ({} bytes)",
            i, entry.name, entry.offset, entry.size
        );
        entries.push(entry);
    }

    Ok(entries)
}

/// Slices every entry out of `buf`, checking each one against the buffer length.
pub fn build_file_map<'a>(
    buf: &'a [u8],
    entries: &[TrpFileEntry],
) -> Result<FileMap<'a>, ContainerFormatError> {
    let mut files = FileMap::new();

    for entry in entries {
        let data = bytes::slice(buf, entry.offset as usize, entry.size as usize).ok_or_else(|| {
            ContainerFormatError::EntryOutOfBounds {
                name: entry.name.clone(),
                offset: u64::from(entry.offset),
                size: u64::from(entry.size),
                len: buf.len(),
            }
        })?;
        files.insert(entry.name.as_str(), data);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trp_file_header::{TRP_FILE_HEADER_SIZE, TRP_MAGIC, TrpVersion};
    use pretty_assertions::assert_eq;

    fn header(count: u32, stride: u32) -> TrpFileHeader {
        TrpFileHeader {
            magic: TRP_MAGIC,
            version: TrpVersion::V1,
            file_table_size: 0,
            file_count: count,
            entry_stride: stride,
            checksum: None,
        }
    }

    fn entry_bytes(name: &[u8], offset: u64, size: u64) -> Vec<u8> {
        let mut raw = vec![0_u8; 64];
        raw[..name.len()].copy_from_slice(name);
        raw[32..40].copy_from_slice(&offset.to_be_bytes());
        raw[40..48].copy_from_slice(&size.to_be_bytes());
        raw
    }

    /// Header padding, then the given entries, then `payload`.
    fn table_with_payload(entries: &[Vec<u8>], payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![0_u8; TRP_FILE_HEADER_SIZE];
        for e in entries {
            buf.extend_from_slice(e);
        }
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn test_decodes_entry_names() {
        let mut raw = [0_u8; 32];
        raw[..10].copy_from_slice(b"TROP01.PNG");
        assert_eq!(decode_entry_name(&raw), "TROP01.PNG");

        let mut padded = [b' '; 32];
        padded[2..10].copy_from_slice(b"TROP.SFM");
        padded[10] = 0;
        padded[11] = b'X';
        assert_eq!(decode_entry_name(&padded), "TROP.SFM");

        // No terminator: the whole field is the name.
        let full = [b'A'; 32];
        assert_eq!(decode_entry_name(&full), "A".repeat(32));
    }

    #[test]
    fn test_reads_entries_and_slices_blobs() {
        let data_start = (TRP_FILE_HEADER_SIZE + 2 * 64) as u64;
        let buf = table_with_payload(
            &[
                entry_bytes(b"A.PNG", data_start, 3),
                entry_bytes(b"B.PNG", data_start + 3, 2),
            ],
            b"abcde",
        );

        let entries = read_file_table(&buf, &header(2, 64), TRP_FILE_HEADER_SIZE).unwrap();
        assert_eq!(
            entries,
            vec![
                TrpFileEntry {
                    name: "A.PNG".to_string(),
                    offset: data_start as u32,
                    size: 3,
                },
                TrpFileEntry {
                    name: "B.PNG".to_string(),
                    offset: data_start as u32 + 3,
                    size: 2,
                },
            ]
        );

        let files = build_file_map(&buf, &entries).unwrap();
        assert_eq!(files.get("A.PNG"), Some(&b"abc"[..]));
        assert_eq!(files.get("B.PNG"), Some(&b"de"[..]));
        assert_eq!(files.get("a.png"), None);
        assert_eq!(files.names().collect::<Vec<_>>(), vec!["A.PNG", "B.PNG"]);
    }

    #[test]
    fn test_duplicate_names_keep_last_blob() {
        let data_start = (TRP_FILE_HEADER_SIZE + 3 * 64) as u64;
        let buf = table_with_payload(
            &[
                entry_bytes(b"DUP", data_start, 1),
                entry_bytes(b"OTHER", data_start + 1, 1),
                entry_bytes(b"DUP", data_start + 2, 1),
            ],
            b"xyz",
        );

        let entries = read_file_table(&buf, &header(3, 64), TRP_FILE_HEADER_SIZE).unwrap();
        let files = build_file_map(&buf, &entries).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files.get("DUP"), Some(&b"z"[..]));
        assert_eq!(files.names().collect::<Vec<_>>(), vec!["DUP", "OTHER"]);
    }

    #[test]
    fn test_rejects_table_past_end_of_buffer() {
        let buf = table_with_payload(&[entry_bytes(b"A", 0, 0)], &[]);

        let err = read_file_table(&buf, &header(2, 64), TRP_FILE_HEADER_SIZE).unwrap_err();
        assert!(matches!(
            err,
            ContainerFormatError::TableTruncated {
                count: 2,
                need: 128,
                have: 64,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_table_needs_no_bytes() {
        // A bare 64 byte header, with a v2 table offset past its end.
        let buf = table_with_payload(&[], &[]);
        let entries = read_file_table(&buf, &header(0, 64), TRP_FILE_HEADER_SIZE + 20).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_rejects_small_stride() {
        let buf = table_with_payload(&[], &[]);
        let err = read_file_table(&buf, &header(0, 40), TRP_FILE_HEADER_SIZE).unwrap_err();
        assert!(matches!(
            err,
            ContainerFormatError::EntryStrideTooSmall { stride: 40, .. }
        ));
    }

    #[test]
    fn test_rejects_entry_out_of_bounds() {
        let buf = table_with_payload(&[entry_bytes(b"BIG.PNG", 100, 1000)], b"data");

        let entries = read_file_table(&buf, &header(1, 64), TRP_FILE_HEADER_SIZE).unwrap();
        let err = build_file_map(&buf, &entries).unwrap_err();

        match err {
            ContainerFormatError::EntryOutOfBounds {
                name, offset, size, ..
            } => {
                assert_eq!(name, "BIG.PNG");
                assert_eq!(offset, 100);
                assert_eq!(size, 1000);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_rejects_offset_with_high_bits() {
        let buf = table_with_payload(&[entry_bytes(b"A", 1 << 32, 0)], &[]);

        let err = read_file_table(&buf, &header(1, 64), TRP_FILE_HEADER_SIZE).unwrap_err();
        assert!(matches!(
            err,
            ContainerFormatError::ValueTooLarge {
                what: "entry offset",
                ..
            }
        ));
    }
}
