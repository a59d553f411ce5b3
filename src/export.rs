//! Writes file map entries to a directory, each under its original name.

use crate::err::ExportError;
use crate::trp_file_table::FileMap;

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Which entries [`export_files`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFilter<'f> {
    #[default]
    All,
    /// Entries whose name contains the given substring (case-sensitive).
    NameContains(&'f str),
}

impl ExportFilter<'static> {
    /// Every PNG in the package (trophy icons and `ICON0.PNG`).
    pub const IMAGES: Self = ExportFilter::NameContains(".PNG");
}

impl ExportFilter<'_> {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            ExportFilter::All => true,
            ExportFilter::NameContains(needle) => name.contains(needle),
        }
    }
}

/// A name is only written if it stays inside the destination directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains(':')
}

/// Writes every entry of `files` selected by `filter` into `dest`, byte for byte.
///
/// Returns the written paths in file table order.
pub fn export_files(
    files: &FileMap,
    dest: impl AsRef<Path>,
    filter: ExportFilter,
) -> Result<Vec<PathBuf>, ExportError> {
    let dest = dest.as_ref();
    fs::create_dir_all(dest).map_err(|source| ExportError::CreateDir {
        path: dest.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();
    for (name, data) in files.iter().filter(|(name, _)| filter.matches(name)) {
        if !is_plain_file_name(name) {
            warn!("Refusing to export entry with unsafe name `{}`", name);
            continue;
        }

        let path = dest.join(name);
        fs::write(&path, data).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
        debug!("Wrote {} ({} bytes)", path.display(), data.len());
        written.push(path);
    }

    Ok(written)
}
