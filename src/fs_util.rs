use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::ArchiveError;

const BOM: char = '\u{feff}';

pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ArchiveError> {
    let parent = path
        .parent()
        .ok_or_else(|| ArchiveError::Filesystem(format!("invalid destination path {path}")))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ArchiveError::Filesystem(err.to_string()))?;
    let mut temp = Builder::new()
        .prefix(".archive-ledger")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ArchiveError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| ArchiveError::Filesystem(err.to_string()))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| ArchiveError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| ArchiveError::Filesystem(err.to_string()))?;
    Ok(())
}

pub fn read_text(path: &Utf8Path) -> Result<String, ArchiveError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| ArchiveError::Filesystem(format!("read {path}: {err}")))?;
    Ok(match content.strip_prefix(BOM) {
        Some(rest) => rest.to_string(),
        None => content,
    })
}

pub fn sorted_entries(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ArchiveError> {
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| ArchiveError::Filesystem(format!("list {dir}: {err}")))?;
    let mut items = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| ArchiveError::Filesystem(err.to_string()))?;
        let path = Utf8PathBuf::from_path_buf(entry.path()).map_err(|path| {
            ArchiveError::Filesystem(format!("non UTF-8 path {}", path.display()))
        })?;
        items.push(path);
    }
    items.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(items)
}
