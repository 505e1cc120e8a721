use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, error, info, warn};

use crate::domain::{FolderKey, LabelField, Layout, replace_first};
use crate::error::ArchiveError;
use crate::fs_util::sorted_entries;
use crate::prompt::{BlockedKind, BlockedRename, OperatorPrompt};

pub struct RenameEngine<P: OperatorPrompt> {
    root: Utf8PathBuf,
    prompt: P,
}

enum RenameFailure {
    Blocked(BlockedKind, String),
    Failed(io::Error),
}

impl<P: OperatorPrompt> RenameEngine<P> {
    pub fn new(root: Utf8PathBuf, prompt: P) -> Self {
        Self { root, prompt }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn folder_path(&self, key: &FolderKey, label: &str) -> Utf8PathBuf {
        self.root.join(key.folder_name(label))
    }

    pub fn rename_folder(
        &self,
        key: &FolderKey,
        old_label: &str,
        new_label: &str,
    ) -> Result<bool, ArchiveError> {
        let old_folder = self.folder_path(key, old_label);
        if !old_folder.as_std_path().is_dir() {
            info!(id = %key.id, path = %old_folder, "folder does not exist, skipping rename");
            return Ok(false);
        }
        let new_folder = self.folder_path(key, new_label);
        self.rename_path(&old_folder, &new_folder)?;
        info!(id = %key.id, from = %old_folder, to = %new_folder, "folder renamed");
        Ok(true)
    }

    /// Within one directory, entries are visited in name order and the first
    /// entry that does not contain `old_value` ends that directory's batch.
    pub fn rename_contents(
        &self,
        key: &FolderKey,
        current_label: &str,
        field: LabelField,
        old_value: &str,
        new_value: &str,
        layout: Layout,
    ) -> Result<usize, ArchiveError> {
        if old_value == new_value {
            return Ok(0);
        }
        if old_value.is_empty() {
            warn!(id = %key.id, %field, "no previous {field} to replace in file names, skipping");
            return Ok(0);
        }
        let folder = self.folder_path(key, current_label);
        if !folder.as_std_path().is_dir() {
            info!(id = %key.id, path = %folder, "folder does not exist, skipping content rename");
            return Ok(0);
        }

        let mut renamed = 0;
        match layout {
            Layout::Nested => {
                for entry in sorted_entries(&folder)? {
                    if !entry.as_std_path().is_dir() {
                        continue;
                    }
                    let work_dir = match renamed_path(&entry, old_value, new_value) {
                        Some(target) => {
                            self.rename_path(&entry, &target)?;
                            info!(id = %key.id, from = %entry, to = %target, "folder renamed");
                            renamed += 1;
                            target
                        }
                        None => entry,
                    };
                    renamed += self.rename_batch(key, &work_dir, old_value, new_value)?;
                }
            }
            Layout::Flat => {
                renamed += self.rename_batch(key, &folder, old_value, new_value)?;
            }
        }
        Ok(renamed)
    }

    fn rename_batch(
        &self,
        key: &FolderKey,
        dir: &Utf8Path,
        old_value: &str,
        new_value: &str,
    ) -> Result<usize, ArchiveError> {
        let mut renamed = 0;
        for entry in sorted_entries(dir)? {
            let Some(target) = renamed_path(&entry, old_value, new_value) else {
                debug!(id = %key.id, path = %entry, "name does not contain old label, stopping batch");
                break;
            };
            self.rename_path(&entry, &target)?;
            info!(id = %key.id, from = %entry, to = %target, "file renamed");
            renamed += 1;
        }
        Ok(renamed)
    }

    /// Renames `from` to `to`, blocking on the operator for as long as the
    /// target stays busy or taken. Only unrelated io failures are returned.
    pub fn rename_path(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), ArchiveError> {
        loop {
            let (kind, detail) = match attempt_rename(from, to) {
                Ok(()) => return Ok(()),
                Err(RenameFailure::Blocked(kind, detail)) => (kind, detail),
                Err(RenameFailure::Failed(err)) => {
                    return Err(ArchiveError::Filesystem(format!(
                        "rename {from} -> {to}: {err}"
                    )));
                }
            };
            error!(from = %from, to = %to, %kind, "rename failed: {detail}");
            let blocked = BlockedRename {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                kind,
                detail,
            };
            self.prompt.acknowledge_blocked(&blocked)?;
        }
    }
}

fn renamed_path(path: &Utf8Path, old_value: &str, new_value: &str) -> Option<Utf8PathBuf> {
    let name = path.file_name()?;
    let new_name = replace_first(name, old_value, new_value)?;
    Some(path.with_file_name(new_name))
}

fn attempt_rename(from: &Utf8Path, to: &Utf8Path) -> Result<(), RenameFailure> {
    // fs::rename silently replaces existing files on unix
    if from != to && fs::symlink_metadata(to.as_std_path()).is_ok() {
        return Err(RenameFailure::Blocked(
            BlockedKind::Collision,
            format!("{to} already exists"),
        ));
    }
    fs::rename(from.as_std_path(), to.as_std_path()).map_err(|err| match blocked_kind(&err) {
        Some(kind) => RenameFailure::Blocked(kind, err.to_string()),
        None => RenameFailure::Failed(err),
    })
}

fn blocked_kind(err: &io::Error) -> Option<BlockedKind> {
    match err.kind() {
        io::ErrorKind::PermissionDenied
        | io::ErrorKind::ResourceBusy
        | io::ErrorKind::ExecutableFileBusy => Some(BlockedKind::Busy),
        io::ErrorKind::AlreadyExists | io::ErrorKind::DirectoryNotEmpty => {
            Some(BlockedKind::Collision)
        }
        _ => None,
    }
}
