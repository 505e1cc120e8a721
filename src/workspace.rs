use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::error::ArchiveError;
use crate::ledger::LedgerPaths;

#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
    state_dir: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Result<Self, ArchiveError> {
        let cwd =
            std::env::current_dir().map_err(|err| ArchiveError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd.join("Download"))
            .map_err(|_| ArchiveError::Filesystem("invalid download path".to_string()))?;

        let state_dir = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("archive-ledger"))
                    .ok()
            })
            .ok_or_else(|| {
                ArchiveError::Filesystem("unable to resolve state directory".to_string())
            })?;

        Ok(Self { root, state_dir })
    }

    pub fn new_with_paths(root: Utf8PathBuf, state_dir: Utf8PathBuf) -> Self {
        Self { root, state_dir }
    }

    pub fn with_overrides(
        self,
        root: Option<Utf8PathBuf>,
        state_dir: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            root: root.unwrap_or(self.root),
            state_dir: state_dir.unwrap_or(self.state_dir),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn state_dir(&self) -> &Utf8Path {
        &self.state_dir
    }

    pub fn cache_file(&self) -> Utf8PathBuf {
        self.state_dir.join("cache").join("label_cache.json")
    }

    pub fn ledger_paths(&self) -> LedgerPaths {
        LedgerPaths::in_dir(&self.state_dir)
    }

    pub fn ensure_dirs(&self) -> Result<(), ArchiveError> {
        for dir in [&self.root, &self.state_dir] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| ArchiveError::Filesystem(format!("create {dir}: {err}")))?;
        }
        Ok(())
    }
}
