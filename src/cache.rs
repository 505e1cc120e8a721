use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{info, warn};

use crate::domain::{CacheRecord, FolderKey, LabelField, Layout, validate_label};
use crate::error::ArchiveError;
use crate::fs_util::{read_text, write_atomic};
use crate::prompt::OperatorPrompt;
use crate::rename::RenameEngine;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Propagation {
    pub mark: bool,
    pub name: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub folder_renamed: bool,
    pub entries_renamed: usize,
}

impl Reconciliation {
    pub fn touched_disk(&self) -> bool {
        self.folder_renamed || self.entries_renamed > 0
    }
}

pub fn read_records(path: &Utf8Path) -> Result<BTreeMap<String, CacheRecord>, ArchiveError> {
    let content = read_text(path)?;
    serde_json::from_str(&content).map_err(|err| ArchiveError::CacheDecode(err.to_string()))
}

pub fn load(path: &Utf8Path) -> BTreeMap<String, CacheRecord> {
    if !path.as_std_path().is_file() {
        info!(path = %path, "label cache does not exist yet");
        return BTreeMap::new();
    }
    match read_records(path) {
        Ok(records) => {
            info!(path = %path, entries = records.len(), "label cache loaded");
            records
        }
        Err(err) => {
            warn!(path = %path, "label cache is corrupted, starting empty: {err}");
            BTreeMap::new()
        }
    }
}

pub struct CacheStore<P: OperatorPrompt> {
    path: Utf8PathBuf,
    records: BTreeMap<String, CacheRecord>,
    renamer: RenameEngine<P>,
    propagation: Propagation,
}

impl<P: OperatorPrompt> CacheStore<P> {
    pub fn open(path: Utf8PathBuf, renamer: RenameEngine<P>, propagation: Propagation) -> Self {
        let records = load(&path);
        Self {
            path,
            records,
            renamer,
            propagation,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn record(&self, id: &str) -> Option<&CacheRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> &BTreeMap<String, CacheRecord> {
        &self.records
    }

    pub fn renamer(&self) -> &RenameEngine<P> {
        &self.renamer
    }

    pub fn upsert(
        &mut self,
        key: &FolderKey,
        mark: &str,
        name: &str,
        layout: Layout,
    ) -> Result<Reconciliation, ArchiveError> {
        validate_label(mark)?;
        validate_label(name)?;
        let next = CacheRecord::new(mark, name);

        let mut outcome = Reconciliation::default();
        if let Some(previous) = self.records.get(key.id.as_str()) {
            outcome = self.reconcile(key, previous, &next, layout)?;
        }

        self.records.insert(key.id.to_string(), next);
        info!(id = %key.id, mark, name, "label cache updated");
        self.save()?;
        Ok(outcome)
    }

    fn reconcile(
        &self,
        key: &FolderKey,
        previous: &CacheRecord,
        next: &CacheRecord,
        layout: Layout,
    ) -> Result<Reconciliation, ArchiveError> {
        let mut outcome = Reconciliation::default();
        if previous.folder_label() != next.folder_label() {
            outcome.folder_renamed =
                self.renamer
                    .rename_folder(key, previous.folder_label(), next.folder_label())?;
        }
        let current_label = next.folder_label();
        if previous.mark != next.mark && self.propagation.mark {
            outcome.entries_renamed += self.renamer.rename_contents(
                key,
                current_label,
                LabelField::Mark,
                &previous.mark,
                &next.mark,
                layout,
            )?;
        }
        if previous.name != next.name && self.propagation.name {
            outcome.entries_renamed += self.renamer.rename_contents(
                key,
                current_label,
                LabelField::Name,
                &previous.name,
                &next.name,
                layout,
            )?;
        }
        Ok(outcome)
    }

    fn save(&self) -> Result<(), ArchiveError> {
        let mut content = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut content, PrettyFormatter::with_indent(b"    "));
        self.records
            .serialize(&mut serializer)
            .map_err(|err| ArchiveError::CacheEncode(err.to_string()))?;
        write_atomic(&self.path, &content)?;
        info!(path = %self.path, "label cache saved");
        Ok(())
    }
}
