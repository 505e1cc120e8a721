use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{error, info, warn};

use crate::domain::ItemId;
use crate::error::ArchiveError;
use crate::fs_util::{read_text, write_atomic};
use crate::prompt::OperatorPrompt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPaths {
    pub log: Utf8PathBuf,
    pub backup: Utf8PathBuf,
}

impl LedgerPaths {
    pub fn in_dir(dir: &Utf8Path) -> Self {
        Self {
            log: dir.join("id_ledger.txt"),
            backup: dir.join("id_ledger_backup.txt"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    Disabled,
    Populated,
    RestartRequired,
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    RestartRequired,
    // (id, newly recorded)
    Recorded(Vec<(ItemId, bool)>),
}

#[derive(Debug)]
pub struct IdentifierLedger {
    paths: LedgerPaths,
    ids: BTreeSet<String>,
    log: Option<File>,
    state: LedgerState,
}

impl IdentifierLedger {
    pub fn open<P: OperatorPrompt>(
        paths: LedgerPaths,
        enabled: bool,
        previous_run_clean: bool,
        prompt: &P,
    ) -> Result<Self, ArchiveError> {
        if !enabled {
            return Ok(Self {
                paths,
                ids: BTreeSet::new(),
                log: None,
                state: LedgerState::Disabled,
            });
        }

        let mut ids = BTreeSet::new();
        if paths.log.as_std_path().is_file() {
            if previous_run_clean {
                ids = parse_ids(&read_text(&paths.log)?);
            } else if Self::recover(&paths, prompt)? {
                return Ok(Self {
                    paths,
                    ids: BTreeSet::new(),
                    log: None,
                    state: LedgerState::RestartRequired,
                });
            }
        }

        if let Some(parent) = paths.log.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| ArchiveError::Filesystem(err.to_string()))?;
        }
        let log = File::create(paths.log.as_std_path())
            .map_err(|err| ArchiveError::Filesystem(format!("open {}: {err}", paths.log)))?;
        info!(path = %paths.log, entries = ids.len(), "download ledger opened");

        Ok(Self {
            paths,
            ids,
            log: Some(log),
            state: LedgerState::Populated,
        })
    }

    fn recover<P: OperatorPrompt>(paths: &LedgerPaths, prompt: &P) -> Result<bool, ArchiveError> {
        error!(
            path = %paths.log,
            "previous run may not have ended cleanly, download ledger is not trusted"
        );
        if !paths.backup.as_std_path().is_file() {
            error!(
                path = %paths.backup,
                "no ledger backup found, download history cannot be recovered"
            );
            return Ok(false);
        }
        if !prompt.confirm_restore(&paths.log, &paths.backup)? {
            warn!("ledger not restored; items downloaded before this run will not be skipped, and the next backup overwrites the old one");
            return Ok(false);
        }

        let content = read_text(&paths.backup)?;
        write_atomic(&paths.log, content.as_bytes())?;
        info!(path = %paths.log, "ledger restored from backup, restart the program to continue");
        Ok(true)
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    pub fn state(&self) -> LedgerState {
        self.state
    }

    pub fn restart_required(&self) -> bool {
        self.state == LedgerState::RestartRequired
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn mark(&mut self, id: &str) -> bool {
        match self.state {
            LedgerState::Populated => self.ids.insert(id.to_string()),
            _ => false,
        }
    }

    pub fn snapshot_backup(&self) -> Result<bool, ArchiveError> {
        if self.log.is_none() || self.ids.is_empty() {
            return Ok(false);
        }
        write_atomic(&self.paths.backup, render_ids(&self.ids).as_bytes())?;
        Ok(true)
    }

    fn record_all(&mut self, ids: &[ItemId]) -> Result<Vec<(ItemId, bool)>, ArchiveError> {
        let mut recorded = Vec::with_capacity(ids.len());
        for id in ids {
            let known = self.contains(id.as_str());
            if !known {
                self.mark(id.as_str());
                self.snapshot_backup()?;
            }
            recorded.push((id.clone(), !known));
        }
        Ok(recorded)
    }

    /// Writes the full set to the log and closes it. Later calls do nothing.
    pub fn finalize(&mut self) -> Result<(), ArchiveError> {
        let Some(mut log) = self.log.take() else {
            return Ok(());
        };
        log.write_all(render_ids(&self.ids).as_bytes())
            .map_err(|err| ArchiveError::Filesystem(format!("write {}: {err}", self.paths.log)))?;
        log.sync_all()
            .map_err(|err| ArchiveError::Filesystem(err.to_string()))?;
        self.state = LedgerState::Finalized;
        info!(path = %self.paths.log, entries = self.ids.len(), "download ledger saved");
        Ok(())
    }
}

/// Validates every id before the log is opened (and truncated), and finalizes
/// on every path once it is open, so a failure never leaves an empty log behind.
pub fn record_ids<P: OperatorPrompt>(
    paths: LedgerPaths,
    enabled: bool,
    previous_run_clean: bool,
    prompt: &P,
    raw_ids: &[String],
) -> Result<RecordOutcome, ArchiveError> {
    let ids = raw_ids
        .iter()
        .map(|raw| raw.parse::<ItemId>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut ledger = IdentifierLedger::open(paths, enabled, previous_run_clean, prompt)?;
    if ledger.restart_required() {
        return Ok(RecordOutcome::RestartRequired);
    }
    let recorded = ledger.record_all(&ids);
    ledger.finalize()?;
    Ok(RecordOutcome::Recorded(recorded?))
}

fn parse_ids(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn render_ids(ids: &BTreeSet<String>) -> String {
    let mut out = String::new();
    for id in ids {
        out.push_str(id);
        out.push('\n');
    }
    out
}
