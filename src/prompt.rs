use std::fmt;
use std::io::{self, BufRead, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::ArchiveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedKind {
    Busy,
    Collision,
}

impl fmt::Display for BlockedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockedKind::Busy => write!(f, "in use by another program"),
            BlockedKind::Collision => write!(f, "target name already exists"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlockedRename {
    pub from: Utf8PathBuf,
    pub to: Utf8PathBuf,
    pub kind: BlockedKind,
    pub detail: String,
}

pub trait OperatorPrompt {
    /// Blocks until the operator has cleared whatever prevented the rename.
    /// Returning `Ok` means "try again"; there is no way to skip.
    fn acknowledge_blocked(&self, blocked: &BlockedRename) -> Result<(), ArchiveError>;

    fn confirm_restore(&self, log: &Utf8Path, backup: &Utf8Path) -> Result<bool, ArchiveError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompt;

impl ConsolePrompt {
    fn read_answer(message: &str) -> Result<String, ArchiveError> {
        let mut stderr = io::stderr();
        write!(stderr, "{message}").map_err(|err| ArchiveError::Prompt(err.to_string()))?;
        stderr
            .flush()
            .map_err(|err| ArchiveError::Prompt(err.to_string()))?;

        let mut input = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut input)
            .map_err(|err| ArchiveError::Prompt(err.to_string()))?;
        if read == 0 {
            return Err(ArchiveError::Prompt("stdin closed".to_string()));
        }
        Ok(input.trim().to_string())
    }
}

impl OperatorPrompt for ConsolePrompt {
    fn acknowledge_blocked(&self, blocked: &BlockedRename) -> Result<(), ArchiveError> {
        Self::read_answer(&format!(
            "Cannot rename {} -> {} ({}).\nClose all programs and windows accessing the download folder, then press Enter to retry: ",
            blocked.from, blocked.to, blocked.kind
        ))?;
        Ok(())
    }

    fn confirm_restore(&self, log: &Utf8Path, backup: &Utf8Path) -> Result<bool, ArchiveError> {
        let answer = Self::read_answer(&format!(
            "The previous run may not have ended cleanly; {log} cannot be trusted.\nRestore the last backup from {backup}? (YES/NO): "
        ))?;
        Ok(answer.eq_ignore_ascii_case("yes"))
    }
}
