use std::fs;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};

use archive_ledger::domain::ItemId;
use archive_ledger::error::ArchiveError;
use archive_ledger::ledger::{self, IdentifierLedger, LedgerPaths, LedgerState, RecordOutcome};
use assert_matches::assert_matches;
use archive_ledger::prompt::{BlockedRename, OperatorPrompt};

#[derive(Default)]
struct RestorePrompt {
    answer: bool,
    asked: Mutex<usize>,
}

impl RestorePrompt {
    fn answering(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(0),
        }
    }

    fn asked(&self) -> usize {
        *self.asked.lock().unwrap()
    }
}

impl OperatorPrompt for RestorePrompt {
    fn acknowledge_blocked(&self, _blocked: &BlockedRename) -> Result<(), ArchiveError> {
        panic!("not used")
    }

    fn confirm_restore(&self, _log: &Utf8Path, _backup: &Utf8Path) -> Result<bool, ArchiveError> {
        let mut guard = self.asked.lock().unwrap();
        *guard += 1;
        Ok(self.answer)
    }
}

struct Fixture {
    _temp: tempfile::TempDir,
    paths: LedgerPaths,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        Self {
            _temp: temp,
            paths: LedgerPaths::in_dir(&dir),
        }
    }

    fn write_log(&self, content: &str) {
        fs::write(self.paths.log.as_std_path(), content).unwrap();
    }

    fn write_backup(&self, content: &str) {
        fs::write(self.paths.backup.as_std_path(), content).unwrap();
    }

    fn log(&self) -> String {
        fs::read_to_string(self.paths.log.as_std_path()).unwrap()
    }

    fn backup(&self) -> String {
        fs::read_to_string(self.paths.backup.as_std_path()).unwrap()
    }
}

#[test]
fn disabled_ledger_never_touches_disk() {
    let fixture = Fixture::new();
    let prompt = RestorePrompt::default();
    let mut ledger = IdentifierLedger::open(fixture.paths.clone(), false, false, &prompt).unwrap();

    assert_eq!(ledger.state(), LedgerState::Disabled);
    assert!(!ledger.mark("a"));
    assert!(!ledger.contains("a"));
    assert!(!ledger.snapshot_backup().unwrap());
    ledger.finalize().unwrap();

    assert!(!fixture.paths.log.as_std_path().exists());
    assert!(!fixture.paths.backup.as_std_path().exists());
    assert_eq!(prompt.asked(), 0);
}

#[test]
fn clean_previous_run_trusts_log() {
    let fixture = Fixture::new();
    fixture.write_log("a\nb\n");
    let prompt = RestorePrompt::default();
    let ledger = IdentifierLedger::open(fixture.paths.clone(), true, true, &prompt).unwrap();

    assert_eq!(ledger.state(), LedgerState::Populated);
    assert_eq!(ledger.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(prompt.asked(), 0);
    // held open and truncated until finalize
    assert_eq!(fixture.log(), "");
}

#[test]
fn log_with_bom_is_read() {
    let fixture = Fixture::new();
    fixture.write_log("\u{feff}a\r\nb");
    let prompt = RestorePrompt::default();
    let ledger = IdentifierLedger::open(fixture.paths.clone(), true, true, &prompt).unwrap();
    assert!(ledger.contains("a"));
    assert!(ledger.contains("b"));
    assert_eq!(ledger.len(), 2);
}

#[test]
fn first_run_starts_empty_without_prompt() {
    let fixture = Fixture::new();
    let prompt = RestorePrompt::default();
    let ledger = IdentifierLedger::open(fixture.paths.clone(), true, false, &prompt).unwrap();

    assert!(ledger.is_empty());
    assert_eq!(ledger.state(), LedgerState::Populated);
    assert_eq!(prompt.asked(), 0);
    assert!(fixture.paths.log.as_std_path().exists());
}

#[test]
fn unclean_run_restores_backup_and_requires_restart() {
    let fixture = Fixture::new();
    fixture.write_log("");
    fixture.write_backup("a\n");
    let prompt = RestorePrompt::answering(true);
    let mut ledger = IdentifierLedger::open(fixture.paths.clone(), true, false, &prompt).unwrap();

    assert_eq!(prompt.asked(), 1);
    assert!(ledger.restart_required());
    assert!(ledger.is_empty());
    assert_eq!(fixture.log(), "a\n");

    assert!(!ledger.mark("b"));
    assert!(!ledger.snapshot_backup().unwrap());
    ledger.finalize().unwrap();
    assert_eq!(fixture.log(), "a\n");
    assert_eq!(ledger.state(), LedgerState::RestartRequired);
}

#[test]
fn unclean_run_declined_starts_empty() {
    let fixture = Fixture::new();
    fixture.write_log("a\nb\n");
    fixture.write_backup("a\n");
    let prompt = RestorePrompt::answering(false);
    let mut ledger = IdentifierLedger::open(fixture.paths.clone(), true, false, &prompt).unwrap();

    assert_eq!(prompt.asked(), 1);
    assert!(!ledger.restart_required());
    assert!(ledger.is_empty());
    assert_eq!(fixture.log(), "");

    assert!(ledger.mark("c"));
    ledger.finalize().unwrap();
    assert_eq!(fixture.log(), "c\n");
}

#[test]
fn unclean_run_without_backup_starts_empty() {
    let fixture = Fixture::new();
    fixture.write_log("a\n");
    let prompt = RestorePrompt::answering(true);
    let ledger = IdentifierLedger::open(fixture.paths.clone(), true, false, &prompt).unwrap();

    assert_eq!(prompt.asked(), 0);
    assert!(ledger.is_empty());
    assert_eq!(ledger.state(), LedgerState::Populated);
}

#[test]
fn snapshot_writes_whole_set_sorted() {
    let fixture = Fixture::new();
    let prompt = RestorePrompt::default();
    let mut ledger = IdentifierLedger::open(fixture.paths.clone(), true, true, &prompt).unwrap();

    assert!(!ledger.snapshot_backup().unwrap());
    assert!(!fixture.paths.backup.as_std_path().exists());

    assert!(ledger.mark("b"));
    assert!(ledger.mark("a"));
    assert!(!ledger.mark("a"));
    assert!(ledger.snapshot_backup().unwrap());
    assert_eq!(fixture.backup(), "a\nb\n");

    ledger.mark("c");
    ledger.snapshot_backup().unwrap();
    assert_eq!(fixture.backup(), "a\nb\nc\n");
    // the log is only written on finalize
    assert_eq!(fixture.log(), "");
}

#[test]
fn finalize_twice_is_a_noop() {
    let fixture = Fixture::new();
    fixture.write_log("a\n");
    let prompt = RestorePrompt::default();
    let mut ledger = IdentifierLedger::open(fixture.paths.clone(), true, true, &prompt).unwrap();
    ledger.mark("b");

    ledger.finalize().unwrap();
    assert_eq!(ledger.state(), LedgerState::Finalized);
    assert_eq!(fixture.log(), "a\nb\n");

    fs::write(fixture.paths.log.as_std_path(), "changed").unwrap();
    ledger.finalize().unwrap();
    assert_eq!(fixture.log(), "changed");
    assert!(!ledger.mark("c"));
    assert!(!ledger.snapshot_backup().unwrap());
}

#[test]
fn finalized_log_is_trusted_by_next_run() {
    let fixture = Fixture::new();
    let prompt = RestorePrompt::default();
    let mut first = IdentifierLedger::open(fixture.paths.clone(), true, true, &prompt).unwrap();
    first.mark("a");
    first.finalize().unwrap();

    let second = IdentifierLedger::open(fixture.paths.clone(), true, true, &prompt).unwrap();
    assert!(second.contains("a"));
    assert_eq!(prompt.asked(), 0);
}

fn raw(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn item(id: &str) -> ItemId {
    id.parse().unwrap()
}

#[test]
fn record_ids_reports_new_and_known_ids() {
    let fixture = Fixture::new();
    let prompt = RestorePrompt::default();
    ledger::record_ids(fixture.paths.clone(), true, true, &prompt, &raw(&["a", "b"])).unwrap();
    assert_eq!(fixture.log(), "a\nb\n");
    assert_eq!(fixture.backup(), "a\nb\n");

    let outcome =
        ledger::record_ids(fixture.paths.clone(), true, true, &prompt, &raw(&["a", "c"])).unwrap();
    assert_eq!(
        outcome,
        RecordOutcome::Recorded(vec![(item("a"), false), (item("c"), true)])
    );
    assert_eq!(fixture.log(), "a\nb\nc\n");
}

#[test]
fn invalid_id_leaves_previous_log_intact() {
    let fixture = Fixture::new();
    let prompt = RestorePrompt::default();
    ledger::record_ids(fixture.paths.clone(), true, true, &prompt, &raw(&["a", "b"])).unwrap();

    let err = ledger::record_ids(
        fixture.paths.clone(),
        true,
        true,
        &prompt,
        &raw(&["c", "bad/id"]),
    )
    .unwrap_err();
    assert_matches!(err, ArchiveError::InvalidItemId(_));
    assert_eq!(fixture.log(), "a\nb\n");

    let outcome =
        ledger::record_ids(fixture.paths.clone(), true, true, &prompt, &raw(&["a"])).unwrap();
    assert_eq!(outcome, RecordOutcome::Recorded(vec![(item("a"), false)]));
}

#[test]
fn failed_backup_still_finalizes_log() {
    let fixture = Fixture::new();
    fixture.write_log("a\n");
    // a directory in place of the backup file makes every snapshot fail
    fs::create_dir_all(fixture.paths.backup.as_std_path()).unwrap();
    let prompt = RestorePrompt::default();

    let err = ledger::record_ids(fixture.paths.clone(), true, true, &prompt, &raw(&["c"]))
        .unwrap_err();
    assert_matches!(err, ArchiveError::Filesystem(_));
    assert_eq!(fixture.log(), "a\nc\n");
}

#[test]
fn record_ids_stops_after_restore() {
    let fixture = Fixture::new();
    fixture.write_log("");
    fixture.write_backup("a\n");
    let prompt = RestorePrompt::answering(true);

    let outcome =
        ledger::record_ids(fixture.paths.clone(), true, false, &prompt, &raw(&["b"])).unwrap();
    assert_eq!(outcome, RecordOutcome::RestartRequired);
    assert_eq!(fixture.log(), "a\n");
}
