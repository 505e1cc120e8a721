use std::collections::BTreeMap;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use archive_ledger::cache::{self, CacheStore};
use archive_ledger::config::{ConfigLoader, Settings};
use archive_ledger::domain::{CacheRecord, FolderKey, ItemId, Layout};
use archive_ledger::error::ArchiveError;
use archive_ledger::ledger::{self, RecordOutcome};
use archive_ledger::prompt::ConsolePrompt;
use archive_ledger::rename::RenameEngine;
use archive_ledger::workspace::Workspace;

#[derive(Parser)]
#[command(name = "archive-ledger")]
#[command(about = "Keep download folders in sync with account labels and track downloaded items")]
#[command(version)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    root: Option<Utf8PathBuf>,

    #[arg(long, global = true)]
    state_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Store new labels for an account and rename its folders")]
    Upsert(UpsertArgs),
    #[command(about = "Print cached labels")]
    Show(ShowArgs),
    #[command(about = "Download ledger maintenance")]
    Ledger(LedgerArgs),
}

#[derive(Args)]
struct UpsertArgs {
    id: String,

    #[arg(long, default_value = "")]
    mark: String,

    #[arg(long, default_value = "")]
    name: String,

    #[arg(long, default_value = "")]
    qualifier: String,

    #[arg(long)]
    prefix: Option<String>,

    #[arg(long)]
    layout: Option<Layout>,
}

#[derive(Args)]
struct ShowArgs {
    id: Option<String>,
}

#[derive(Args)]
struct LedgerArgs {
    #[command(subcommand)]
    command: LedgerCommand,
}

#[derive(Subcommand)]
enum LedgerCommand {
    #[command(about = "Record identifiers as downloaded")]
    Record(RecordArgs),
}

#[derive(Args)]
struct RecordArgs {
    ids: Vec<String>,

    /// The previous run did not reach its shutdown step.
    #[arg(long)]
    unclean: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ArchiveError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ArchiveError) -> u8 {
    match error {
        ArchiveError::InvalidItemId(_) | ArchiveError::InvalidLabel(_) => 2,
        ArchiveError::ConfigRead(_) | ArchiveError::ConfigParse(_) => 2,
        ArchiveError::Prompt(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = ConfigLoader::resolve(cli.config.as_deref())?;
    let workspace = Workspace::new()?
        .with_overrides(settings.root.clone(), settings.state_dir.clone())
        .with_overrides(cli.root, cli.state_dir);
    workspace.ensure_dirs()?;

    match cli.command {
        Commands::Upsert(args) => run_upsert(args, &workspace, &settings),
        Commands::Show(args) => run_show(args, &workspace),
        Commands::Ledger(args) => match args.command {
            LedgerCommand::Record(args) => run_record(args, &workspace, &settings),
        },
    }
}

fn run_upsert(args: UpsertArgs, workspace: &Workspace, settings: &Settings) -> miette::Result<()> {
    let id: ItemId = args.id.parse()?;
    let prefix = args.prefix.unwrap_or_else(|| settings.prefix.clone());
    let layout = args.layout.unwrap_or(settings.layout);
    let key = FolderKey::new(prefix, id, args.qualifier);

    let renamer = RenameEngine::new(workspace.root().to_path_buf(), ConsolePrompt);
    let mut store = CacheStore::open(workspace.cache_file(), renamer, settings.propagation);
    let outcome = store.upsert(&key, &args.mark, &args.name, layout)?;

    println!(
        "{}: folder renamed: {}, entries renamed: {}",
        key.id,
        if outcome.folder_renamed { "yes" } else { "no" },
        outcome.entries_renamed
    );
    Ok(())
}

fn run_show(args: ShowArgs, workspace: &Workspace) -> miette::Result<()> {
    let records = cache::load(&workspace.cache_file());
    let selected: BTreeMap<&String, &CacheRecord> = records
        .iter()
        .filter(|(id, _)| args.id.as_ref().is_none_or(|wanted| wanted == *id))
        .collect();
    let json = serde_json::to_string_pretty(&selected).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn run_record(args: RecordArgs, workspace: &Workspace, settings: &Settings) -> miette::Result<()> {
    let outcome = ledger::record_ids(
        workspace.ledger_paths(),
        settings.record_ids,
        !args.unclean,
        &ConsolePrompt,
        &args.ids,
    )?;
    match outcome {
        RecordOutcome::RestartRequired => {
            println!("ledger restored from backup; run the command again");
        }
        RecordOutcome::Recorded(recorded) => {
            for (id, added) in recorded {
                if added {
                    println!("{id}: recorded");
                } else {
                    println!("{id}: already recorded");
                }
            }
        }
    }
    Ok(())
}
