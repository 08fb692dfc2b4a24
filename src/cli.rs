//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. One-shot commands
//! submit a single search, wait for it, and turn a shown error into a
//! non-zero exit. The interactive session parses stdin lines into
//! orchestrator [`Command`]s and lets results print as they settle.

use anyhow::{anyhow, bail, Context, Result};
use primesum::config::{self, ClientConfig, ConfigOverrides};
use primesum::render::{self, TerminalProjection};
use primesum::transport::HttpBackend;
use primesum::{
    Command, Orchestrator, PhoneForm, SequenceForm, Submission, SurfaceKind, SurfaceStatus, Tab,
};
use std::io::Stdout;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use super::Cli;

type Terminal = TerminalProjection<Stdout>;
type TerminalOrchestrator = Orchestrator<HttpBackend, Terminal>;

const HELP: &str = "\
Commands:
  seq START END [min_sequences=N] [max_sequences=N] [min_length=N] [max_length=N]
  phone XX          search prime phone numbers under prefix 09XX
  prefixes          list known prefixes
  pick N            search the N-th listed prefix
  tab sequences|phones
  cancel [sequences|phones|prefixes]
  status
  help
  quit";

// ── Configuration ───────────────────────────────────────────────

pub fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let file = match &cli.config {
        Some(path) => Some(config::load_file(path)?),
        None => None,
    };
    let overrides = ConfigOverrides {
        environment: cli.environment,
        base_url: cli.base_url.clone(),
        deadline_ms: cli.deadline_ms,
    };
    let config = ClientConfig::resolve(&overrides, file.as_ref())?;
    info!(
        environment = %config.environment,
        base_url = %config.base_url,
        deadline_ms = config.deadline.as_millis() as u64,
        "client configured"
    );
    Ok(config)
}

fn connect(config: &ClientConfig) -> Result<(Arc<Terminal>, TerminalOrchestrator)> {
    let projection = Arc::new(TerminalProjection::stdout());
    let orchestrator = Orchestrator::from_config(config, Arc::clone(&projection))
        .context("failed to build HTTP client")?;
    Ok((projection, orchestrator))
}

// ── One-shot commands ───────────────────────────────────────────

async fn wait_one_shot(submission: Submission, projection: &Terminal) -> Result<()> {
    if let Submission::Rejected(e) = &submission {
        bail!("invalid input: {}", e);
    }
    submission.join().await.context("search task failed")?;
    if projection.error_count() > 0 {
        bail!("search failed");
    }
    Ok(())
}

pub fn run_sequences(config: &ClientConfig, form: SequenceForm, csv: Option<&Path>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (projection, orchestrator) = connect(config)?;
        let submission = orchestrator.submit_sequence_search(&form);
        wait_one_shot(submission, &projection).await?;

        if let Some(path) = csv {
            let results = orchestrator
                .surface(SurfaceKind::Sequences)
                .last_results()
                .ok_or_else(|| anyhow!("no results to export"))?;
            let rows = render::export_csv_file(&results, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported {} rows to {}", rows, path.display());
        }
        Ok(())
    })
}

pub fn run_phones(config: &ClientConfig, prefix: String) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (projection, orchestrator) = connect(config)?;
        let submission = orchestrator.submit_phone_search(&PhoneForm::new(prefix));
        wait_one_shot(submission, &projection).await
    })
}

pub fn run_prefixes(config: &ClientConfig) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (projection, orchestrator) = connect(config)?;
        let submission = orchestrator.refresh_prefixes();
        wait_one_shot(submission, &projection).await
    })
}

// ── Interactive session ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Run(Command),
    Pick(usize),
    CancelActive,
    Status,
    Help,
    Quit,
    Nothing,
}

/// Run until `quit` or end of input. On end of input, searches already
/// submitted are allowed to settle so piped sessions print their results.
pub fn run_interactive(config: &ClientConfig) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let (_projection, orchestrator) = connect(config)?;
        println!("{}", HELP);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut pending: Vec<Submission> = Vec::new();
        while let Some(line) = lines.next_line().await? {
            match parse_line(&line) {
                Ok(Action::Run(command)) => pending.extend(orchestrator.handle(command)),
                Ok(Action::Pick(n)) => match orchestrator.prefix_options().get(n - 1) {
                    Some(option) => pending.push(orchestrator.select_prefix(option)),
                    None => println!("No prefix #{} (run `prefixes` first)", n),
                },
                Ok(Action::CancelActive) => {
                    let surface = match orchestrator.active_tab() {
                        Tab::Sequences => SurfaceKind::Sequences,
                        Tab::Phones => SurfaceKind::Phones,
                    };
                    if !orchestrator.cancel(surface) {
                        println!("Nothing to cancel on {}", surface);
                    }
                }
                Ok(Action::Status) => print_status(&orchestrator),
                Ok(Action::Help) => println!("{}", HELP),
                Ok(Action::Quit) => {
                    orchestrator.shutdown();
                    return Ok(());
                }
                Ok(Action::Nothing) => {}
                Err(message) => println!("{}", message),
            }
            pending.retain(|s| !s.is_finished());
        }

        for submission in pending {
            submission.settled().await;
        }
        Ok(())
    })
}

fn print_status(orchestrator: &TerminalOrchestrator) {
    println!("active tab: {}", orchestrator.active_tab());
    for kind in [
        SurfaceKind::Sequences,
        SurfaceKind::Phones,
        SurfaceKind::Prefixes,
    ] {
        let state = match orchestrator.surface(kind).status() {
            SurfaceStatus::Idle => "idle".to_string(),
            SurfaceStatus::InFlight { id } => format!("searching ({})", id),
            SurfaceStatus::Settled { at, .. } => {
                format!("settled at {}", at.format("%H:%M:%S"))
            }
        };
        println!("{:<10} {}", kind, state);
    }
}

fn parse_line(line: &str) -> Result<Action, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Action::Nothing);
    };
    let args: Vec<&str> = words.collect();

    match verb {
        "seq" | "sequences" => {
            parse_sequence_args(&args).map(|form| Action::Run(Command::SubmitSequences(form)))
        }
        "phone" | "phones" => match args.as_slice() {
            [prefix] => Ok(Action::Run(Command::SubmitPhones(PhoneForm::new(*prefix)))),
            _ => Err("usage: phone XX".to_string()),
        },
        "prefixes" => Ok(Action::Run(Command::RefreshPrefixes)),
        "pick" => match args.as_slice() {
            [n] => n
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(Action::Pick)
                .ok_or_else(|| format!("usage: pick N (got {:?})", n)),
            _ => Err("usage: pick N".to_string()),
        },
        "tab" => match args.as_slice() {
            ["sequences"] => Ok(Action::Run(Command::SelectTab(Tab::Sequences))),
            ["phones"] => Ok(Action::Run(Command::SelectTab(Tab::Phones))),
            _ => Err("usage: tab sequences|phones".to_string()),
        },
        "cancel" => match args.as_slice() {
            [] => Ok(Action::CancelActive),
            ["sequences"] => Ok(Action::Run(Command::Cancel(SurfaceKind::Sequences))),
            ["phones"] => Ok(Action::Run(Command::Cancel(SurfaceKind::Phones))),
            ["prefixes"] => Ok(Action::Run(Command::Cancel(SurfaceKind::Prefixes))),
            _ => Err("usage: cancel [sequences|phones|prefixes]".to_string()),
        },
        "status" => Ok(Action::Status),
        "help" | "?" => Ok(Action::Help),
        "quit" | "exit" => Ok(Action::Quit),
        other => Err(format!("unknown command `{}` (type `help`)", other)),
    }
}

/// `START END` positionally, then `key=value` options. Values stay raw;
/// the orchestrator validates them.
fn parse_sequence_args(args: &[&str]) -> Result<SequenceForm, String> {
    let mut form = SequenceForm {
        min_sequences: "1".to_string(),
        min_length: "2".to_string(),
        ..Default::default()
    };
    let mut positional = 0;
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) => {
                let field = match key {
                    "min_sequences" => &mut form.min_sequences,
                    "max_sequences" => &mut form.max_sequences,
                    "min_length" => &mut form.min_length,
                    "max_length" => &mut form.max_length,
                    _ => return Err(format!("unknown option `{}`", key)),
                };
                *field = value.to_string();
            }
            None => {
                match positional {
                    0 => form.start = arg.to_string(),
                    1 => form.end = arg.to_string(),
                    _ => return Err(format!("unexpected argument `{}`", arg)),
                }
                positional += 1;
            }
        }
    }
    Ok(form)
}
