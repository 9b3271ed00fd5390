//! # isy CLI - codebase context for LLM chats
//!
//! ## Usage
//! ```bash
//! # Set up .isy/ and a starter .isycontext
//! isy init
//!
//! # Build the context document from the manifest patterns
//! isy context -v
//!
//! # Chat about the code, or ask for modifications on a snapshot branch
//! isy ask
//! isy code
//!
//! # Inspect snapshots
//! isy branches
//! isy status <branch-id>
//! ```

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use isy::branch::BranchSelector;
use isy::chat::{OpenAiClient, DEFAULT_MODEL};
use isy::config::Config;
use isy::context::ContextBuilder;
use isy::edit::{apply_step, AppliedChange};
use isy::init::run_wizard;
use isy::prompt::Prompter;
use isy::responses::{AskResponse, CodeModificationResponse, StructuredResponse};
use isy::{fingerprint, format_bytes, BranchSelection, ChatSession, IsyPaths, Result, UsageLedger};
use std::fs;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Number of recent branches offered by `isy code`
const RECENT_BRANCHES: usize = 3;

/// isy CLI - build LLM context from your codebase and work on snapshot branches
#[derive(Parser)]
#[command(name = "isy")]
#[command(version)]
#[command(about = "AI coding assistant: line-numbered codebase context and hashed snapshot branches")]
#[command(long_about = None)]
struct Cli {
    /// Project root (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Chat model
    #[arg(long, global = true, env = "ISY_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize isy in a directory
    Init {
        /// Wipe an existing .isy folder without asking
        #[arg(long)]
        force: bool,
    },

    /// Build the context document
    #[command(alias = "ctx")]
    Context {
        /// Print the document
        #[arg(short = 'v', long = "view")]
        view: bool,
    },

    /// Ask questions about the codebase
    Ask,

    /// Request code modifications on a snapshot branch
    Code {
        /// Branch to work on (prompted when omitted)
        branch: Option<String>,
    },

    /// List snapshot branches, newest first
    #[command(alias = "ls")]
    Branches,

    /// Compare the working tree with snapshot branches
    Status {
        /// Only check this branch
        branch: Option<String>,
    },

    /// Print the fingerprint of a directory
    Fingerprint {
        /// Directory (defaults to the project root)
        dir: Option<PathBuf>,
    },
}

type StdinPrompter = Prompter<io::StdinLock<'static>, Stdout>;

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let paths = IsyPaths::new(cli.path.unwrap_or_else(|| PathBuf::from(".")));
    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());

    match cli.command {
        Commands::Init { force } => cmd_init(&paths, &mut prompter, force),
        Commands::Context { view } => cmd_context(&paths, &cli.model, view),
        Commands::Ask => cmd_ask(&paths, &mut prompter, &cli.model),
        Commands::Code { branch } => cmd_code(&paths, &mut prompter, &cli.model, branch),
        Commands::Branches => cmd_branches(&paths),
        Commands::Status { branch } => cmd_status(&paths, branch),
        Commands::Fingerprint { dir } => {
            let dir = dir.unwrap_or_else(|| paths.root().to_path_buf());
            println!("{}", fingerprint(&dir)?);
            Ok(())
        }
    }
}

/// Initialize the project
///
/// Creates `.isy/config.json` from the answers and a starter `.isycontext`
/// when none exists.
fn cmd_init(paths: &IsyPaths, prompter: &mut StdinPrompter, force: bool) -> Result<()> {
    let Some((config, outcome)) = run_wizard(paths, prompter, force)? else {
        println!("{}", "Operation cancelled.".yellow());
        return Ok(());
    };

    println!("{} Initialized isy project", "✓".green().bold());
    println!("  Name: {}", config.project_name.cyan());
    println!("  Author: {}", config.author.cyan());
    println!("  Language/Framework: {}", config.language_and_framework.cyan());
    println!("  Description: {}", config.description.cyan());
    if outcome.manifest_created {
        println!(
            "\nAdd file patterns to {} to choose what goes into the context.",
            paths.manifest().display().to_string().yellow()
        );
    }
    Ok(())
}

/// Build the context document and save it to `.isy/last_context`
fn cmd_context(paths: &IsyPaths, model: &str, view: bool) -> Result<()> {
    let config = Config::load(&paths.config())?;

    let start = Instant::now();
    let pb = spinner("Building context...");
    let report = ContextBuilder::new(paths.root(), paths.manifest(), config.project_info()).build();
    pb.finish_and_clear();
    let report = report?;
    let tokens = report.token_count(model)?;

    fs::write(paths.last_context(), &report.document)?;

    if view {
        println!("{}", report.document);
    }

    println!("{} Context built", "✓".green().bold());
    println!("  Saved to: {}", paths.last_context().display().to_string().cyan());
    println!("  Files: {}", report.merged_count().to_string().cyan());
    println!("  Size: {}", format_bytes(report.size()).cyan());
    println!("  Tokens ({}): {}", model, tokens.to_string().cyan());
    println!("  Time: {}", format_duration(round_ms(start.elapsed())).to_string().cyan());

    if !report.rejected_patterns.is_empty() {
        println!("\n{}", "Ignored manifest lines (invalid glob):".yellow().bold());
        for pattern in &report.rejected_patterns {
            println!("  - {}", pattern.yellow());
        }
    }

    if !report.skipped.is_empty() {
        println!("\n{}", "Skipped (unreadable):".yellow().bold());
        for path in &report.skipped {
            println!("  - {}", path.display().to_string().yellow());
        }
    }
    Ok(())
}

/// Interactive question/answer session over the context
fn cmd_ask(paths: &IsyPaths, prompter: &mut StdinPrompter, model: &str) -> Result<()> {
    let config = Config::load(&paths.config())?;
    let mut session = open_session::<AskResponse>(paths, &config, model)?;

    println!("Interactive ask session started. Press Ctrl+D to exit.");
    while let Some(input) = prompter.line(&format!("\n{} ", "You:".green().bold()))? {
        if input.trim().is_empty() {
            continue;
        }
        if let Some(answer) = send(&mut session, &input)? {
            println!("{} {}", "isy:".blue().bold(), answer.contextual_response);
        }
    }

    print_usage(&session.session_usage(), &session.total_usage());
    Ok(())
}

/// Interactive code modification session on a snapshot branch
fn cmd_code(
    paths: &IsyPaths,
    prompter: &mut StdinPrompter,
    model: &str,
    branch: Option<String>,
) -> Result<()> {
    let config = Config::load(&paths.config())?;
    let selector = BranchSelector::for_project(paths);

    let branch = match branch {
        Some(id) => Some(id),
        None => pick_branch(&selector, prompter)?,
    };

    let pb = spinner("Preparing branch...");
    let selection = selector.select(branch.as_deref());
    pb.finish_and_clear();
    let selection = selection?;

    match &selection {
        BranchSelection::Created { id, stats, .. } => {
            println!("{} Created branch {}", "✓".green().bold(), id.yellow().bold());
            println!(
                "  Copied {} files, {} directories ({})",
                stats.files.to_string().cyan(),
                stats.directories.to_string().cyan(),
                format_bytes(stats.bytes).cyan()
            );
        }
        BranchSelection::Reused { id, .. } => {
            println!("{} Reusing branch {}", "✓".green().bold(), id.yellow().bold());
        }
    }
    println!("Working on branch: {}", selection.path().display().to_string().cyan());

    let mut session = open_session::<CodeModificationResponse>(paths, &config, model)?;

    println!("Interactive code modification session started. Press Ctrl+D to exit.");
    while let Some(input) = prompter.line(&format!("\n{} ", "You:".green().bold()))? {
        if input.trim().is_empty() {
            continue;
        }
        let Some(response) = send(&mut session, &input)? else {
            continue;
        };

        println!("{}", "Proposed changes:".blue().bold());
        print!("{}", response);
        if response.steps.is_empty() || !prompter.confirm("Apply these changes?")? {
            continue;
        }

        for step in &response.steps {
            match apply_step(paths.root(), step) {
                Ok(change) => println!("  {} {}", "✓".green(), describe(&change)),
                Err(e) if e.is_recoverable() => {
                    println!("  {} {}: {}", "✗".red(), step.file_path, e)
                }
                Err(e) => return Err(e),
            }
        }
    }

    print_usage(&session.session_usage(), &session.total_usage());
    Ok(())
}

/// List snapshot branches
fn cmd_branches(paths: &IsyPaths) -> Result<()> {
    let branches = BranchSelector::for_project(paths).list_branches()?;
    if branches.is_empty() {
        println!("{}", "No branches found.".yellow());
        return Ok(());
    }

    println!("{}", "Branches:".blue().bold());
    for branch in &branches {
        println!(
            "  {} {} {}",
            branch.id.yellow().bold(),
            branch.modified.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            format!("({} ago)", age(branch.modified)).dimmed()
        );
    }
    Ok(())
}

/// Show the tree fingerprint and whether branches still match it
fn cmd_status(paths: &IsyPaths, branch: Option<String>) -> Result<()> {
    let selector = BranchSelector::for_project(paths);

    let ids: Vec<String> = match branch {
        Some(id) => vec![id],
        None => selector
            .list_branches()?
            .into_iter()
            .map(|b| b.id)
            .collect(),
    };

    let pb = spinner("Hashing working tree...");
    let tree = fingerprint(paths.root());
    pb.finish_and_clear();
    println!("Working tree: {}", tree?.cyan());

    if ids.is_empty() {
        println!("{}", "No branches found.".yellow());
    }
    for id in ids {
        let status = selector.check_drift(&id)?;
        if status.is_clean() {
            println!("  {} {} {}", "✓".green().bold(), id.yellow(), "clean".green());
        } else {
            println!(
                "  {} {} {} ({})",
                "✗".red().bold(),
                id.yellow(),
                "drifted".red(),
                status.branch_fingerprint.dimmed()
            );
        }
    }
    Ok(())
}

/// Offer the most recent branches; `None` means create a new one
fn pick_branch(selector: &BranchSelector, prompter: &mut StdinPrompter) -> Result<Option<String>> {
    let branches = selector.list_branches()?;
    if branches.is_empty() {
        println!("No previous branch found, creating a new virtual branch.");
        return Ok(None);
    }

    let recent = &branches[..branches.len().min(RECENT_BRANCHES)];
    println!("Select a branch to connect:");
    for (i, branch) in recent.iter().enumerate() {
        println!(
            "  {}: {} {}",
            i + 1,
            branch.id.yellow(),
            format!("({} ago)", age(branch.modified)).dimmed()
        );
    }

    let choice = prompter
        .line("Enter the number of the branch to use or press Enter to create a new branch: ")?
        .unwrap_or_default();
    Ok(choice
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=recent.len()).contains(n))
        .map(|n| recent[n - 1].id.clone()))
}

/// Build the context and open a chat session over it
fn open_session<R: StructuredResponse>(
    paths: &IsyPaths,
    config: &Config,
    model: &str,
) -> Result<ChatSession<OpenAiClient, R>> {
    let api_key = config.resolve_api_key()?;
    let report =
        ContextBuilder::new(paths.root(), paths.manifest(), config.project_info()).build()?;
    println!(
        "Context: {} files, {}",
        report.merged_count().to_string().cyan(),
        format_bytes(report.size()).cyan()
    );

    let ledger = UsageLedger::load(&paths.usage())?;
    Ok(
        ChatSession::new(OpenAiClient::new(api_key)?, model, report.document)
            .with_response_language(&config.response_language)
            .with_ledger(ledger, paths.usage()),
    )
}

/// Send one turn; recoverable failures are printed and yield `None`
fn send<R: StructuredResponse>(
    session: &mut ChatSession<OpenAiClient, R>,
    input: &str,
) -> Result<Option<R>> {
    let pb = spinner("Thinking...");
    let result = session.send(input);
    pb.finish_and_clear();

    match result {
        Ok(response) => Ok(Some(response)),
        Err(e) if e.is_recoverable() => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn print_usage(session: &UsageLedger, total: &UsageLedger) {
    println!("\nExiting chat session.");
    println!(
        "  Session: {} in / {} out tokens, ${:.4}",
        session.token_input.to_string().cyan(),
        session.token_output.to_string().cyan(),
        session.total_cost
    );
    println!(
        "  Total:   {} in / {} out tokens, ${:.4}",
        total.token_input.to_string().dimmed(),
        total.token_output.to_string().dimmed(),
        total.total_cost
    );
}

fn describe(change: &AppliedChange) -> String {
    match change {
        AppliedChange::Created(path) => format!("created {}", path.display()),
        AppliedChange::Deleted(path) => format!("deleted {}", path.display()),
        AppliedChange::Edited { path, edits } => {
            format!("edited {} ({} ranges)", path.display(), edits)
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn age(modified: chrono::DateTime<Utc>) -> String {
    let elapsed = (Utc::now() - modified).to_std().unwrap_or_default();
    format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}

fn round_ms(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}

