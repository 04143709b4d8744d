use crate::backend::Backend;
use crate::config::Config;
use crate::context::{FocusArea, Intent, ReviewContext};
use crate::headless::run_simple;
use crate::instruction_presets::{get_instruction_preset_library, list_presets_formatted};
use crate::providers::Provider;
use crate::snapshot::SnapshotStore;
use crate::store::SessionId;
use crate::studio::{self, RunOptions};
use crate::{log_debug, ui};

use anyhow::{Context, Result, bail};
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand, crate_version};
use colored::Colorize;
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

const LOG_FILE: &str = "revu-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "Revu: interactive AI code review in the terminal",
    long_about = "Revu streams an AI review of a diff into a terminal session where you can ask follow-up questions, prune large files out of the prompt, search and copy the results.",
    disable_version_flag = true,
    after_help = get_dynamic_help(),
    styles = get_styles(),
)]
pub struct Cli {
    /// Subcommands available for the CLI
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log debug messages to a file
    #[arg(
        short = 'l',
        long = "log",
        global = true,
        help = "Log debug messages to a file"
    )]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(
        long = "log-file",
        global = true,
        help = "Specify a custom log file path"
    )]
    pub log_file: Option<String>,

    /// Suppress non-essential output (spinners, waiting messages, etc.)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress non-essential output"
    )]
    pub quiet: bool,

    /// Display the version
    #[arg(
        short = 'v',
        long = "version",
        global = true,
        help = "Display the version"
    )]
    pub version: bool,
}

/// Enumeration of available subcommands
#[derive(Subcommand)]
#[command(subcommand_negates_reqs = true)]
#[command(subcommand_precedence_over_arg = true)]
pub enum Commands {
    /// Review a diff interactively
    #[command(
        about = "Review a diff with AI",
        long_about = "Stream an AI review of a diff into an interactive session. Use --print to write the review to stdout instead.",
        after_help = get_dynamic_help()
    )]
    Review(ReviewArgs),

    /// List available review presets
    #[command(about = "List available review presets")]
    ListPresets,

    /// List saved sessions
    #[command(about = "List saved review sessions")]
    Sessions,
}

/// Arguments of the `review` command
#[derive(Args, Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ReviewArgs {
    /// Diff to review; `-` reads standard input
    #[arg(long, default_value = "-", help = "Diff file to review ('-' for stdin)")]
    pub diff: String,

    /// Full contents of a changed file, for context
    #[arg(long = "file", help = "Include a file's full content (repeatable)")]
    pub files: Vec<String>,

    /// Files left out of the review
    #[arg(long = "ignore", help = "Record a file as ignored (repeatable)")]
    pub ignored: Vec<String>,

    #[arg(short, long, help = "Custom instruction for the reviewer")]
    pub instruction: Option<String>,

    #[arg(long = "focus", help = "Area to concentrate on (repeatable)")]
    pub focus: Vec<FocusArea>,

    #[arg(long = "avoid", help = "Something the reviewer should not comment on (repeatable)")]
    pub avoid: Vec<String>,

    #[arg(long, help = "Allow the reviewer to consult the web")]
    pub web_search: bool,

    #[arg(long, help = "Override default LLM provider", value_parser = available_providers_parser)]
    pub provider: Option<String>,

    #[arg(long, help = "Override the model")]
    pub model: Option<String>,

    #[arg(long, help = "Review preset to use")]
    pub preset: Option<String>,

    /// Print the review to stdout and exit
    #[arg(short, long, help = "Print the review to stdout and exit")]
    pub print: bool,

    #[arg(long, help = "Resume a saved session", conflicts_with = "print")]
    pub resume: Option<String>,

    #[arg(long, help = "Save the session under this name on exit")]
    pub save: Option<String>,
}

/// Validate provider input against the supported providers
pub fn available_providers_parser(s: &str) -> Result<String, String> {
    Provider::from_str(s)
        .map(|p| p.name().to_string())
        .map_err(|_| {
            format!(
                "Invalid provider '{}'. Available providers: {}",
                s,
                Provider::all_names().join(", ")
            )
        })
}

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Help footer listing the supported providers
fn get_dynamic_help() -> String {
    let providers = Provider::all_names()
        .iter()
        .map(|p| format!("{}", p.bold()))
        .collect::<Vec<_>>()
        .join(" • ");

    format!("\nAvailable LLM Providers: {providers}")
}

/// Main function to parse arguments and handle the command
pub async fn main() -> Result<()> {
    let cli = parse_args();

    if cli.version {
        ui::print_version(crate_version!());
        return Ok(());
    }

    if cli.log {
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        crate::logger::log_to_file(log_file)
            .with_context(|| format!("Failed to open log file {log_file}"))?;
    }

    if cli.quiet {
        ui::set_quiet_mode(true);
    }

    if let Some(command) = cli.command {
        handle_command(command).await
    } else {
        // If no subcommand is provided, print the help
        let _ = Cli::parse_from(["revu", "--help"]);
        Ok(())
    }
}

pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Review(args) => handle_review(args).await,
        Commands::ListPresets => {
            let library = get_instruction_preset_library();
            println!("{}", "Available review presets:".bright_magenta().bold());
            println!("{}", list_presets_formatted(&library));
            Ok(())
        }
        Commands::Sessions => handle_sessions(),
    }
}

/// Apply command-line overrides on top of the loaded configuration
pub fn apply_overrides(config: &mut Config, args: &ReviewArgs) -> Result<()> {
    if let Some(provider) = &args.provider {
        config.set_provider(Provider::from_str(provider)?);
    }
    config.set_temp_model(args.model.clone());
    config.set_temp_preset(args.preset.clone());
    Ok(())
}

/// Assemble the review context from the diff and the listed files
pub fn build_context(args: &ReviewArgs) -> Result<ReviewContext> {
    let diff = if args.diff == "-" {
        let mut diff = String::new();
        io::stdin()
            .read_to_string(&mut diff)
            .context("Failed to read diff from stdin")?;
        diff
    } else {
        std::fs::read_to_string(&args.diff)
            .with_context(|| format!("Failed to read diff: {}", args.diff))?
    };
    if diff.trim().is_empty() {
        bail!("The diff is empty; nothing to review");
    }

    let mut files = BTreeMap::new();
    for path in &args.files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {path}"))?;
        files.insert(path.clone(), content);
    }

    let intent = Intent {
        instruction: args.instruction.clone(),
        focus: args.focus.iter().copied().collect(),
        avoid: args.avoid.clone(),
        web_search: args.web_search,
    };

    Ok(ReviewContext::new(diff, files)
        .with_intent(intent)
        .with_ignored(args.ignored.clone()))
}

async fn handle_review(args: ReviewArgs) -> Result<()> {
    let mut config = Config::load()?;
    apply_overrides(&mut config, &args)?;

    let library = get_instruction_preset_library();
    let preset_name = config.get_effective_preset_name().to_string();
    if library.get_preset(&preset_name).is_none() {
        ui::print_warning(&format!(
            "Unknown preset '{preset_name}', using default. Run 'revu list-presets' to see them."
        ));
    }
    let preset = library.get_or_default(&preset_name);

    let context = build_context(&args)?;
    let backend = Backend::from_config(config)?;
    log_debug!(
        "Review: {} files, provider model {}, preset {}",
        context.files.len(),
        backend.model(),
        preset.name
    );

    if args.print {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });
        return run_simple(&cancel, context, &backend, &preset, &mut io::stdout()).await;
    }

    let resume = match &args.resume {
        Some(name) => match SnapshotStore::open_default()?.load(name)? {
            Some(snapshot) => Some(snapshot),
            None => bail!("No saved session named '{name}'. Run 'revu sessions' to list them."),
        },
        None => None,
    };

    studio::run(
        context,
        &backend,
        SessionId::new(),
        preset,
        RunOptions {
            resume,
            save_name: args.save,
        },
    )
    .await
}

fn handle_sessions() -> Result<()> {
    let names = SnapshotStore::open_default()?.list()?;
    if names.is_empty() {
        ui::print_info("No saved sessions");
        return Ok(());
    }
    println!("{}", "Saved sessions:".bright_magenta().bold());
    for name in names {
        println!("  {name}");
    }
    Ok(())
}
