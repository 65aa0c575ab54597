//! cmdmux - command multiplexing and dispatch.
//!
//! Hosts a command manager with the bundled frameworks and lets you run,
//! complete and inspect commands from the terminal.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cmdmux::core::{CONSOLE_SUBJECT, ORIGIN};
use cmdmux::{
    CommandManager, CommandResult, Config, InvocationContext, PluginId, RegistrarId, ResultKind,
    ScriptedRegistrar, SimpleCommand, SimpleRegistrar, APP_NAME,
};

/// Run commands from many command frameworks through one dispatcher
#[derive(Parser)]
#[command(name = "cmdmux")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a config file (defaults to .cmdmux.toml, then the user config dir)
    #[arg(short, long, global = true, env = "CMDMUX_CONFIG")]
    config: Option<PathBuf>,

    /// Subject the commands run as
    #[arg(long, global = true, default_value = CONSOLE_SUBJECT)]
    subject: String,

    /// Permission granted to the subject (repeatable)
    #[arg(short, long = "permission", global = true)]
    permissions: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a command line
    Exec {
        /// The command line, e.g. "echo hello"
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },

    /// Show completions for a partial command line
    Suggest {
        /// The partial command line
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },

    /// Show help for a command
    Help {
        /// The command name
        name: String,
    },

    /// Print the command completion tree
    Tree {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = TreeFormat::Text)]
        format: TreeFormat,
    },

    /// List registered commands and their aliases
    List,

    /// Read command lines from stdin and execute them one by one
    Shell,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TreeFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    let manager = build_manager(&config)?;
    let cause = invocation_context(&cli.subject, &cli.permissions);

    match cli.command {
        Commands::Exec { line } => {
            let code = cmd_exec(&manager, &cause, &line.join(" "));
            std::process::exit(code);
        }
        Commands::Suggest { line } => cmd_suggest(&manager, &cause, &line.join(" ")),
        Commands::Help { name } => cmd_help(&manager, &cause, &name),
        Commands::Tree { format } => cmd_tree(&manager, &cause, format)?,
        Commands::List => cmd_list(&manager),
        Commands::Shell => cmd_shell(&manager, &cause)?,
        Commands::Completions { shell } => cmd_completions(shell),
    }

    Ok(())
}

/// Build the invocation context for the CLI subject.
///
/// The console gets every permission unless permissions are given explicitly.
fn invocation_context(subject: &str, permissions: &[String]) -> InvocationContext {
    let cause = if subject == CONSOLE_SUBJECT && permissions.is_empty() {
        InvocationContext::console()
    } else {
        InvocationContext::new(subject).with_permissions(permissions.iter().cloned())
    };
    cause.with_context(ORIGIN, "cli")
}

/// Set up the manager with the built-in commands and the scripted ones.
fn build_manager(config: &Config) -> Result<Arc<CommandManager>> {
    let manager = Arc::new(CommandManager::with_config(config.manager.clone()));
    register_builtins(&manager)?;

    let scripted = ScriptedRegistrar::new();
    let installed = scripted.install(&manager, &config.commands)?;
    tracing::debug!(count = installed.len(), "Installed scripted commands");

    Ok(manager)
}

fn register_builtins(manager: &Arc<CommandManager>) -> Result<()> {
    let plugin = PluginId::new(APP_NAME);
    let registrar = SimpleRegistrar::new(RegistrarId::new(APP_NAME, "builtin"));

    registrar.register(
        manager,
        &plugin,
        SimpleCommand::new("echo", |_, args| Ok(CommandResult::success_with(args)))
            .alias("say")
            .description("Print the arguments back")
            .usage("<text>")
            .argument("text", "greedy_string"),
    )?;

    registrar.register(
        manager,
        &plugin,
        SimpleCommand::new("whoami", |cause, _| {
            Ok(CommandResult::success_with(cause.subject().to_string()))
        })
        .description("Show the subject running commands"),
    )?;

    let listing = Arc::downgrade(manager);
    registrar.register(
        manager,
        &plugin,
        SimpleCommand::new("commands", move |_, _| {
            let Some(manager) = listing.upgrade() else {
                return Ok(CommandResult::failure("Command manager is shutting down"));
            };
            Ok(CommandResult::success_with(manager.primary_aliases().join(", ")))
        })
        .alias("cmds")
        .description("List every registered command"),
    )?;

    Ok(())
}

fn print_result(result: &CommandResult) {
    match (result.kind, &result.message) {
        (ResultKind::Success, Some(message)) => println!("{message}"),
        (ResultKind::Success, None) => {}
        (_, Some(message)) => eprintln!("{message}"),
        (kind, None) => eprintln!("Command {kind}"),
    }
}

fn exit_code(kind: ResultKind) -> i32 {
    match kind {
        ResultKind::Success => 0,
        ResultKind::Failure => 1,
        ResultKind::NotFound => 2,
    }
}

fn cmd_exec(manager: &CommandManager, cause: &InvocationContext, line: &str) -> i32 {
    let cause = cause.clone().with_command_string(line);
    let result = manager.dispatch(&cause, line);
    print_result(&result);
    exit_code(result.kind)
}

fn cmd_suggest(manager: &CommandManager, cause: &InvocationContext, line: &str) {
    for suggestion in manager.suggest(cause, line) {
        println!("{suggestion}");
    }
}

fn cmd_help(manager: &CommandManager, cause: &InvocationContext, name: &str) {
    match manager.help(cause, name) {
        Some(help) => println!("{help}"),
        None if manager.is_registered(name) => println!("No help available for '{name}'"),
        None => println!("Unknown command: {name}"),
    }
}

fn cmd_tree(manager: &CommandManager, cause: &InvocationContext, format: TreeFormat) -> Result<()> {
    let tree = manager.build_command_tree(cause);
    match format {
        TreeFormat::Text => print!("{}", tree.render_text()),
        TreeFormat::Json => println!("{}", tree.to_json()?),
    }
    Ok(())
}

fn cmd_list(manager: &CommandManager) {
    for mapping in manager.mappings() {
        let others: Vec<&str> = mapping.secondary_aliases().collect();
        if others.is_empty() {
            println!("{:<20} [{}]", mapping.primary_alias(), mapping.plugin());
        } else {
            println!(
                "{:<20} [{}] aliases: {}",
                mapping.primary_alias(),
                mapping.plugin(),
                others.join(", ")
            );
        }
    }
}

fn cmd_shell(manager: &CommandManager, cause: &InvocationContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") && !manager.is_registered(line) {
            break;
        }

        let cause = cause.clone().with_command_string(line);
        let result = manager.dispatch(&cause, line);
        print_result(&result);
        stdout.flush()?;
    }

    Ok(())
}

fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "cmdmux", &mut io::stdout());
}
