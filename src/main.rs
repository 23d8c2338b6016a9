//! backtrack - undoable file operations from the command line.
//!
//! Usage:
//!   backtrack                 Start the interactive shell
//!   backtrack config          Show the effective configuration
//!   backtrack --help          Show help
//!
//! Shell commands:
//!   copy SRC DIR   move SRC DIR   rename SRC NAME   delete PATH
//!   touch PATH     mkdir PATH     undo   redo   history [--json]   clear   quit

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use backtrack_core::EngineConfig;
use backtrack_ops::{
    AlwaysConfirm, Conflict, CreateKind, Engine, ExecutorClosed, FileOperation, History,
    LogEntry, OperationExecutor, OperationOutcome,
};

#[derive(Parser)]
#[command(
    name = "backtrack",
    version,
    about = "Undoable file operations",
    long_about = "backtrack applies copy, move, rename, delete and create operations \
                  and lets you undo and redo them. Anything an operation would destroy \
                  is snapshotted first.\n\n\
                  Run without a subcommand to start the interactive shell."
)]
struct Cli {
    /// Config file (defaults to <config dir>/backtrack/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory to keep backup snapshots in
    #[arg(long, global = true)]
    backup_root: Option<PathBuf>,

    /// Number of operations that can be undone
    #[arg(long, global = true)]
    max_history: Option<usize>,

    /// Delete without asking
    #[arg(long, global = true)]
    no_confirm_delete: bool,

    /// Leave this session's backups on disk at exit
    #[arg(long, global = true)]
    keep_backups: bool,

    /// Answer yes to every prompt
    #[arg(short, long, global = true)]
    yes: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Read operations from stdin, one per line
    Shell,

    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        write: bool,
    },
}

/// One line typed into the shell.
#[derive(Parser)]
#[command(name = "backtrack", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// Copy an item into a folder
    #[command(alias = "cp")]
    Copy { source: PathBuf, destination: PathBuf },

    /// Move an item into a folder
    #[command(alias = "mv")]
    Move { source: PathBuf, destination: PathBuf },

    /// Rename an item in place
    Rename { source: PathBuf, new_name: String },

    /// Delete an item (a snapshot is kept for undo)
    #[command(alias = "rm")]
    Delete { path: PathBuf },

    /// Create an empty file
    Touch {
        path: PathBuf,
        /// Pick a free name instead of replacing
        #[arg(long)]
        new: bool,
    },

    /// Create an empty folder
    Mkdir {
        path: PathBuf,
        /// Pick a free name instead of replacing
        #[arg(long)]
        new: bool,
    },

    /// Undo the last operation
    Undo,

    /// Redo the last undone operation
    Redo,

    /// Show the undo and redo stacks
    History {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget all history and discard its backups
    Clear,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

enum Reply {
    Outcome(OperationOutcome),
    History { history: History, json: bool },
    Cleared,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = engine_config(&cli)?;

    match cli.command {
        Some(Command::Config { write }) => show_config(&config, write, cli.config.as_deref()),
        Some(Command::Shell) | None => run_shell(config, cli.yes).await,
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file and apply command-line overrides.
fn engine_config(cli: &Cli) -> Result<EngineConfig> {
    let base = match &cli.config {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };

    EngineConfig::builder()
        .backup_root(cli.backup_root.clone().unwrap_or(base.backup_root))
        .max_history(cli.max_history.unwrap_or(base.max_history))
        .confirm_delete(base.confirm_delete && !cli.no_confirm_delete)
        .purge_on_exit(base.purge_on_exit && !cli.keep_backups)
        .build()
        .wrap_err("Invalid configuration")
}

fn show_config(config: &EngineConfig, write: bool, path: Option<&Path>) -> Result<()> {
    if write {
        let path = path
            .map(Path::to_path_buf)
            .or_else(EngineConfig::config_path)
            .ok_or_else(|| eyre!("No config directory on this system"))?;
        config
            .save_to(&path)
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Wrote {}", path.display());
    } else {
        print!("{}", config.to_toml().wrap_err("Failed to render config")?);
    }
    Ok(())
}

/// Run the line-oriented shell until EOF or `quit`.
async fn run_shell(config: EngineConfig, yes: bool) -> Result<()> {
    debug!(backup_root = %config.backup_root.display(), yes, "starting shell");
    let (executor, mut prompts) = if yes {
        // The sender is dropped right away, so no prompt ever arrives.
        let (_tx, rx) = mpsc::channel(1);
        (OperationExecutor::spawn(Engine::new(config, AlwaysConfirm)), rx)
    } else {
        OperationExecutor::spawn_interactive(config)
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt("> ")?;
        let Some(line) = lines.next_line().await.wrap_err("Failed to read input")? else {
            break;
        };

        let words = match split_words(&line) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };

        let command = match ShellLine::try_parse_from(&words) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                eprint!("{e}");
                continue;
            }
        };
        let reply = {
            let request = dispatch(&executor, command);
            tokio::pin!(request);
            loop {
                tokio::select! {
                    reply = &mut request => break reply,
                    Some(pending) = prompts.recv() => {
                        let approved = ask(&mut lines, &pending.conflict).await?;
                        pending.respond(approved);
                    }
                }
            }
        };

        match reply {
            Ok(Reply::Quit) => break,
            Ok(reply) => print_reply(reply)?,
            Err(e) => {
                warn!(error = %e, "engine worker stopped unexpectedly");
                eprintln!("{e}");
                break;
            }
        }
    }

    executor.shutdown().await;
    debug!("shell exited");
    Ok(())
}

async fn dispatch(
    executor: &OperationExecutor,
    command: ShellCommand,
) -> Result<Reply, ExecutorClosed> {
    let outcome = match command {
        ShellCommand::Copy {
            source,
            destination,
        } => executor.copy(source, destination).await?,
        ShellCommand::Move {
            source,
            destination,
        } => executor.move_to(source, destination).await?,
        ShellCommand::Rename { source, new_name } => executor.rename(source, new_name).await?,
        ShellCommand::Delete { path } => executor.delete(path).await?,
        ShellCommand::Touch { path, new: false } => executor.create_file(path).await?,
        ShellCommand::Touch { path, new: true } => {
            executor.create_new(path, CreateKind::File).await?
        }
        ShellCommand::Mkdir { path, new: false } => executor.create_folder(path).await?,
        ShellCommand::Mkdir { path, new: true } => {
            executor.submit(FileOperation::create_new(path, CreateKind::Folder)).await?
        }
        ShellCommand::Undo => executor.undo().await?,
        ShellCommand::Redo => executor.redo().await?,
        ShellCommand::History { json } => {
            let history = executor.history().await?;
            return Ok(Reply::History { history, json });
        }
        ShellCommand::Clear => {
            executor.clear().await?;
            return Ok(Reply::Cleared);
        }
        ShellCommand::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Outcome(outcome))
}

/// Ask a yes/no question on the terminal. EOF means no.
async fn ask(lines: &mut Lines<BufReader<Stdin>>, conflict: &Conflict) -> Result<bool> {
    prompt(&format!("{} [y/N] ", conflict.message()))?;
    let answer = lines
        .next_line()
        .await
        .wrap_err("Failed to read answer")?
        .unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn prompt(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{text}")?;
    stdout.flush()?;
    Ok(())
}

fn print_reply(reply: Reply) -> Result<()> {
    match reply {
        Reply::Outcome(outcome) => {
            if outcome.is_success() || outcome.is_cancelled() {
                println!("{}", outcome.summary());
            } else {
                eprintln!("{}", outcome.summary());
            }
        }
        Reply::History { history, json: true } => {
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Reply::History {
            history,
            json: false,
        } => print_history(&history),
        Reply::Cleared => println!("History cleared"),
        Reply::Quit => {}
    }
    Ok(())
}

fn print_history(history: &History) {
    println!("{}", "─".repeat(60));
    println!(" Undo ({} entries, oldest first)", history.undo.len());
    println!("{}", "─".repeat(60));
    if history.undo.is_empty() {
        println!("   (empty)");
    }
    for entry in &history.undo {
        print_entry(entry);
    }

    println!();
    println!(" Redo ({} entries, next last)", history.redo.len());
    println!("{}", "─".repeat(60));
    if history.redo.is_empty() {
        println!("   (empty)");
    }
    for entry in &history.redo {
        print_entry(entry);
    }
}

fn print_entry(entry: &LogEntry) {
    let backup_bytes: u64 = entry.command.backups().iter().map(|b| b.size).sum();
    let backup = if entry.command.backups().is_empty() {
        String::new()
    } else {
        format!("  [backup {}]", format_size(backup_bytes))
    };

    println!(
        "   #{:<4} {}  {}{}",
        entry.id,
        entry.timestamp.format("%H:%M:%S"),
        entry.description,
        backup
    );
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Split a shell line into words, honouring quotes and backslash escapes.
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, '\\') | (Some('"'), '\\') => {
                let escaped = chars.next().ok_or("Trailing backslash")?;
                current.push(escaped);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (_, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err("Unterminated quote".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(
            split_words("copy 'my file.txt' /tmp/out").unwrap(),
            vec!["copy", "my file.txt", "/tmp/out"]
        );
        assert_eq!(
            split_words(r#"rename "a b" c\ d"#).unwrap(),
            vec!["rename", "a b", "c d"]
        );
        assert_eq!(split_words("touch ''").unwrap(), vec!["touch", ""]);
        assert!(split_words("   ").unwrap().is_empty());
        assert!(split_words("copy 'oops").is_err());
    }

    #[test]
    fn test_shell_line_parsing() {
        let line = ShellLine::try_parse_from(["mv", "a", "b"]).unwrap();
        assert!(matches!(line.command, ShellCommand::Move { .. }));

        let line = ShellLine::try_parse_from(["history", "--json"]).unwrap();
        assert!(matches!(line.command, ShellCommand::History { json: true }));

        assert!(ShellLine::try_parse_from(["rename", "only-one"]).is_err());
    }
}
