//! tally: track time spent on named tasks.
//!
//! Without a subcommand, opens the interactive menu. Subcommands run one
//! operation against the same history and exit.
//!
//! ## Subcommands
//!
//! - `start`, `stop`, `pause`, `resume`, `switch`: session transitions
//! - `status`, `list`, `summary`: read-only views
//! - `export`: write a CSV file and open it
//! - `clear`: delete all history (asks first unless `--yes`)
//! - `menu`: the interactive menu

mod app;
mod logging;
mod menu;
mod opener;
mod render;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tally_core::{load_or_init_config, Result, StorageConfig, SwitchAction, TallyError};

use app::App;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Track time spent on named tasks")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to $TALLY_HOME or ~/.tally)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tracking a task
    Start {
        /// Task name (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Stop the running task
    Stop,

    /// Pause the running task so it can be resumed later
    Pause,

    /// Start a new session for a paused task
    Resume {
        /// Task name; omitted picks the only paused task
        #[arg(num_args = 0..)]
        name: Vec<String>,
    },

    /// Close the running task and start another
    Switch {
        /// Task name to switch to
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,

        /// Stop the running task instead of pausing it
        #[arg(long, conflicts_with = "pause")]
        stop: bool,

        /// Pause the running task (overrides a configured default of stop)
        #[arg(long)]
        pause: bool,
    },

    /// Show the running task
    Status,

    /// List all sessions
    List,

    /// Total time per task
    Summary {
        /// Count the running task's time so far
        #[arg(long)]
        include_running: bool,
    },

    /// Export all sessions to CSV
    Export {
        /// Target directory
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Don't open the file afterwards
        #[arg(long)]
        no_open: bool,
    },

    /// Delete every session
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Interactive menu (default)
    Menu,
}

fn main() {
    let cli = Cli::parse();

    let storage = match cli.data_dir {
        Some(dir) => StorageConfig::with_root(dir),
        None => match StorageConfig::from_env() {
            Ok(storage) => storage,
            Err(err) => {
                eprintln!("Error: {}", err);
                std::process::exit(1);
            }
        },
    };
    if let Err(err) = storage.ensure_dirs() {
        eprintln!("Error: failed to create {}: {}", storage.root().display(), err);
        std::process::exit(1);
    }

    let _logging_guard = logging::init(&storage);
    let config = load_or_init_config(&storage.config_file());
    let mut app = App::open(storage, config);

    let command = cli.command.unwrap_or(Commands::Menu);
    let one_shot = !matches!(command, Commands::Menu);

    match execute(&mut app, command) {
        Ok(Some(message)) => println!("{}", message),
        Ok(None) => {}
        Err(err) => {
            if err.is_user_error() {
                tracing::info!(error = %err, "tally command refused");
            } else {
                tracing::error!(error = %err, "tally command failed");
            }
            eprintln!("Error: {}", err);
            if one_shot || !err.is_user_error() {
                std::process::exit(1);
            }
        }
    }
}

fn execute(app: &mut App, command: Commands) -> Result<Option<String>> {
    match command {
        Commands::Start { name } => app.start(&name.join(" ")).map(Some),
        Commands::Stop => app.stop().map(Some),
        Commands::Pause => app.pause().map(Some),
        Commands::Resume { name } => {
            let name = name.join(" ");
            let name = Some(name.as_str()).filter(|n| !n.trim().is_empty());
            app.resume(name).map(Some)
        }
        Commands::Switch { name, stop, pause } => {
            let action = switch_action(stop, pause);
            app.switch(&name.join(" "), action).map(Some)
        }
        Commands::Status => Ok(Some(app.status())),
        Commands::List => Ok(Some(app.history())),
        Commands::Summary { include_running } => Ok(Some(app.summary(include_running))),
        Commands::Export { dir, no_open } => app.export(dir, !no_open).map(Some),
        Commands::Clear { yes } => {
            if !yes && !confirm("Delete every session? [y/N] ")? {
                return Ok(Some("Nothing cleared".to_string()));
            }
            app.clear().map(Some)
        }
        Commands::Menu => {
            let stdin = io::stdin();
            menu::run(app, stdin.lock(), io::stdout())?;
            Ok(None)
        }
    }
}

/// `None` defers to the configured default.
fn switch_action(stop: bool, pause: bool) -> Option<SwitchAction> {
    match (stop, pause) {
        (true, _) => Some(SwitchAction::Stop),
        (_, true) => Some(SwitchAction::Pause),
        _ => None,
    }
}

fn confirm(question: &str) -> Result<bool> {
    let io_err = |e: io::Error| TallyError::Io {
        context: "reading confirmation".to_string(),
        source: e,
    };

    print!("{}", question);
    io::stdout().flush().map_err(io_err)?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer).map_err(io_err)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}
