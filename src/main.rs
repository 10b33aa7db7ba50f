//! # Guestbox CLI (`guestbox`)
//!
//! The `guestbox` binary manages guest-mode data for the scraping workspace:
//! entering and leaving guest mode, recording tasks, results, notes, templates,
//! and recent URLs, exporting/importing backups, and migrating everything into
//! a signed-in account.
//!
//! ## Usage
//!
//! ```bash
//! guestbox --config ./config/guestbox.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `guestbox init` | Enter guest mode and create the guest data skeleton |
//! | `guestbox status` | Guest mode, record counts, and storage usage |
//! | `guestbox task add/list/set-status` | Scraping tasks |
//! | `guestbox result add/list` | Scraping results |
//! | `guestbox note add/list/edit` | Notes |
//! | `guestbox template add/list` | Selector templates |
//! | `guestbox visit <url>` / `guestbox recent` | Recently visited URLs |
//! | `guestbox prefs show/set` | Preferences |
//! | `guestbox export` / `guestbox import <file>` | Backup and restore |
//! | `guestbox clear` | Delete all guest data |
//! | `guestbox migrate` | Copy guest records into the signed-in account |
//! | `guestbox disable` | Leave guest mode (data is kept) |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use guestbox::config;
use guestbox::db;
use guestbox::export;
use guestbox::logging::{self, LogFormat};
use guestbox::migrate;
use guestbox::progress::ProgressMode;
use guestbox::records::{self, parse_enum};
use guestbox::stats;
use guestbox_core::models::{
    ExportFormat, Layout, PreferencesPatch, ResultStatus, TaskStatus, Theme,
};
use guestbox_core::GuestStore;

/// Guestbox CLI: guest-mode storage and account migration.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without one, guest data is stored in `./data/guest-storage.json`.
#[derive(Parser)]
#[command(
    name = "guestbox",
    about = "Guestbox — guest-mode storage and account migration for the scraping workspace",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/guestbox.toml")]
    config: PathBuf,

    /// Log output format (logs go to stderr; set RUST_LOG to change the level).
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Enter guest mode.
    ///
    /// Persists the guest-mode flag and writes an empty guest data document
    /// if none exists. Idempotent.
    Init,

    /// Show guest mode, record counts, and storage usage.
    Status,

    /// Leave guest mode. Guest data is kept until `clear`.
    Disable,

    /// Manage scraping tasks.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage scraping results.
    #[command(name = "result")]
    Results {
        #[command(subcommand)]
        action: ResultAction,
    },

    /// Manage notes.
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Manage selector templates.
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Record a visit to a URL.
    Visit {
        url: String,
        #[arg(long)]
        title: Option<String>,
    },

    /// List recently visited URLs, most recent first.
    Recent {
        #[arg(long)]
        json: bool,
    },

    /// Show or change preferences.
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Export all guest data as JSON.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Replace all guest data with an exported JSON document (`-` for stdin).
    Import { input: PathBuf },

    /// Delete all guest data.
    Clear,

    /// Copy guest tasks, results, notes, and templates into the signed-in account.
    ///
    /// Requires an `[account]` section and the API key / access token
    /// environment variables it names.
    Migrate {
        /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,

        /// Clear guest data and leave guest mode if every record migrated.
        #[arg(long)]
        clear_after: bool,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add a task; prints its id.
    Add {
        #[arg(long)]
        url: String,
        #[arg(long)]
        name: String,
        /// pending, completed, or failed.
        #[arg(long, value_parser = parse_enum::<TaskStatus>, default_value = "pending")]
        status: TaskStatus,
        #[arg(long)]
        schedule: Option<String>,
        /// Selector (JSON or plain text); repeatable.
        #[arg(long = "selector")]
        selectors: Vec<String>,
    },
    List {
        #[arg(long)]
        json: bool,
    },
    /// Change a task's status.
    SetStatus {
        id: String,
        #[arg(value_parser = parse_enum::<TaskStatus>)]
        status: TaskStatus,
    },
}

#[derive(Subcommand)]
enum ResultAction {
    /// Add a result; prints its id.
    Add {
        #[arg(long)]
        task: String,
        /// Scraped data as JSON.
        #[arg(long)]
        data: String,
        /// success, partial, or failed.
        #[arg(long, value_parser = parse_enum::<ResultStatus>, default_value = "success")]
        status: ResultStatus,
        #[arg(long)]
        error: Option<String>,
    },
    List {
        /// Only results for this task id.
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum NoteAction {
    /// Add a note; prints its id.
    Add {
        content: String,
        #[arg(long)]
        task: Option<String>,
    },
    List {
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Edit a note's content or task.
    Edit {
        id: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, conflicts_with = "detach")]
        task: Option<String>,
        /// Detach the note from its task.
        #[arg(long)]
        detach: bool,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Add a template; prints its id.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long = "selector")]
        selectors: Vec<String>,
    },
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PrefsAction {
    Show,
    /// Change only the given preferences.
    Set {
        /// light, dark, or system.
        #[arg(long, value_parser = parse_enum::<Theme>)]
        theme: Option<Theme>,
        /// grid or list.
        #[arg(long, value_parser = parse_enum::<Layout>)]
        layout: Option<Layout>,
        #[arg(long)]
        notifications: Option<bool>,
        /// json or csv.
        #[arg(long, value_parser = parse_enum::<ExportFormat>)]
        export_format: Option<ExportFormat>,
    },
}

fn require_guest_mode(store: &GuestStore) -> anyhow::Result<()> {
    if !store.is_guest_mode() {
        anyhow::bail!("Guest mode is not active. Run `guestbox init` first.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format);

    let cfg = config::load_or_minimal(&cli.config)?;
    let store = db::open(&cfg)?;

    match cli.command {
        Commands::Init => {
            store.enable_guest_mode()?;
            println!("Guest mode enabled.");
        }
        Commands::Status => {
            stats::run_status(&cfg, &store)?;
        }
        Commands::Disable => {
            store.disable_guest_mode()?;
            println!("Guest mode disabled.");
        }
        Commands::Task { action } => {
            require_guest_mode(&store)?;
            match action {
                TaskAction::Add {
                    url,
                    name,
                    status,
                    schedule,
                    selectors,
                } => records::run_task_add(&store, url, name, status, schedule, &selectors)?,
                TaskAction::List { json } => records::run_task_list(&store, json)?,
                TaskAction::SetStatus { id, status } => {
                    records::run_task_set_status(&store, &id, status)?
                }
            }
        }
        Commands::Results { action } => {
            require_guest_mode(&store)?;
            match action {
                ResultAction::Add {
                    task,
                    data,
                    status,
                    error,
                } => records::run_result_add(&store, task, &data, status, error)?,
                ResultAction::List { task, json } => {
                    records::run_result_list(&store, task.as_deref(), json)?
                }
            }
        }
        Commands::Note { action } => {
            require_guest_mode(&store)?;
            match action {
                NoteAction::Add { content, task } => records::run_note_add(&store, content, task)?,
                NoteAction::List { task, json } => {
                    records::run_note_list(&store, task.as_deref(), json)?
                }
                NoteAction::Edit {
                    id,
                    content,
                    task,
                    detach,
                } => records::run_note_edit(&store, &id, content, task, detach)?,
            }
        }
        Commands::Template { action } => {
            require_guest_mode(&store)?;
            match action {
                TemplateAction::Add { name, selectors } => {
                    records::run_template_add(&store, name, &selectors)?
                }
                TemplateAction::List { json } => records::run_template_list(&store, json)?,
            }
        }
        Commands::Visit { url, title } => {
            require_guest_mode(&store)?;
            records::run_visit(&store, &url, title)?;
        }
        Commands::Recent { json } => {
            require_guest_mode(&store)?;
            records::run_recent(&store, json)?;
        }
        Commands::Prefs { action } => {
            require_guest_mode(&store)?;
            match action {
                PrefsAction::Show => records::run_prefs_show(&store)?,
                PrefsAction::Set {
                    theme,
                    layout,
                    notifications,
                    export_format,
                } => records::run_prefs_set(
                    &store,
                    PreferencesPatch {
                        theme,
                        layout,
                        notifications_enabled: notifications,
                        default_export_format: export_format,
                    },
                )?,
            }
        }
        Commands::Export { output } => {
            export::run_export(&store, output.as_deref())?;
        }
        Commands::Import { input } => {
            export::run_import(&store, &input)?;
        }
        Commands::Clear => {
            store.clear()?;
            println!("Guest data cleared.");
        }
        Commands::Migrate {
            progress,
            clear_after,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            migrate::run_migrate(&cfg, &store, mode, clear_after).await?;
        }
    }

    Ok(())
}
