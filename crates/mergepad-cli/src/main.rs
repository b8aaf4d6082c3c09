mod render;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mergepad_core::config::Settings;
use mergepad_core::logging::init_logging;
use mergepad_engine::reconcile::Row;
use mergepad_engine::{
    DiffStats, EngineConfig, InitialSelection, MergeSession, Mode, SegmentId, SegmentState,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "mergepad",
    about = "Compare two versions of code or text and merge them segment by segment"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to .mergepad data directory
    #[arg(long, default_value = ".mergepad", global = true)]
    data_dir: PathBuf,
}

#[derive(clap::Args)]
struct CompareArgs {
    /// Original version
    original: PathBuf,
    /// Modified version
    modified: PathBuf,
    /// Comparison granularity: code (lines) or text (words)
    #[arg(long)]
    mode: Option<Mode>,
    /// Initial selection: modified, original, everything or unchanged
    #[arg(long)]
    select: Option<InitialSelection>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two files and print the diff view and merged output
    Compare {
        #[command(flatten)]
        args: CompareArgs,
        /// Flip acceptance of a segment (repeatable)
        #[arg(long = "toggle", value_name = "ID")]
        toggles: Vec<SegmentId>,
        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,
        /// Column width of the original pane in the code view
        #[arg(long, default_value_t = 48)]
        width: usize,
    },
    /// Pick changes interactively and write the merged result
    Merge {
        #[command(flatten)]
        args: CompareArgs,
        /// Write the merged output here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Serve the comparison API over HTTP
    #[cfg(feature = "http")]
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Manage settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write default settings
    Init {
        /// Overwrite existing settings
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings
    Show,
}

#[derive(Serialize)]
struct Report {
    mode: Mode,
    segments: Vec<SegmentState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<Row>>,
    merged: String,
    stats: DiffStats,
}

fn settings_path(cli: &Cli) -> PathBuf {
    cli.data_dir.join("settings.json")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_or_default(&settings_path(&cli))?;

    let _guard = init_logging(&cli.data_dir.join("logs"), settings.logging.filter.as_deref())?;

    match &cli.command {
        Commands::Compare {
            args,
            toggles,
            json,
            width,
        } => cmd_compare(&settings, args, toggles, *json, *width),
        Commands::Merge { args, output } => cmd_merge(&settings, args, output.as_deref()),
        #[cfg(feature = "http")]
        Commands::Serve { port } => cmd_serve(&settings, *port).await,
        Commands::Config { action } => cmd_config(&cli, &settings, action),
    }
}

fn open_session(settings: &Settings, args: &CompareArgs) -> anyhow::Result<MergeSession> {
    let original = read_input(&args.original)?;
    let modified = read_input(&args.modified)?;

    let config = EngineConfig {
        mode: args.mode.unwrap_or(settings.engine.mode),
        initial_selection: args.select.unwrap_or(settings.engine.initial_selection),
        ..settings.engine
    };
    let mut session = MergeSession::new(config);
    let stats = session.compare(&original, &modified);
    tracing::debug!(
        original = %args.original.display(),
        modified = %args.modified.display(),
        mode = %config.mode,
        added = stats.added,
        removed = stats.removed,
        "compared"
    );
    Ok(session)
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn cmd_compare(
    settings: &Settings,
    args: &CompareArgs,
    toggles: &[SegmentId],
    json: bool,
    width: usize,
) -> anyhow::Result<()> {
    let mut session = open_session(settings, args)?;
    for &id in toggles {
        if !session.toggle(id) {
            tracing::warn!("No segment {} in this comparison; toggle ignored", id);
        }
    }

    let segments = session.snapshot();
    let stats = DiffStats::from_states(&segments);

    if json {
        let report = Report {
            mode: session.mode(),
            rows: session.rows(),
            merged: session.merged(),
            segments,
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match session.rows() {
        Some(rows) => {
            println!("Original / Modified");
            println!("===================");
            print!("{}", render::code_view(&segments, &rows, width));
        }
        None => {
            let (original, modified) = render::text_panes(&segments);
            println!("Original + Removed");
            println!("==================");
            println!("{}", original);
            println!();
            println!("Modified + Added");
            println!("================");
            println!("{}", modified);
        }
    }

    println!();
    println!("{}", render::stats_line(&stats));
    println!();
    println!("Merged Output");
    println!("=============");
    match session.mode() {
        Mode::Code => println!("{}", session.merged()),
        Mode::Text => print!("{}", render::numbered(&session.merged_lines())),
    }

    Ok(())
}

fn cmd_merge(settings: &Settings, args: &CompareArgs, output: Option<&Path>) -> anyhow::Result<()> {
    let mut session = open_session(settings, args)?;

    let changes: Vec<SegmentState> = session
        .snapshot()
        .into_iter()
        .filter(|s| s.kind.is_change())
        .collect();

    if changes.is_empty() {
        eprintln!("No differences found.");
    } else {
        let labels: Vec<String> = changes.iter().map(render::picker_label).collect();
        let defaults: Vec<bool> = changes.iter().map(|s| s.accepted).collect();

        let picked = dialoguer::MultiSelect::new()
            .with_prompt("Select the changes to keep (space toggles, enter confirms)")
            .items(&labels)
            .defaults(&defaults)
            .interact()?;

        for (index, change) in changes.iter().enumerate() {
            session.set(change.id, picked.contains(&index));
        }
        eprintln!("{}", render::stats_line(&session.stats()));
    }

    let merged = session.merged();
    match output {
        Some(path) => {
            std::fs::write(path, &merged)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Merged output written to {}", path.display());
        }
        None => println!("{}", merged),
    }

    Ok(())
}

#[cfg(feature = "http")]
async fn cmd_serve(settings: &Settings, port: Option<u16>) -> anyhow::Result<()> {
    let mut http_settings = settings.http.clone();
    if let Some(port) = port {
        http_settings.port = port;
    }

    tracing::info!("Starting mergepad API...");
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let server = mergepad_http::HttpServer::new(http_settings.clone(), settings.engine);
    let rx = shutdown_tx.subscribe();
    let handle = tokio::spawn(async move {
        if let Err(e) = server.start(rx).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    println!("mergepad API: http://0.0.0.0:{}", http_settings.port);
    println!("Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    let _ = shutdown_tx.send(());
    handle.await?;
    tracing::info!("mergepad API stopped");

    Ok(())
}

fn cmd_config(cli: &Cli, settings: &Settings, action: &ConfigAction) -> anyhow::Result<()> {
    let path = settings_path(cli);
    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                eprintln!(
                    "Settings already exist at {} (use --force to overwrite)",
                    path.display()
                );
                return Ok(());
            }
            Settings::default().save(&path)?;
            println!("Configuration saved to {}", path.display());
        }
        ConfigAction::Show => {
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(settings)?);
        }
    }
    Ok(())
}
