//! Photocard CLI
//!
//! Command-line interface for the photocard editor core.

use anyhow::Context;
use clap::Parser;
use log::info;
use tracing_subscriber::{fmt, EnvFilter};

use photocard::cli::{commands, Cli, Commands};
use photocard::config::EditorConfig;
use photocard::PhotocardError;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        if let Some(suggestion) = e
            .downcast_ref::<PhotocardError>()
            .and_then(PhotocardError::recovery_suggestion)
        {
            eprintln!("Hint: {}", suggestion);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Photocard v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Some(cmd) => handle_command(cmd, &config)?,
        None => {
            println!("Photocard v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
        }
    }
    Ok(())
}

fn handle_command(cmd: Commands, config: &EditorConfig) -> photocard::Result<()> {
    match cmd {
        Commands::ImportPsd { file, out } => commands::import_psd(&file, &out, config),
        Commands::Validate { template } => commands::validate(&template),
        Commands::Templates { dir } => commands::list_templates(&dir),
        Commands::CreateWork {
            store,
            template,
            title,
        } => commands::create_work(&store, &template, &title),
        Commands::ListWorks { store } => commands::list_works(&store),
        Commands::Edit { store, work, ops } => commands::edit(&store, &work, &ops, config),
        Commands::Render { store, work, out } => commands::render(&store, &work, &out),
        Commands::PrintState { store, work } => commands::print_state(&store, &work),
    }
}
