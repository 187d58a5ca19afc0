use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tier_board::api::{build_router, state::AppState};
use tier_board::calculate::{mini_game_tier_list, search, RankingEngine, TierListEntry};
use tier_board::config::AppConfig;
use tier_board::live::LiveFeed;
use tier_board::seed::{read_seed_file, seed_players};

#[derive(Parser)]
#[command(name = "tier-board")]
#[command(about = "Minecraft PvP tier list and leaderboard server")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the overall leaderboard, or one mini-game's tier list
    Rank {
        /// Only show players whose username contains this
        #[arg(long)]
        search: Option<String>,

        /// Show the tier list for this mini-game instead
        #[arg(long)]
        mini_game: Option<String>,
    },

    /// Print the tier points table
    Tiers,

    /// Load players from a JSON array into the store
    Seed {
        /// Path to the seed file
        path: String,

        /// Validate and print without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&PathBuf::from(&cli.config))
        .with_context(|| format!("Failed to load config from {}", cli.config))?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(data_dir);
    }
    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting tier-board v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let store = config.open_store()?;
            tracing::info!(
                "Using {} store, polling every {:?}",
                store.name(),
                config.poll_interval()
            );
            if config.admin.token.is_none() {
                tracing::warn!("No admin token configured; admin API is disabled");
            }

            let state = AppState::from_config(&config, store)?;
            let app = build_router(state);
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Leaderboard: http://{}/api/leaderboard", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Rank { search: term, mini_game } => {
            let store = config.open_store()?;
            let engine = RankingEngine::new(Arc::new(config.catalog()?));
            let board = LiveFeed::fetch(store.as_ref(), &engine).await?;

            for rejected in &board.rejected {
                println!(
                    "! {} ({}): ignored {} tier {:?}: {}",
                    rejected.username,
                    rejected.player_id,
                    rejected.mini_game,
                    rejected.value,
                    rejected.reason
                );
            }

            if let Some(game) = mini_game {
                let list = mini_game_tier_list(engine.catalog(), &game, &board.players)?;
                println!("\n=== {} ({} players) ===", list.mini_game.name, list.player_count);
                for column in &list.columns {
                    println!("\nTier {}", column.numeric_tier);
                    for (heading, entries) in [
                        ("High", &column.high),
                        ("Low", &column.low),
                        ("Retired High", &column.retired_high),
                        ("Retired Low", &column.retired_low),
                    ] {
                        if !entries.is_empty() {
                            println!("  {:<13} {}", heading, names(entries));
                        }
                    }
                }
            } else {
                let resolver = engine.catalog().resolver();
                println!("\n{:>4}  {:<16} {:>6}  Tiers", "Rank", "Player", "Points");
                println!("{}", "-".repeat(60));
                for ranked in search(&board.players, term.as_deref().unwrap_or("")) {
                    let tiers: Vec<String> = ranked
                        .player
                        .tiers
                        .iter()
                        .map(|(game, &label)| {
                            format!("{}={}", game, resolver.format_abbreviation(Some(label)))
                        })
                        .collect();
                    println!(
                        "{:>4}  {:<16} {:>6}  {}",
                        ranked.overall_rank,
                        ranked.player.username,
                        ranked.player.total_points,
                        tiers.join(" ")
                    );
                }
            }
        }
        Commands::Tiers => {
            let catalog = config.catalog()?;
            println!("{:<6} {:<6} {:>6}  Display", "Key", "Badge", "Points");
            println!("{}", "-".repeat(40));
            for entry in catalog.resolver().entries() {
                println!(
                    "{:<6} {:<6} {:>6}  {}",
                    entry.key, entry.abbreviation, entry.points, entry.metadata.display_text
                );
            }

            println!("\nMini-games:");
            for game in catalog.mini_games() {
                println!("  {:<10} {}", game.id, game.name);
            }
        }
        Commands::Seed { path, dry_run } => {
            let store = config.open_store()?;
            let engine = RankingEngine::new(Arc::new(config.catalog()?));
            let entries = read_seed_file(&PathBuf::from(&path))
                .with_context(|| format!("Failed to read seed file {}", path))?;

            let report = seed_players(store.as_ref(), &engine, entries, dry_run).await?;

            println!("\n=== Seed Results ===");
            println!("Created:  {}", report.created);
            println!("Updated:  {}", report.updated);
            println!("Skipped:  {}", report.errors.len());
            for error in &report.errors {
                println!("  - {}", error);
            }
            if dry_run {
                println!("(dry run, nothing written)");
            }
        }
    }

    Ok(())
}

fn names(entries: &[TierListEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("#{} {}", e.overall_rank, e.username))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
