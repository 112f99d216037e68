use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;

use guildbot::infrastructure::adapters::ConsoleTransport;
use guildbot::infrastructure::storage::open_store;
use guildbot::{BotBuilder, BotError, Config};

#[derive(Parser)]
#[command(name = "guildbot")]
#[command(about = "A plugin-based chat bot core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Command prefix (overrides config)
    #[arg(short, long)]
    prefix: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on the console
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run_bot(&cli.config, cli.prefix) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("guildbot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            if let Err(e) = init_config() {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_config(config_path: &str) -> Config {
    if Path::new(config_path).exists() {
        match Config::load(config_path) {
            Ok(config) => config.with_env(),
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Config::load_env()
            }
        }
    } else {
        Config::load_env()
    }
}

fn run_bot(config_path: &str, prefix_override: Option<String>) -> Result<(), BotError> {
    let mut config = load_config(config_path);
    if let Some(prefix) = prefix_override {
        config.bot.prefix = prefix;
    }
    config.validate()?;
    tracing::info!("Starting {}", config.bot.name);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("failed to start runtime: {}", e)))?;

    rt.block_on(async {
        let store = open_store(&config.storage)?;
        let transport = Arc::new(ConsoleTransport::new(config.console.clone(), config.bot.name.clone()));
        let bot = BotBuilder::new(config)
            .transport(transport.clone())
            .store(store)
            .build()?;

        bot.listen().await?;
        println!("Type commands, e.g. {}help. Ctrl+D to quit.", bot.context().config().bot.prefix);

        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
            _ = transport.closed() => tracing::info!("Input closed"),
        }
        bot.shutdown().await
    })
}

fn init_config() -> Result<(), BotError> {
    let yaml = Config::default().to_yaml()?;
    println!("{}", yaml);
    Ok(())
}
