mod bot_commands;
mod config_commands;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "pineapple", about = "Pineapple: Markov chat bot for Matrix")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/pineapple/).
    #[arg(long, global = true, env = "PINEAPPLE_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
    /// Custom data directory holding the room logs (overrides `data.dir`).
    #[arg(long, global = true, env = "PINEAPPLE_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the configured accounts and answer messages (default).
    Run,
    /// Load the room logs and print one reply to a message.
    Reply {
        #[arg(short, long)]
        message: String,
    },
    /// Load the room logs and print what the chain has learned.
    Stats,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "pineapple starting");

    // Apply directory overrides before loading config
    if let Some(ref dir) = cli.config_dir {
        pineapple_config::set_config_dir(dir.clone());
    }
    if let Some(ref dir) = cli.data_dir {
        pineapple_config::set_data_dir(dir.clone());
    }

    match cli.command {
        // Default: run the bot when no subcommand is provided
        None | Some(Commands::Run) => {
            let config = pineapple_config::discover_and_load()?;
            bot_commands::run(config).await
        },
        Some(Commands::Reply { message }) => {
            let config = pineapple_config::discover_and_load()?;
            bot_commands::reply(config, &message).await
        },
        Some(Commands::Stats) => {
            let config = pineapple_config::discover_and_load()?;
            bot_commands::stats(config).await
        },
        Some(Commands::Config { action }) => config_commands::handle_config(action).await,
    }
}
