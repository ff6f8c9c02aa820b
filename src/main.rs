//! Binary entrypoint for the RPG Master CLI.
//!
//! Commands:
//! - `start` - validate config, check the bot token, open the store and serve commands
//!   typed on the console until Ctrl-C or EOF
//! - `init` - write a starter `config.toml`
//! - `status` - print row counts from the campaign database
//! - `roll <expr>` - roll dice once and print the breakdown
//!
//! See the library crate docs for module-level details: `rpgmaster::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};

use rpgmaster::bot::{spawn_console, BotServer};
use rpgmaster::config::Config;
use rpgmaster::dice::{roll_expression, RandomRoller};
use rpgmaster::logutil::init_logging;
use rpgmaster::storage::CampaignStore;

#[derive(Parser)]
#[command(name = "rpgmaster")]
#[command(about = "A tabletop RPG game master bot: dice, character sheets, combat helpers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot with the console transport
    Start,
    /// Write a default configuration file
    Init,
    /// Show campaign database statistics
    Status,
    /// Roll a dice expression such as 2d6+3
    Roll {
        expression: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(pre_config.as_ref().map(|c| &c.logging), cli.verbose);

    match cli.command {
        Commands::Start => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            if let Err(e) = config.validate().and_then(|_| config.resolve_token().map(|_| ())) {
                error!("{e}");
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            info!("Starting RPG Master v{}", env!("CARGO_PKG_VERSION"));
            let (inbound, outbound, writer) = spawn_console(&config.console);
            let prefix = config.bot.command_prefix.clone();
            let server = BotServer::new(config).await?;
            println!("Ready. Type {prefix}help for commands, Ctrl-D to quit.");
            server.run(inbound, outbound).await?;
            drop(server);
            let _ = writer.await;
            // stdin is read on a blocking thread that would keep the runtime alive
            std::process::exit(0);
        }
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            println!("Wrote {}", cli.config);
        }
        Commands::Status => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let store = CampaignStore::open(config.storage.db_path()).await?;
            let stats = store.stats().await?;
            println!("RPG Master Status:");
            println!("  Database: {}", store.path().display());
            println!("  Character sheets: {}", stats.sheets);
            println!(
                "  Sessions: {} ({} active)",
                stats.sessions, stats.active_sessions
            );
            println!("  Combat trackers: {}", stats.combat_trackers);
        }
        Commands::Roll { expression } => {
            let limits = pre_config
                .map(|c| c.dice.limits())
                .unwrap_or_default();
            let mut dice = RandomRoller::from_entropy();
            match roll_expression(&expression, &limits, &mut dice) {
                Ok(roll) => {
                    let rolls: Vec<String> = roll.rolls.iter().map(u32::to_string).collect();
                    println!("{}: [{}] +{} = {}", roll.expr, rolls.join(", "), roll.modifier, roll.total);
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}
