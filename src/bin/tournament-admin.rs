//! Operator commands that bypass the web login.

#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use eyre::WrapErr;
use log::warn;
use secrecy::SecretString;
use tournament::{config::StorageConfig, models::Role, App, Config};

#[derive(Parser)]
#[command(name = "tournament-admin", version, about = "Manage tournament accounts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account, the only way to create an admin
    Register {
        username: String,
        password: String,
        #[arg(long, default_value_t = Role::Angler)]
        role: Role,
    },
    /// Change the role of an existing account
    SetRole { username: String, role: Role },
    /// Print the standings of a division
    Leaderboard {
        division: String,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    pretty_env_logger::init_timed();
    dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load().wrap_err("Could not load configuration")?;
    if config.storage == StorageConfig::Memory {
        warn!("Storage is in-memory, changes are lost when this command exits");
    }

    let app = App::init(config)
        .await
        .wrap_err("Could not open tournament")?;

    match cli.command {
        Command::Register {
            username,
            password,
            role,
        } => {
            let user = app
                .identity
                .register(&username, &SecretString::new(password), role)
                .await?;
            println!("Registered {} as {}", user.username, user.role);
        }
        Command::SetRole { username, role } => {
            let user = app.identity.grant_role(&username, role).await?;
            println!("{} is now {}", user.username, user.role);
        }
        Command::Leaderboard { division, limit } => {
            let entries = app
                .catches
                .leaderboard(&division, limit.or(app.config.leaderboard_limit))
                .await?;
            if entries.is_empty() {
                println!("No catches in {division}");
            }
            for entry in entries {
                println!(
                    "{:>3}. {:<20} {:<20} {:>8.2} lbs  {}",
                    entry.rank, entry.user, entry.species, entry.display_weight, entry.date
                );
            }
        }
    }

    Ok(())
}
