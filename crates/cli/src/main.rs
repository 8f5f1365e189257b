//! GameScout CLI - browse the RAWG catalog and manage favorites from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Popular games, second page
//! gamescout popular --page 2
//!
//! # Search and details
//! gamescout search "witcher"
//! gamescout game 3328
//!
//! # Browse with filters
//! gamescout browse --genre 4 --year 2015 --sort newest
//!
//! # Account commands sign in first on every run
//! gamescout account favorites -e ann@example.com -p hunter22
//! gamescout account favorite-add 3328 -e ann@example.com -p hunter22
//! ```
//!
//! # Environment Variables
//!
//! - `RAWG_API_KEY` - catalog API key; without it the catalog may fall back to mock data
//! - `FIREBASE_API_KEY`, `FIREBASE_PROJECT_ID` - required by `account` commands
//! - `RUST_LOG` - log filter, defaults to `gamescout_cli=info,gamescout_client=info`

use clap::{Args, Parser, Subcommand};
use gamescout_client::Config;
use gamescout_core::GameId;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "gamescout")]
#[command(author, version, about = "Discover games from the RAWG catalog")]
struct Cli {
    /// Print raw records as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Highest rated games
    Popular {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Search games by title
    Search {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Details and screenshots of one game
    Game { id: GameId },
    /// Screenshots of one game
    Screenshots { id: GameId },
    /// Catalog genres
    Genres,
    /// Filtered listing, as on the browse page
    Browse {
        /// Genre id (see `gamescout genres`)
        #[arg(short, long)]
        genre: Option<u64>,
        /// Release year
        #[arg(short, long)]
        year: Option<i32>,
        /// Sort key: rating, metacritic, newest, oldest, a-z, z-a
        #[arg(short, long, default_value = "rating", allow_hyphen_values = true)]
        sort: String,
        /// Load pages up to and including this one
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Games releasing within the next year
    Upcoming {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Best rated games of a year
    Best {
        /// Defaults to the current year
        #[arg(short, long)]
        year: Option<i32>,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Resolve an application path such as `/search?q=portal`
    Route { path: String },
    /// Account, favorites and history (needs Firebase settings)
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Manage gamescout.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// How an account command signs in
#[derive(Args, Clone)]
pub struct Credentials {
    #[arg(short, long)]
    pub email: Option<String>,

    #[arg(short, long)]
    pub password: Option<String>,

    /// Google OAuth ID token, instead of email and password
    #[arg(long, conflicts_with_all = ["email", "password"])]
    pub google_token: Option<String>,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Create an account and its profile
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// Sign in and show the profile
    Login {
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Email a password reset link
    ResetPassword {
        #[arg(short, long)]
        email: String,
    },
    /// List favorite games
    Favorites {
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Add a game to favorites
    FavoriteAdd {
        id: GameId,
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Remove a game from favorites
    FavoriteRemove {
        id: GameId,
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Open a game's details and record the view in the history
    View {
        id: GameId,
        #[command(flatten)]
        credentials: Credentials,
    },
    /// List recently viewed games
    History {
        #[command(flatten)]
        credentials: Credentials,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a gamescout.toml with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings, secrets masked
    Show,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr so `--json` output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gamescout_cli=info,gamescout_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    if let Commands::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init { force } => commands::config::init(*force),
            ConfigAction::Show => commands::config::show(&Config::load()),
        };
    }

    let config = Config::load();
    match cli.command {
        Commands::Popular { page } => commands::catalog::popular(&config, page, json).await?,
        Commands::Search { query, page } => {
            commands::catalog::search(&config, &query, page, json).await?
        }
        Commands::Game { id } => commands::catalog::game(&config, id, json).await?,
        Commands::Screenshots { id } => commands::catalog::screenshots(&config, id, json).await?,
        Commands::Genres => commands::catalog::genres(&config, json).await?,
        Commands::Browse {
            genre,
            year,
            sort,
            page,
        } => commands::catalog::browse(&config, genre, year, &sort, page, json).await?,
        Commands::Upcoming { page } => commands::catalog::upcoming(&config, page, json).await?,
        Commands::Best { year, page } => commands::catalog::best(&config, year, page, json).await?,
        Commands::Route { path } => commands::catalog::route(&path)?,
        Commands::Account { action } => {
            let account = commands::account::Account::connect(&config)?;
            let result = match action {
                AccountAction::Register {
                    email,
                    password,
                    name,
                } => account.register(&email, &password, &name, json).await,
                AccountAction::Login { credentials } => account.login(&credentials, json).await,
                AccountAction::ResetPassword { email } => account.reset_password(&email).await,
                AccountAction::Favorites { credentials } => {
                    account.favorites(&credentials, json).await
                }
                AccountAction::FavoriteAdd { id, credentials } => {
                    account.set_favorite(&credentials, id, true).await
                }
                AccountAction::FavoriteRemove { id, credentials } => {
                    account.set_favorite(&credentials, id, false).await
                }
                AccountAction::View { id, credentials } => {
                    account.view(&credentials, id, json).await
                }
                AccountAction::History { credentials } => account.history(&credentials, json).await,
            };
            account.close();
            result?
        }
        Commands::Config { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_browse_accepts_catalog_sort_keys() {
        let cli = Cli::try_parse_from(["gamescout", "browse", "--sort", "-released", "-g", "4"])
            .expect("parse");
        match cli.command {
            Commands::Browse { sort, genre, page, .. } => {
                assert_eq!(sort, "-released");
                assert_eq!(genre, Some(4));
                assert_eq!(page, 1);
            }
            _ => panic!("expected browse"),
        }
    }

    #[test]
    fn test_google_token_excludes_password() {
        let parsed = Cli::try_parse_from([
            "gamescout",
            "account",
            "login",
            "--google-token",
            "abc",
            "--password",
            "hunter22",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_json_flag_is_global() {
        let cli = Cli::try_parse_from(["gamescout", "genres", "--json"]).expect("parse");
        assert!(cli.json);
    }
}
