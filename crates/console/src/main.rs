//! Command-line front end for the console client core.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use cardkey_console::{Console, ConsoleConfig, LoginRequest};
use cardkey_observability::LogFormat;

#[derive(Parser)]
#[command(name = "cardkey-console")]
#[command(about = "Card key administration console client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the API base URL
    #[arg(long)]
    api: Option<String>,

    /// Emit JSON log lines instead of compact text
    #[arg(long)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        username: String,

        /// Password; read from CARDKEY_PASSWORD when omitted
        #[arg(short, long)]
        password: Option<String>,

        /// Application key to sign in to
        #[arg(long, default_value = "")]
        app_key: String,

        /// Device identifier reported to the server
        #[arg(long, default_value = "")]
        device_id: String,
    },

    /// Refresh and show the signed-in identity
    Whoami,

    /// Sign out and forget the stored session
    Logout,

    /// Print the navigation menu for the signed-in role
    Menu,

    /// Resolve a location the way the console would navigate to it
    Navigate { path: String },

    /// List applications open for sign-in
    Apps,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.log_json {
        cardkey_observability::init();
    } else {
        cardkey_observability::tracing::init(LogFormat::Pretty, "warn");
    }

    let mut config = ConsoleConfig::from_env();
    if let Some(api) = cli.api {
        config.api_base_url = api.trim_end_matches('/').to_string();
    }
    let console = Console::open(config)?;

    match cli.command {
        Commands::Login {
            username,
            password,
            app_key,
            device_id,
        } => {
            let password = match password {
                Some(p) => p,
                None => std::env::var("CARDKEY_PASSWORD")
                    .context("no --password given and CARDKEY_PASSWORD is not set")?,
            };
            let resp = console
                .login(&LoginRequest {
                    username,
                    password,
                    app_key,
                    device_id,
                })
                .await
                .context("sign-in failed")?;
            print_json(&json!({
                "username": resp.username,
                "role": resp.role,
                "user_status": resp.user_status,
                "has_card": resp.has_card,
            }))?;
        }
        Commands::Whoami => {
            anyhow::ensure!(console.session().is_authenticated(), "not signed in");
            console
                .session()
                .refresh_identity(console.auth())
                .await
                .context("failed to fetch current user")?;
            let identity = console.session().snapshot();
            print_json(&json!({
                "username": identity.username(),
                "role": identity.role(),
                "account_status": identity.account_status(),
                "has_bound_license": identity.has_bound_license(),
            }))?;
        }
        Commands::Logout => {
            console.logout().await;
            tracing::info!("signed out");
        }
        Commands::Menu => print_json(&console.menu())?,
        Commands::Navigate { path } => {
            let location = console.navigate(&path).await?;
            print_json(&json!({
                "path": location.path,
                "full_path": location.full_path,
                "name": location.name,
                "title": location.title,
            }))?;
        }
        Commands::Apps => {
            let apps = console
                .auth()
                .public_apps()
                .await
                .context("failed to list applications")?;
            print_json(&apps)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
