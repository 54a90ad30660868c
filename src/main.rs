use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use shortener::{issue_token, migrate, serve, EnvConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(version, about, arg_required_else_help(true))]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the link shortener server
    Serve,

    /// Check if a server is running at localhost
    Ready,

    /// Apply database migrations, then exit
    Migrate,

    /// Issue an access token for an existing user
    IssueToken {
        /// Login of the user
        login: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::from_env("SHORTENER_LOG"))
        .init();

    match Cli::parse().command {
        Some(Command::Serve) => {
            info!("🔗 shortener v{VERSION}");
            serve().await?
        }
        Some(Command::Ready) => {
            let env_config = EnvConfig::load()?;
            reqwest::Client::new()
                .get(format!(
                    "http://localhost:{}/health/readiness",
                    env_config.health_port
                ))
                .send()
                .await?
                .error_for_status()?;
        }
        Some(Command::Migrate) => migrate().await?,
        Some(Command::IssueToken { login }) => {
            println!("{}", issue_token(&login).await?);
        }
        None => {}
    }

    Ok(())
}
