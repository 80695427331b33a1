use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use shoal_auth::{
    authorization_url, exchange_code_default, wait_for_callback, StoredToken, TokenStore,
    DEFAULT_SCOPES,
};
use shoal_core::{load_config, AppConfig, AutomationAgent};
use shoal_linkedin::RestLinkedIn;
use shoal_provider::OpenAiCompatProvider;
use shoal_scheduler::SessionScheduler;
use shoal_schema::SessionStats;

#[derive(Parser)]
#[command(name = "shoal", version, about = "LinkedIn posting and engagement automation")]
struct Cli {
    #[arg(
        long,
        default_value = "~/.shoal",
        help = "Config root directory (contains config.yaml, logs/ and data/)"
    )]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the scheduler loop; sessions fire on configured posting days")]
    Start,
    #[command(about = "Run one full session now (engage, post, engage)")]
    Run,
    #[command(about = "Run a single engagement phase now")]
    Engage {
        #[arg(long, default_value = "pre_posting", help = "Phase label for logs")]
        phase: String,
        #[arg(long, default_value = "30", help = "Session window in minutes")]
        minutes: u64,
    },
    #[command(about = "Generate and publish one post now")]
    Post {
        #[arg(long, help = "Topic override; defaults to the weekly rotation")]
        topic: Option<String>,
    },
    #[command(about = "Show next scheduled run and recent session history")]
    Status,
    #[command(about = "Validate config files")]
    Validate,
    #[command(subcommand, about = "LinkedIn OAuth management")]
    Auth(AuthCommands),
}

#[derive(Subcommand)]
enum AuthCommands {
    #[command(about = "Run the OAuth flow in a browser and save the access token")]
    Login {
        #[arg(long, default_value = "8083", help = "Local callback port")]
        port: u16,
    },
    #[command(about = "Show the saved access token status")]
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Expand ~ to home directory
    if cli.config_root.starts_with("~") {
        if let Some(home) = std::env::var_os("HOME") {
            cli.config_root = PathBuf::from(home).join(
                cli.config_root
                    .strip_prefix("~")
                    .unwrap_or(&cli.config_root),
            );
        }
    }

    let log_dir = cli.config_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "shoal.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Validate => {
            let config = load_config(&cli.config_root)?;
            config.validate()?;
            println!(
                "Config valid. {} topics, posting {} at {} ({}).",
                config.topics.len(),
                config.schedule.post_days.join("/"),
                config.schedule.post_time,
                config.schedule.timezone,
            );
        }
        Commands::Start => {
            let config = load_with_validation(&cli.config_root)?;
            let mut agent = build_agent(&cli.config_root, &config)?;
            let mut scheduler = SessionScheduler::new(
                config.posting_schedule()?,
                &cli.config_root.join("data"),
            )?;
            if let Some(next) = scheduler.next_run() {
                println!("Next scheduled session: {next}");
            }
            let cancel = shutdown_token();
            agent.run_scheduled(&mut scheduler, &cancel).await?;
        }
        Commands::Run => {
            let config = load_with_validation(&cli.config_root)?;
            let mut agent = build_agent(&cli.config_root, &config)?;
            let cancel = shutdown_token();
            let summary = agent.run_full_session(&cancel).await;
            print_stats("full session", &summary.stats);
            match (summary.posted, summary.post_error.as_deref()) {
                (true, _) => println!("Post published."),
                (false, Some(e)) => println!("Posting failed: {e}"),
                (false, None) => println!("Posting skipped."),
            }
        }
        Commands::Engage { phase, minutes } => {
            let config = load_with_validation(&cli.config_root)?;
            let mut agent = build_agent(&cli.config_root, &config)?;
            let cancel = shutdown_token();
            let stats = agent.run_engagement_phase(&phase, minutes, &cancel).await;
            print_stats(&phase, &stats);
        }
        Commands::Post { topic } => {
            let config = load_with_validation(&cli.config_root)?;
            let agent = build_agent(&cli.config_root, &config)?;
            agent.post_topic(topic.as_deref()).await?;
            println!("Post published.");
        }
        Commands::Status => {
            let config = load_with_validation(&cli.config_root)?;
            let scheduler = SessionScheduler::new(
                config.posting_schedule()?,
                &cli.config_root.join("data"),
            )?;
            match scheduler.next_run() {
                Some(next) => println!("Next scheduled session: {next}"),
                None => println!("No upcoming sessions."),
            }
            let runs = scheduler.recent_runs(5).await?;
            if runs.is_empty() {
                println!("No recorded sessions yet.");
            }
            for run in runs {
                println!(
                    "{}  {:?}  comments={} likes={} errors={}",
                    run.session_id, run.status, run.comments_made, run.likes_made, run.errors
                );
            }
        }
        Commands::Auth(auth) => handle_auth(&cli.config_root, auth).await?,
    }

    Ok(())
}

fn load_with_validation(config_root: &PathBuf) -> Result<AppConfig> {
    let config = load_config(config_root)?;
    config.validate()?;
    Ok(config)
}

fn build_agent(config_root: &PathBuf, config: &AppConfig) -> Result<AutomationAgent> {
    let access_token = resolve_access_token(config, config_root)?;
    let linkedin = Arc::new(RestLinkedIn::new(
        access_token,
        config.linkedin.requests_per_hour,
    ));
    let provider = Arc::new(OpenAiCompatProvider::new(
        config.provider.base_url.clone(),
        config.provider.api_key.clone().unwrap_or_else(|| "ollama".into()),
        config.provider.model.clone(),
        config.provider.requests_per_hour,
    ));
    Ok(AutomationAgent::new(config.clone(), linkedin, provider))
}

/// Prefer the configured token, fall back to the one saved by `auth login`.
fn resolve_access_token(config: &AppConfig, config_root: &PathBuf) -> Result<String> {
    if !config.linkedin.access_token.is_empty() {
        return Ok(config.linkedin.access_token.clone());
    }
    let store = TokenStore::new(config_root);
    if let Some(token) = store.load()? {
        if token.is_expired() {
            tracing::warn!("saved access token is past its expiry; re-run `shoal auth login`");
        }
        return Ok(token.access_token);
    }
    bail!(
        "no LinkedIn access token available; set linkedin.access_token in config.yaml \
         or run `shoal auth login`"
    )
}

fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested, finishing at the next safe point");
            trigger.cancel();
        }
    });
    cancel
}

fn print_stats(label: &str, stats: &SessionStats) {
    println!(
        "{label}: {} comments, {} likes, {} errors ({} total engagements)",
        stats.comments_made,
        stats.likes_made,
        stats.errors,
        stats.total()
    );
}

async fn handle_auth(config_root: &PathBuf, command: AuthCommands) -> Result<()> {
    match command {
        AuthCommands::Login { port } => {
            let config = load_config(config_root)?;
            if config.linkedin.client_id.is_empty() || config.linkedin.client_secret.is_empty() {
                bail!("auth login needs linkedin.client_id and linkedin.client_secret in config.yaml");
            }

            let state = format!("shoal-{}", uuid::Uuid::new_v4());
            let redirect_uri = format!("http://localhost:{port}/auth/linkedin/callback");
            let url = authorization_url(
                &config.linkedin.client_id,
                &redirect_uri,
                &state,
                DEFAULT_SCOPES,
            );
            println!("Open this URL to authorize:\n\n  {url}\n");
            if webbrowser::open(&url).is_err() {
                tracing::warn!("could not open a browser automatically");
            }

            let code = wait_for_callback(port, state).await?;
            let token = exchange_code_default(
                &reqwest::Client::new(),
                &config.linkedin.client_id,
                &config.linkedin.client_secret,
                &code,
                &redirect_uri,
            )
            .await
            .context("authorization code exchange failed")?;

            let store = TokenStore::new(config_root);
            store.save(&StoredToken::from_response(&token))?;
            println!("Access token saved to {}", store.path().display());
        }
        AuthCommands::Show => {
            let store = TokenStore::new(config_root);
            match store.load()? {
                Some(token) => {
                    let masked: String = token.access_token.chars().take(8).collect();
                    println!("Token: {masked}… (obtained {})", token.obtained_at);
                    match token.expires_at() {
                        Some(at) if token.is_expired() => println!("Status: expired at {at}"),
                        Some(at) => println!("Status: valid until {at}"),
                        None => println!("Status: no expiry recorded"),
                    }
                }
                None => println!("No saved token. Run `shoal auth login`."),
            }
        }
    }
    Ok(())
}
