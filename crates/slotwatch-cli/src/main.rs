//! slotwatch: poll a captured checkout page for delivery windows.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use slotwatch::{
    build_request, find_checkout_request, Archive, CheckResult, OutboundRequest, PollSession,
    Poller, Scraper, ThrottleState, CHECKOUT_URL,
};
use slotwatch_cli::config::{resolve_har_path, Settings, WatchSettings};
use slotwatch_cli::LogNotifier;

#[derive(Parser)]
#[command(
    name = "slotwatch",
    about = "Replay a captured checkout request and watch for delivery windows",
    version
)]
struct Cli {
    /// Path to the .har capture (default: $SLOTWATCH_HAR, then ./checkout.har).
    #[arg(long, global = true)]
    har: Option<String>,

    /// URL substring that identifies the checkout request.
    #[arg(long = "match", global = true, default_value = CHECKOUT_URL)]
    url_match: String,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    /// Write every fetched page to this file.
    #[arg(long, global = true)]
    dump_html: Option<PathBuf>,

    /// CSS selector for window labels, if the page layout differs.
    #[arg(long, global = true)]
    selector: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the request that would be replayed.
    Inspect,

    /// Fetch the checkout page once and print its delivery windows.
    Check,

    /// Poll until interrupted, notifying when windows appear.
    Watch {
        /// Notification recipient (default: $SLOTWATCH_RECIPIENT).
        #[arg(long)]
        to: Option<String>,

        /// Seconds between checks (default: $SLOTWATCH_INTERVAL_SECS, then 300).
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Availability messages before notifications are snoozed.
        #[arg(long)]
        max_notifications: Option<u32>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   slotwatch completions bash > ~/.local/share/bash-completion/completions/slotwatch
    ///   slotwatch completions zsh > ~/.zfunc/_slotwatch
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings {
        har_path: resolve_har_path(cli.har.as_deref()),
        url_match: cli.url_match.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
        dump_html: cli.dump_html.clone(),
    };

    match cli.command {
        Commands::Inspect => {
            let archive = load_archive(&settings)?;
            let source = find_checkout_request(&archive, &settings.url_match)?;
            let request = build_request(source)?;
            println!("Archive: {}", settings.har_path.display());
            println!("  Entries: {}", archive.len());
            println!("  Matched: {} {}", source.method, source.url);
            println!("  Replays: {} {}", request.method(), request.target_url());
            println!(
                "  Headers: {} captured, {} sent",
                request.headers().len(),
                request.header_map().len()
            );
            println!("  Query params: {}", request.query().len());
            println!("  Cookies (not sent): {}", source.cookies.len());
        }

        Commands::Check => {
            let request = load_request(&settings)?;
            let poller = build_poller(
                &settings,
                slotwatch::poller::DEFAULT_INTERVAL,
                cli.selector.as_deref(),
            )?;
            let result = poller.check_once(&request).await?;
            print_result(&result);
        }

        Commands::Watch {
            to,
            interval_secs,
            max_notifications,
        } => {
            let watch = WatchSettings::resolve(to.as_deref(), interval_secs, max_notifications)?;
            let request = load_request(&settings)?;
            let poller = build_poller(&settings, watch.interval, cli.selector.as_deref())?;

            let mut session = PollSession::new(
                poller,
                request,
                watch.recipient,
                LogNotifier::new(),
                ThrottleState::new(watch.quota),
            );
            session.start();

            if let Some(cancel) = session.cancel_handle() {
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("Interrupted, stopping watch");
                        cancel.cancel();
                    }
                });
            }

            session.run(print_result).await?;
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "slotwatch", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn load_archive(settings: &Settings) -> anyhow::Result<Archive> {
    Archive::load(&settings.har_path)
        .with_context(|| format!("could not load archive {}", settings.har_path.display()))
}

fn load_request(settings: &Settings) -> anyhow::Result<OutboundRequest> {
    let archive = load_archive(settings)?;
    let source = find_checkout_request(&archive, &settings.url_match)?;
    Ok(build_request(source)?)
}

fn build_poller(
    settings: &Settings,
    interval: Duration,
    selector: Option<&str>,
) -> anyhow::Result<Poller> {
    let poller =
        Poller::new(settings.poller_config(interval)).context("could not build HTTP client")?;
    Ok(match selector {
        Some(sel) => poller.with_scraper(Scraper::new(sel)?),
        None => poller,
    })
}

fn print_result(result: &CheckResult) {
    let at = result.checked_at.format("%H:%M:%S");
    if result.is_empty() {
        println!("[{at}] No delivery windows");
        return;
    }
    println!("[{at}] {} delivery window(s):", result.len());
    for window in &result.windows {
        println!("  - {window}");
    }
}
