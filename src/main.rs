use anyhow::Context;
use blockinho::reconciler::resolve_pause_duration;
use blockinho::{BlockingState, ListKind, PanelClient, PanelConfig, Reconciler, pattern, server};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockinho")]
#[command(about = "Control panel for a DNS blocking service", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Directory holding the allow/deny list files
    #[arg(long, env = "CONFIG_DIR", default_value = ".")]
    config_dir: PathBuf,

    /// Base URL of the blocking service
    #[arg(long, env = "BLOCKY_URL", default_value = "http://localhost:4000")]
    upstream: String,

    /// Address the panel server listens on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    listen: SocketAddr,

    /// Base URL of a running panel, used by the client commands
    #[arg(long, env = "PANEL_URL", default_value = "http://localhost:3000")]
    panel: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Show whether blocking is on
    Status,
    /// Disable blocking if it is on, enable it otherwise
    Toggle,
    /// Pause blocking for a duration ("5m", "30m" or e.g. "90s")
    Pause {
        #[arg(default_value = "5m")]
        duration: String,
    },
    /// Ask the blocking service to reload its lists
    Refresh,
    /// Print the pattern lists
    Lists {
        /// Only print this list
        kind: Option<ListKind>,
    },
    /// Add a pattern to a list and reload the blocking service
    Add {
        kind: ListKind,
        pattern: String,
        /// Submit even if the pattern does not look like a domain or /regex/
        #[arg(long)]
        force: bool,
    },
    /// Follow a running pause countdown
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let config =
                PanelConfig::new(args.config_dir, args.upstream).with_listen(args.listen);
            server::serve(&config)
                .await
                .context("panel server failed")?;
        }
        command => run_client(&args.panel, command).await?,
    }

    Ok(())
}

/// Runs one presentation-side command against a panel at `panel`.
async fn run_client(panel: &str, command: Command) -> anyhow::Result<()> {
    let mut reconciler = Reconciler::new(PanelClient::new(panel)?);

    match command {
        Command::Status | Command::Serve => {
            reconciler.fetch_status().await?;
            print_status(&reconciler);
        }
        Command::Toggle => {
            reconciler.fetch_status().await?;
            reconciler.toggle_blocking().await?;
            print_status(&reconciler);
        }
        Command::Pause { duration } => {
            reconciler.pause(resolve_pause_duration(&duration)).await?;
            print_status(&reconciler);
        }
        Command::Refresh => {
            reconciler.refresh().await?;
            print_status(&reconciler);
        }
        Command::Lists { kind } => {
            let lists = reconciler.control().lists().await?;
            for kind in kind.map_or(ListKind::ALL.to_vec(), |k| vec![k]) {
                println!("[{kind}]");
                for pattern in lists.get(kind) {
                    println!("{pattern}");
                }
            }
        }
        Command::Add {
            kind,
            pattern,
            force,
        } => {
            let pattern = if force {
                pattern.trim()
            } else {
                pattern::validate(&pattern)?
            };
            let lists = reconciler.control().add_pattern(kind, pattern).await?;
            reconciler.refresh().await?;
            println!("{kind}: {} pattern(s)", lists.get(kind).len());
        }
        Command::Watch => {
            reconciler.fetch_status().await?;
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tokio::signal::ctrl_c() => break,
                }
                println!("{}", reconciler.label());
                let running = matches!(
                    reconciler.state(),
                    BlockingState::Paused(c) if c.is_running(Instant::now())
                );
                if !running {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn print_status<C: blockinho::BlockingControl>(reconciler: &Reconciler<C>) {
    println!("{}", reconciler.label());
    if !reconciler.disabled_groups().is_empty() {
        println!("disabled groups: {}", reconciler.disabled_groups().join(", "));
    }
}
