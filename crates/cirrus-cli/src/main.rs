//! cirrus - terminal client for the cloud architecture agents

mod commands;
mod config;
mod ui;
mod utils;

use anyhow::Context;
use cirrus_api::ApiClient;
use cirrus_session::{AgentRegistry, HttpTransport, Session, SessionHandle, SessionOutcome};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// cirrus - design and deploy cloud architectures by chatting with agents
#[derive(Parser, Debug)]
#[command(name = "cirrus")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL (default: http://localhost:8000/api)
    #[arg(long)]
    base_url: Option<String>,

    /// Run in non-interactive mode with a single message
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Attach files before the first message
    #[arg(long, num_args = 1..)]
    attach: Vec<PathBuf>,

    /// Description for the attached files
    #[arg(long, requires = "attach")]
    description: Option<String>,

    /// Check backend health and exit
    #[arg(long)]
    health: bool,

    /// Print the backend's cloud resources and exit
    #[arg(long)]
    resources: bool,

    /// Abort a reply that streams longer than this many seconds
    #[arg(long)]
    max_session_secs: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("cirrus=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let base_url = cfg.base_url(args.base_url.as_deref());
    let client = ApiClient::new(base_url)?;

    if args.health {
        return show_health(&client).await;
    }
    if args.resources {
        return show_resources(&client).await;
    }

    let time_limit = args
        .max_session_secs
        .or(cfg.max_session_secs)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    let transport = Arc::new(HttpTransport::new(client));
    let mut session = Session::new(AgentRegistry::default_fleet(), transport);
    info!(session_id = %session.id(), "Session created");

    let (finished_tx, mut finished) = mpsc::unbounded_channel();
    tokio::spawn(ui::run(
        session.subscribe(),
        ui::Renderer::new(cfg.show_agents.unwrap_or(true)),
        finished_tx,
    ));
    spawn_interrupt_handler(session.handle());

    if !args.attach.is_empty() {
        attach(&mut session, &args.attach, args.description.as_deref())?;
    }

    // Non-interactive mode
    if let Some(command) = args.command {
        println!("cirrus> {}", command);
        println!();
        let outcome = send(&mut session, &command, time_limit, &mut finished).await?;
        if matches!(outcome, SessionOutcome::Failed { .. }) {
            std::process::exit(1);
        }
        return Ok(());
    }

    run_interactive(&mut session, time_limit, &mut finished).await
}

async fn show_health(client: &ApiClient) -> anyhow::Result<()> {
    let health = client
        .health()
        .await
        .with_context(|| format!("Backend at {} is unreachable", client.base_url()))?;
    match &health.service {
        Some(service) => println!("{}: {}", service, health.status),
        None => println!("{}", health.status),
    }
    if !health.is_healthy() {
        std::process::exit(1);
    }
    Ok(())
}

async fn show_resources(client: &ApiClient) -> anyhow::Result<()> {
    let resources = client.resources().await?;
    println!("{}", serde_json::to_string_pretty(&resources)?);
    Ok(())
}

/// Ctrl-C stops the running reply; at the prompt it exits.
fn spawn_interrupt_handler(handle: SessionHandle) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if handle.is_processing() {
                info!("Interrupted; aborting reply");
                handle.abort();
            } else {
                println!();
                std::process::exit(130);
            }
        }
    });
}

fn attach(session: &mut Session, paths: &[PathBuf], description: Option<&str>) -> anyhow::Result<()> {
    let files = utils::file_infos(paths)?;
    for file in &files {
        println!("attaching {} ({})", file.name, utils::format_size(file.size));
    }
    session.attach_files(&files, description)?;
    Ok(())
}

/// Submit one message and wait until its output has been printed.
async fn send(
    session: &mut Session,
    text: &str,
    time_limit: Option<Duration>,
    finished: &mut mpsc::UnboundedReceiver<SessionOutcome>,
) -> anyhow::Result<SessionOutcome> {
    let watchdog = time_limit.map(|limit| {
        let handle = session.handle();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            warn!(secs = limit.as_secs(), "Reply exceeded time limit; aborting");
            handle.abort();
        })
    });

    let outcome = session.submit(text).await;
    if let Some(watchdog) = watchdog {
        watchdog.abort();
    }
    let outcome = outcome?;

    // The renderer reports back once the run's last event is on screen
    if tokio::time::timeout(Duration::from_secs(2), finished.recv())
        .await
        .is_err()
    {
        warn!("Renderer did not report the end of the reply");
    }
    Ok(outcome)
}

async fn run_interactive(
    session: &mut Session,
    time_limit: Option<Duration>,
    finished: &mut mpsc::UnboundedReceiver<SessionOutcome>,
) -> anyhow::Result<()> {
    // Show minimal startup info (only if TTY)
    if io::IsTerminal::is_terminal(&io::stderr()) {
        let id = session.id().to_string();
        eprintln!("cirrus session {} (/help for commands)", &id[..8]);
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::execute_command(input, session.state()) {
            match result {
                commands::CommandResult::Message(msg) => println!("{}", msg),
                commands::CommandResult::Attach(paths) => {
                    if let Err(e) = attach(session, &paths, None) {
                        eprintln!("Error: {:#}", e);
                    }
                }
                commands::CommandResult::Exit => break,
                commands::CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            continue;
        }

        send(session, input, time_limit, finished).await?;
    }

    Ok(())
}
