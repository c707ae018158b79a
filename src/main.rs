use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use access_gate::api::{self, AppState};
use access_gate::config::{self, Config};
use access_gate::gate::{AccessGate, DecisionOutcome, FilePayload};
use access_gate::models::access::AccessStatus;
use access_gate::poller::executor::ScriptExecutor;
use access_gate::poller::transport::HttpGateTransport;
use access_gate::poller::Poller;
use access_gate::store::json_file::JsonFileStore;
use access_gate::store::RecordStore;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout belongs to the released script in `poll`.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "access_gate=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Poll {
            email,
            url,
            interval,
            timeout,
            interpreter,
        }) => {
            let mut client = cfg.client;
            if let Some(url) = url {
                client.gate_url = url;
            }
            if let Some(secs) = interval {
                if secs == 0 {
                    anyhow::bail!("--interval must be greater than zero");
                }
                client.poll_interval = Duration::from_secs(secs);
            }
            if let Some(secs) = timeout {
                client.poll_timeout = Duration::from_secs(secs);
            }
            if let Some(interpreter) = interpreter {
                client.interpreter = interpreter;
            }
            run_poll(client, email).await
        }
        Some(cli::Commands::Access { command }) => handle_access_command(&cfg, command).await,
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:#}", e);
    }
    result
}

fn build_gate(cfg: &Config) -> AccessGate {
    AccessGate::new(
        Arc::new(JsonFileStore::new(&cfg.store_path)),
        Arc::new(FilePayload::new(&cfg.payload_path)),
    )
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    if tokio::fs::metadata(&cfg.payload_path).await.is_err() {
        tracing::warn!(
            "payload {} not found; approved clients will get 500 until it exists",
            cfg.payload_path.display()
        );
    }

    let gate = build_gate(&cfg);
    let state = Arc::new(AppState { gate });
    let app = api::app(state, cfg.request_timeout);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(
        store = %cfg.store_path.display(),
        payload = %cfg.payload_path.display(),
        "access gate listening on http://{}",
        addr
    );
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_poll(client: config::ClientConfig, email: Option<String>) -> anyhow::Result<()> {
    let email = match email {
        Some(e) => e,
        None => prompt_email().await?,
    };

    let transport = HttpGateTransport::new(&client.gate_url)?;
    let poller = Poller::new(transport, client.poll_interval, client.poll_timeout)?;
    let executor = ScriptExecutor::new(client.interpreter);

    if !email.is_empty() {
        eprintln!("Waiting for admin approval...");
    }
    let granted = poller.run(&email, &executor).await?;
    tracing::info!(attempts = granted.attempts, "payload executed");
    Ok(())
}

async fn prompt_email() -> anyhow::Result<String> {
    eprint!("Enter your email to request access: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read email from stdin")?;
    Ok(line.trim().to_string())
}

async fn handle_access_command(cfg: &Config, cmd: cli::AccessCommands) -> anyhow::Result<()> {
    let gate = build_gate(cfg);
    match cmd {
        cli::AccessCommands::List => {
            let records = gate.store().list().await?;
            if records.is_empty() {
                println!("No requests found.");
                return Ok(());
            }

            println!("{:<40} {:<12} REQUESTED", "EMAIL", "STATUS");
            for (email, record) in records {
                println!(
                    "{:<40} {:<12} {}",
                    email,
                    record.status,
                    record.requested_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        cli::AccessCommands::Approve { email } => {
            decide_from_cli(&gate, &email, AccessStatus::Approved).await?;
        }
        cli::AccessCommands::Reject { email } => {
            decide_from_cli(&gate, &email, AccessStatus::Rejected).await?;
        }
    }
    Ok(())
}

async fn decide_from_cli(gate: &AccessGate, email: &str, status: AccessStatus) -> anyhow::Result<()> {
    match gate.decide(email, status.clone()).await? {
        DecisionOutcome::Updated => println!("{} {}.", email, status),
        DecisionOutcome::UnknownIdentifier => {
            println!("{} has not requested access yet; nothing changed.", email)
        }
    }
    Ok(())
}
