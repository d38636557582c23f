//! `age-gate` command-line front end.
//!
//! ```text
//!   CLI command
//!       │
//!       ▼
//!  ┌──────────────────────┐  status, results  ┌─────────────┐
//!  │ TransactionOrchestr. │ ────────────────▶ │ ChannelSink │──▶ renderer (stdout,
//!  └──────────┬───────────┘                   └─────────────┘    filler rotation)
//!             │ LedgerProvider
//!             ▼
//!  ┌──────────────────────┐     JSON-RPC      ┌─────────────┐
//!  │   BlockchainClient   │ ◀───────────────▶ │ wallet/node │
//!  └──────────────────────┘                   └─────────────┘
//! ```

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use age_gate::blockchain::LedgerCall;
use age_gate::lifecycle::{bootstrap, build_orchestrator, signals, Shutdown};
use age_gate::orchestrator::{encode_value, EventReport, OrchestratorError, SubmitOutcome};
use age_gate::status::{ChannelSink, FillerRotation, Severity, SinkMessage};

#[derive(Parser)]
#[command(name = "age-gate")]
#[command(about = "Submit an encrypted age and request an on-chain age check", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in Sepolia defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the wallet and show network and account
    Connect,
    /// Submit an encrypted age
    Submit {
        #[arg(long)]
        age: u32,
    },
    /// Request an age check (defaults to the connected account)
    Check {
        #[arg(long)]
        subject: Option<Address>,
    },
    /// Print age check results until interrupted
    Watch,
    /// Submit an age, request a check and wait for the result
    Run {
        #[arg(long)]
        age: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = bootstrap(cli.config.as_deref())?;

    let (sink, messages) = ChannelSink::new();
    let (results_tx, mut results) = mpsc::unbounded_channel();
    let renderer = spawn_renderer(
        messages,
        results_tx,
        Duration::from_millis(config.ui.filler_interval_ms),
    );

    let orchestrator = build_orchestrator(&config, Arc::new(sink))?;
    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let outcome: Result<(), OrchestratorError> = async {
        match cli.command {
            Commands::Connect => {
                let state = orchestrator.connect().await?;
                println!(
                    "network: {} ({})",
                    orchestrator.settings().chain_name,
                    state.chain_id.map(|c| c.to_hex()).unwrap_or_default()
                );
                if let Some(account) = state.account {
                    println!("account: {}", account);
                }
            }
            Commands::Submit { age } => {
                let outcome = orchestrator
                    .submit(LedgerCall::SubmitValue(encode_value(age)))
                    .await?;
                print_outcome(&outcome);
            }
            Commands::Check { subject } => {
                let subject = match subject {
                    Some(subject) => subject,
                    None => own_account(&orchestrator).await?,
                };
                let outcome = orchestrator.submit(LedgerCall::RequestCheck(subject)).await?;
                print_outcome(&outcome);
            }
            Commands::Watch => {
                orchestrator.connect().await?;
                let mut stop = shutdown.subscribe();
                let _ = stop.recv().await;
            }
            Commands::Run { age } => {
                let submitted = orchestrator
                    .submit(LedgerCall::SubmitValue(encode_value(age)))
                    .await?;
                print_outcome(&submitted);

                let subject = own_account(&orchestrator).await?;
                let requested = orchestrator.submit(LedgerCall::RequestCheck(subject)).await?;
                print_outcome(&requested);

                let mut stop = shutdown.subscribe();
                loop {
                    tokio::select! {
                        report = results.recv() => match report {
                            Some(EventReport::Result(notice)) if notice.subject == subject => break,
                            Some(_) => continue,
                            None => break,
                        },
                        _ = stop.recv() => break,
                    }
                }
            }
        }
        Ok(())
    }
    .await;

    drop(orchestrator);
    let _ = renderer.await;

    if let Err(e) = outcome {
        if e.is_ambiguous() {
            eprintln!("warning: the transaction may still be mined, look it up before resubmitting");
        }
        return Err(e.into());
    }
    Ok(())
}

async fn own_account(
    orchestrator: &age_gate::TransactionOrchestrator,
) -> Result<Address, OrchestratorError> {
    if let Some(account) = orchestrator.account() {
        return Ok(account);
    }
    let state = orchestrator.connect().await?;
    state
        .account
        .ok_or_else(|| OrchestratorError::AuthorizationDenied("no account after connect".into()))
}

fn print_outcome(outcome: &SubmitOutcome) {
    println!(
        "{} confirmed: tx {} block {}{}",
        outcome.operation.kind,
        outcome.tx_hash(),
        outcome
            .receipt
            .block_number
            .map(|b| b.to_string())
            .unwrap_or_else(|| "?".to_string()),
        if outcome.reconciled { " (reconciled)" } else { "" }
    );
}

/// Render sink messages to the terminal, running the filler rotation while
/// an operation is in progress. Event reports are also forwarded to `results`.
fn spawn_renderer(
    mut messages: mpsc::UnboundedReceiver<SinkMessage>,
    results: mpsc::UnboundedSender<EventReport>,
    filler_period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut filler: Option<FillerRotation> = None;

        while let Some(message) = messages.recv().await {
            match message {
                SinkMessage::Status(update) => match update.severity {
                    Severity::Info => println!("{}", update.text),
                    Severity::Progress => println!("… {}", update.text),
                    Severity::Error => eprintln!("✖ {}", update.text),
                },
                SinkMessage::Connection(state) => {
                    tracing::debug!(status = %state.status, "Connection state");
                }
                SinkMessage::Started(_) => {
                    if filler.is_none() {
                        filler = Some(FillerRotation::start(filler_period, |line| {
                            println!("   {}", line)
                        }));
                    }
                }
                SinkMessage::Ended(_) => {
                    if let Some(rotation) = filler.take() {
                        rotation.stop();
                    }
                }
                SinkMessage::Result(report) => {
                    let _ = results.send(report);
                }
            }
        }
    })
}
