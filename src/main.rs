//! eth-transfer - sends one value transfer and reports pending balances

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use eth_transfer::chain::RpcClient;
use eth_transfer::config::Settings;
use eth_transfer::submission::SubmissionOrchestrator;
use eth_transfer::TransferError;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    init_logging();

    info!("Starting eth-transfer v{}", env!("CARGO_PKG_VERSION"));

    // Ctrl-C / SIGTERM cancel whatever remote call is in flight
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            warn!("Shutdown signal received, cancelling transfer");
            cancel.cancel();
        }
    });

    match run(cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let transfer_error = e.downcast_ref::<TransferError>();
            let sent = transfer_error.and_then(TransferError::sent_tx_hash);
            if let Some(tx_hash) = sent {
                println!("Sent transaction: {:?}", tx_hash);
                error!("Transfer was broadcast but verification failed, do not resend: {:#}", e);
            } else if transfer_error.map_or(false, TransferError::is_ambiguous) {
                error!("Transfer status unknown, check the node before resending: {:#}", e);
            } else {
                error!("Transfer failed: {:#}", e);
            }
            ExitCode::from(transfer_error.map_or(1, TransferError::exit_code))
        }
    }
}

async fn run(cancel: CancellationToken) -> Result<()> {
    // Load configuration
    let settings = Settings::load().map_err(|e| TransferError::Config(format!("{:#}", e)))?;

    // Key first: a bad key must fail before any network traffic
    let key = settings.wallet.load_key()?;
    info!("Loaded signing key for {:?}", key.address());

    let request = settings.transfer_request()?;

    let client = Arc::new(RpcClient::connect(&settings.node).await?);
    request.scheme.check_node_chain(client.chain_id())?;

    let mut orchestrator = SubmissionOrchestrator::new(client, key, cancel);
    let report = orchestrator.run(&request).await?;

    println!("{}", report);
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,eth_transfer=debug,hyper=warn"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
