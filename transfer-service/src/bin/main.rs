use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use common::decimal::{dec, precision, Amount};
use common::error::Error;
use common::model::account::{Account, ProcessContext, TransferRequest};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transfer_service::{
    EmailNotificationService, InMemoryAccountRepository, TransferService, TransferServiceConfig,
};

/// Transfer Service CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Commands
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a two-account contention demo
    Demo {
        /// Opening balance for each account
        #[arg(short, long, default_value = "1000")]
        opening_balance: Amount,

        /// Number of concurrent transfers to launch
        #[arg(short, long, default_value_t = 100)]
        transfers: usize,

        /// Amount moved by each transfer
        #[arg(short, long, default_value = "5")]
        amount: Amount,

        /// Acquisition timeout in milliseconds
        #[arg(long, default_value_t = 100)]
        acquire_timeout_ms: u64,

        /// Backoff between acquisition attempts in milliseconds
        #[arg(long, default_value_t = 10)]
        retry_backoff_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "transfer_service={}",
            cli.log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Demo {
            opening_balance,
            transfers,
            amount,
            acquire_timeout_ms,
            retry_backoff_ms,
        } => {
            let config = TransferServiceConfig::new(
                Duration::from_millis(acquire_timeout_ms),
                Duration::from_millis(retry_backoff_ms),
            );
            run_demo(opening_balance, transfers, amount, config).await?;
        }
    }

    Ok(())
}

/// Seed two accounts and hammer them with concurrent transfers in both
/// directions, then report outcomes and verify that funds were conserved.
async fn run_demo(
    opening_balance: Amount,
    transfers: usize,
    amount: Amount,
    config: TransferServiceConfig,
) -> common::Result<()> {
    let service = Arc::new(TransferService::with_parts(
        Arc::new(InMemoryAccountRepository::new()),
        Arc::new(EmailNotificationService),
        config,
    ));

    service
        .create_account(Account::with_balance("Id-A", opening_balance))
        .await?;
    service
        .create_account(Account::with_balance("Id-B", opening_balance))
        .await?;

    info!(
        "Launching {} transfers of {} between Id-A and Id-B (opening balance {} each)",
        transfers, amount, opening_balance
    );

    let mut handles = Vec::with_capacity(transfers);
    for i in 0..transfers {
        let request = if i % 2 == 0 {
            TransferRequest::new("Id-A", "Id-B", amount)
        } else {
            TransferRequest::new("Id-B", "Id-A", amount)
        };
        // Boundary validation before the request reaches the core
        request.validate()?;

        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let ctx = ProcessContext::new();
            service.transfer(&request, &ctx).await
        }));
    }

    let mut succeeded = 0usize;
    let mut timed_out = 0usize;
    let mut rejected = 0usize;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => succeeded += 1,
            Ok(Err(Error::TransferTimeout(_))) => timed_out += 1,
            Ok(Err(e)) => {
                error!("Transfer rejected: {}", e);
                rejected += 1;
            }
            Err(e) => return Err(Error::Internal(format!("Demo task panicked: {}", e))),
        }
    }

    let a = service
        .get_account("Id-A")
        .await?
        .ok_or_else(|| Error::AccountNotFound("Sender Account id Id-A does not exist!".to_string()))?;
    let b = service
        .get_account("Id-B")
        .await?
        .ok_or_else(|| Error::AccountNotFound("Receiver Account id Id-B does not exist!".to_string()))?;

    info!(
        "Completed: {} succeeded, {} timed out, {} rejected",
        succeeded, timed_out, rejected
    );
    info!(
        "Final balances: Id-A={} Id-B={} total={}",
        precision::round_amount(a.balance),
        precision::round_amount(b.balance),
        precision::round_amount(a.balance + b.balance)
    );

    if a.balance + b.balance != opening_balance * dec!(2) {
        return Err(Error::Internal(
            "Funds were not conserved across the demo run".to_string(),
        ));
    }

    Ok(())
}
