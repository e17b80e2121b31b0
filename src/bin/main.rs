use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use money_transfer::{load_accounts, load_customers, process_transfer, Bank, TransferService};

/// Loads a ledger from CSV fixtures, replays transfer requests against it and
/// prints the resulting accounts as CSV
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    /// The path to the customer CSV file
    customers: PathBuf,
    /// The path to the account CSV file
    accounts: PathBuf,
    /// The path to the transfer request CSV file
    transfers: PathBuf,
    /// The identifier of the bank
    #[clap(long, default_value_t = 1)]
    bank_id: u32,
    /// The name of the bank
    #[clap(long, default_value = "Money Transfer Bank")]
    bank_name: String,
    /// The log filter used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for the CSV output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &Path) -> anyhow::Result<File> {
    File::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let service = TransferService::new(Bank::new(args.bank_id, args.bank_name));
    load_customers(&service, open(&args.customers)?)?;
    load_accounts(&service, open(&args.accounts)?)?;
    info!(bank = %service.bank(), "ledger loaded");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(open(&args.transfers)?);

    for request in reader.deserialize() {
        // rejected requests are logged and skipped
        let _ = process_transfer(&service, &request?);
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(std::io::stdout());

    for customer in service.customers() {
        for account in customer.accounts() {
            writer.serialize(&*account)?;
        }
    }
    writer.flush()?;

    Ok(())
}
