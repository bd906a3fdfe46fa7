use clap::{Parser, Subcommand};
use sectoken_apdu_transport_pcsc::{PcscConfig, PcscDeviceManager};
use sectoken_openpgp::{SessionCache, share};
use tracing::info;

mod commands;
mod utils;

use commands::*;
use utils::reader;

#[derive(Parser)]
#[command(version, about = "Inspect and use OpenPGP smart cards")]
struct Cli {
    /// Optional reader name to use (will auto-detect if not specified)
    #[arg(short, long)]
    reader: Option<String>,

    /// Trace level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    List,

    /// Show what the token reports about itself
    Info,

    /// Verify a PIN
    VerifyPin {
        /// PIN code
        #[arg(long, required = true)]
        pin: String,

        /// Verify the admin PIN (PW3) instead of PW1
        #[arg(long)]
        admin: bool,
    },

    /// Sign a DigestInfo with the signature key
    Sign {
        /// DigestInfo to sign, as a hex string
        #[arg(required = true)]
        data: String,

        /// PIN code
        #[arg(long, required = true)]
        pin: String,
    },

    /// Decipher a session key with the decryption key
    Decipher {
        /// Encrypted session key, as a hex string
        #[arg(required = true)]
        data: String,

        /// PIN code
        #[arg(long, required = true)]
        pin: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let manager = PcscDeviceManager::new()?;

    if let Commands::List = cli.command {
        reader::list_readers(&manager)?;
        return Ok(());
    }

    let reader = match &cli.reader {
        Some(reader_name) => reader::find_reader_by_name(&manager, reader_name)?,
        None => reader::find_reader_with_card(&manager)?,
    };
    info!("Using reader: {}", reader.name());

    let transport = share(manager.open_reader_with_config(reader.name(), PcscConfig::default())?);
    let cache = SessionCache::new();

    match &cli.command {
        Commands::List => unreachable!(), // Already handled above
        Commands::Info => info_command(&cache, &transport)?,
        Commands::VerifyPin { pin, admin } => verify_pin_command(&cache, &transport, pin, *admin)?,
        Commands::Sign { data, pin } => sign_command(&cache, &transport, data, pin)?,
        Commands::Decipher { data, pin } => decipher_command(&cache, &transport, data, pin)?,
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
}
