//! Node configuration from CLI flags and environment

use clap::Parser;
use std::path::PathBuf;

/// Live trading event-bus node
#[derive(Debug, Parser)]
#[command(name = "trader", about = "tickbus trading node")]
pub struct Args {
    /// OKX instruments to stream (e.g. BTC-USDT-SWAP)
    #[arg(long, value_delimiter = ',')]
    pub okx_symbols: Vec<String>,

    /// Binance symbols to stream (e.g. BTCUSDT)
    #[arg(long, value_delimiter = ',')]
    pub binance_symbols: Vec<String>,

    /// Use venue testnets
    #[arg(long, default_value_t = false)]
    pub testnet: bool,
}

/// Credentials picked up from the environment
#[derive(Debug, Default)]
pub struct Credentials {
    /// OKX key/secret/passphrase, when all three are set
    pub okx: Option<(String, String, String)>,
    /// Binance key/secret, when both are set
    pub binance: Option<(String, String)>,
}

/// Everything the node needs to start
#[derive(Debug)]
pub struct Config {
    /// Parsed CLI flags
    pub args: Args,
    /// Outbound journal path
    pub journal_path: PathBuf,
    /// Outbound journal size in bytes
    pub journal_size: usize,
    /// Inbound command journal path
    pub command_journal_path: PathBuf,
    /// Testnet selection (flag or `TICKBUS_TESTNET`)
    pub testnet: bool,
    /// Venue credentials
    pub credentials: Credentials,
}

impl Config {
    /// Assemble config from CLI flags and environment variables
    pub fn load() -> Self {
        let args = Args::parse();
        let journal_path = std::env::var("TICKBUS_JOURNAL_PATH")
            .unwrap_or_else(|_| "/tmp/tickbus.journal".to_string())
            .into();
        let journal_size = std::env::var("TICKBUS_JOURNAL_SIZE_MB")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(128)
            * 1024
            * 1024;
        let command_journal_path = std::env::var("TICKBUS_COMMAND_JOURNAL_PATH")
            .unwrap_or_else(|_| "/tmp/tickbus-commands.journal".to_string())
            .into();
        let testnet = args.testnet
            || std::env::var("TICKBUS_TESTNET")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);

        let okx = match (
            std::env::var("OKX_API_KEY"),
            std::env::var("OKX_API_SECRET"),
            std::env::var("OKX_PASSPHRASE"),
        ) {
            (Ok(key), Ok(secret), Ok(passphrase)) => Some((key, secret, passphrase)),
            _ => None,
        };
        let binance = match (
            std::env::var("BINANCE_API_KEY"),
            std::env::var("BINANCE_API_SECRET"),
        ) {
            (Ok(key), Ok(secret)) => Some((key, secret)),
            _ => None,
        };

        Self {
            args,
            journal_path,
            journal_size,
            command_journal_path,
            testnet,
            credentials: Credentials { okx, binance },
        }
    }
}
