//! binday CLI
//!
//! Local entry point. For the HTTP API, use `binday-server`.

use std::path::PathBuf;

use binday::{
    error::{ErrorEnvelope, Result},
    models::{AddressCandidate, Config, RawQuery},
    pipeline::{BinService, render_calendar},
};
use clap::{Parser, Subcommand};

/// binday - UK bin collection lookup
#[derive(Parser, Debug)]
#[command(name = "binday", version, about = "UK bin collection day lookup")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up the collection schedule for an address
    Lookup {
        /// Postcode, UPRN, house and postcode, or council URL
        address: String,

        /// Council, e.g. "Wiltshire Council"
        #[arg(long)]
        council: String,

        /// Key for the privileged address directory
        #[arg(long, env = "BINDAY_API_KEY")]
        api_key: Option<String>,

        /// Print an iCalendar feed instead of JSON
        #[arg(long)]
        ics: bool,
    },

    /// List supported councils
    Councils,

    /// List the addresses at a postcode
    Addresses {
        postcode: String,

        #[arg(long, env = "BINDAY_API_KEY")]
        api_key: Option<String>,
    },

    /// Write the calendar feed for an address
    Calendar {
        address: String,

        #[arg(long)]
        council: String,

        #[arg(long, env = "BINDAY_API_KEY")]
        api_key: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn query(address: String, council: String, api_key: Option<String>) -> RawQuery {
    RawQuery {
        text: address,
        council,
        api_key,
    }
}

fn print_envelope(envelope: &ErrorEnvelope) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);
    init_logging(cli.verbose, &config.logging.level);

    log::debug!("Loaded configuration from {}", cli.config.display());

    if let Command::Validate = cli.command {
        log::info!("Validating configuration...");
        if let Err(e) = config.validate() {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
        log::info!("✓ Config OK ({} council overrides)", config.councils.len());
        return Ok(());
    }

    let service = BinService::new(config)?;

    match cli.command {
        Command::Lookup {
            address,
            council,
            api_key,
            ics,
        } => match service.get_bins(&query(address, council, api_key)).await {
            Ok(response) if ics => print!("{}", render_calendar(&response.bins)),
            Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
            Err(envelope) => {
                print_envelope(&envelope)?;
                std::process::exit(1);
            }
        },

        Command::Councils => {
            for council in service.councils()? {
                println!("{council}");
            }
        }

        Command::Addresses { postcode, api_key } => {
            let addresses = service.addresses(&postcode, api_key.as_deref()).await?;
            if addresses.iter().all(AddressCandidate::is_sentinel) {
                log::warn!("No addresses found for {}", postcode);
            }
            println!("{}", serde_json::to_string_pretty(&addresses)?);
        }

        Command::Calendar {
            address,
            council,
            api_key,
            output,
        } => {
            let ics = match service.calendar(&query(address, council, api_key)).await {
                Ok(ics) => ics,
                Err(e) => {
                    print_envelope(&ErrorEnvelope::from(&e))?;
                    std::process::exit(1);
                }
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, ics)?;
                    log::info!("Calendar saved to {}", path.display());
                }
                None => print!("{ics}"),
            }
        }

        Command::Validate => {}
    }

    Ok(())
}
