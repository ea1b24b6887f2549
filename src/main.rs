use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use map_session_store::{MapSessionStore, SessionRecord, SessionStore, SqliteClient, StoreOptions};

#[derive(Parser)]
#[command(name = "session-store", version)]
#[command(about = "Inspect and edit sessions kept in a key-value map", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// SQLite database holding the maps (defaults to ~/.session-store/sessions.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML file with store options
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Key prefix (overrides config)
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Map name (overrides config)
    #[arg(long, global = true)]
    map_name: Option<String>,

    /// Store-wide TTL in milliseconds (overrides config)
    #[arg(long, global = true)]
    ttl_ms: Option<u64>,

    /// Store sessions without any TTL
    #[arg(long, global = true)]
    disable_ttl: bool,

    /// Log map errors at warn level (overrides config)
    #[arg(long, global = true)]
    log_errors: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a stored session as JSON
    Get {
        /// Session ID
        id: String,
    },

    /// Store a session given as a JSON document
    Set {
        /// Session ID
        id: String,

        /// Session record, e.g. '{"cookie":{"maxAge":60000},"user":"ann"}'
        record: String,
    },

    /// Delete a session
    Destroy {
        /// Session ID
        id: String,
    },

    /// Show the TTL a session record would be stored with
    Ttl {
        /// Session record as JSON
        record: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("warn".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(cli: &Cli) -> Result<StoreOptions> {
    let mut options = match &cli.config {
        Some(path) => StoreOptions::load(path)?,
        None => StoreOptions::default(),
    };

    if let Some(prefix) = &cli.prefix {
        options.prefix = prefix.clone();
    }
    if let Some(map_name) = &cli.map_name {
        options.map_name = map_name.clone();
    }
    if let Some(ttl_ms) = cli.ttl_ms {
        options.ttl_ms = Some(ttl_ms);
    }
    if cli.disable_ttl {
        options.disable_ttl = true;
    }
    if cli.log_errors {
        options.log_errors = true;
    }

    Ok(options)
}

fn parse_record(raw: &str) -> Result<SessionRecord> {
    serde_json::from_str(raw).context("record must be a JSON object")
}

async fn open_store(cli: &Cli, options: StoreOptions) -> Result<MapSessionStore> {
    let client = match &cli.db {
        Some(path) => SqliteClient::new(path)?,
        None => SqliteClient::default_location()?,
    };
    debug!(db = %client.db_path().display(), "opened map database");

    let store = MapSessionStore::new(options)?;
    store.attach_client(&client).await?;
    Ok(store)
}

async fn run(cli: Cli) -> Result<()> {
    let options = load_options(&cli)?;

    match &cli.command {
        Commands::Get { id } => {
            let store = open_store(&cli, options).await?;
            match store.load(id).await? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("session '{}' not found", id),
            }
        }
        Commands::Set { id, record } => {
            let record = parse_record(record)?;
            let store = open_store(&cli, options).await?;
            let ttl = store.ttl_for(&record);
            let previous = store.save(id, &record).await?;

            match ttl {
                Some(ttl) => println!("saved '{}' (ttl {}ms)", id, ttl.as_millis()),
                None => println!("saved '{}' (no ttl)", id),
            }
            if let Some(previous) = previous {
                println!("previous: {}", serde_json::to_string(&previous)?);
            }
        }
        Commands::Destroy { id } => {
            let store = open_store(&cli, options).await?;
            store.destroy(id).await?;
            println!("destroyed '{}'", id);
        }
        Commands::Ttl { record } => {
            let record = parse_record(record)?;
            let store = MapSessionStore::new(options)?;
            match store.ttl_for(&record) {
                Some(ttl) => println!("{}", ttl.as_millis()),
                None => println!("none"),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!(error = %e, "command failed");
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
