//! dispatchkv CLI Client
//!
//! Command-line interface for interacting with dispatchkv.

use std::io::Write;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dispatchkv::{Client, ClientConfig, KvError};

/// dispatchkv CLI
#[derive(Parser, Debug)]
#[command(name = "dispatchkv-cli")]
#[command(about = "CLI for the dispatchkv key-value server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:3333")]
    server: String,

    /// How long GET waits for a reply, in milliseconds
    #[arg(short, long, default_value = "500")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },
}

fn main() {
    let args = Args::parse();

    let client = Client::with_config(
        ClientConfig::new(&args.server).read_timeout(Duration::from_millis(args.timeout_ms)),
    );

    let result = match args.command {
        Commands::Get { key } => client.get(&key).map(|value| {
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(&value);
            let _ = stdout.write_all(b"\n");
        }),
        Commands::Set { key, value } => client.set(&key, value),
    };

    match result {
        Ok(()) => {}
        Err(KvError::KeyNotFound(key)) => {
            eprintln!("(nil) {}", key);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}
