//! # CLI — DriftKV Interactive Shell
//!
//! A REPL for the DriftKV storage engine. Reads commands from stdin,
//! executes them against the engine, and prints results to stdout. Works
//! both interactively and scripted (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! put <key> <value>   Insert or update a key
//! get <key>           Look up a key
//! delete <key>        Delete a key (writes a tombstone)
//! list                Print every live key
//! exit                Shut down gracefully
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli -- --dir ./dbdata
//! >>> put name alice
//! ok
//! >>> get name
//! alice
//! >>> delete name
//! ok
//! >>> get name
//! E key not found
//! >>> exit
//! ```
//!
//! Errors are printed on their own line with an `E ` prefix; everything
//! else is one response line per result. Log output goes to stderr (set
//! `RUST_LOG` to see it) so it never interleaves with responses.

use anyhow::Result;
use clap::Parser;
use engine::Engine;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod parser;

/// DriftKV interactive shell.
#[derive(Parser, Debug)]
#[command(name = "driftkv")]
#[command(about = "Append-only key-value store with an interactive shell")]
struct Args {
    /// Data directory
    #[arg(long, default_value = "./dbdata")]
    dir: PathBuf,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut db = Engine::open(&args.dir)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    print!(">>> ");
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();
        if input == "exit" {
            break;
        }

        match parser::dispatch(&mut db, input) {
            Ok(responses) => {
                for response in responses {
                    println!("{}", response);
                }
            }
            Err(e) => println!("E {}", e),
        }

        print!(">>> ");
        stdout.flush()?;
    }

    db.close()?;
    Ok(())
}
