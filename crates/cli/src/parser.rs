//! Textual command parser.
//!
//! Splits a command line on whitespace and maps the verb onto the matching
//! engine call. Each command returns the response lines the REPL prints;
//! failures (wrong arity, unknown verb, engine errors) come back as errors
//! for the REPL's `E ` channel.

use anyhow::{bail, Result};
use engine::Engine;

/// Executes one command line against the engine.
///
/// Empty input is a no-op producing a single empty response line.
pub fn dispatch(engine: &mut Engine, input: &str) -> Result<Vec<String>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(vec![String::new()]);
    }

    let tokens: Vec<&str> = input.split_whitespace().collect();
    let (verb, args) = (tokens[0], &tokens[1..]);

    match verb {
        "put" => {
            if args.len() != 2 {
                bail!("put command requires 2 arguments");
            }
            engine.put(args[0].as_bytes(), args[1].as_bytes())?;
            Ok(vec!["ok".to_string()])
        }
        "get" => {
            if args.len() != 1 {
                bail!("get command requires 1 argument");
            }
            let value = engine.get(args[0].as_bytes())?;
            Ok(vec![String::from_utf8_lossy(&value).into_owned()])
        }
        "delete" => {
            if args.len() != 1 {
                bail!("delete command requires 1 argument");
            }
            engine.delete(args[0].as_bytes())?;
            Ok(vec!["ok".to_string()])
        }
        "list" => {
            if !args.is_empty() {
                bail!("list command requires 0 arguments");
            }
            let mut keys: Vec<String> = engine
                .list_keys()
                .iter()
                .map(|k| String::from_utf8_lossy(k).into_owned())
                .collect();
            // The engine does not order keys; sort so output is stable.
            keys.sort();
            Ok(keys)
        }
        other => bail!("unknown command: {}", other),
    }
}
