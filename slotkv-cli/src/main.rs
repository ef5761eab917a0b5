//! # slotkv Shell
//!
//! Line-oriented front end for the slot client: reads one operation per line
//! from stdin (or runs a single `-c` line) and prints one result per line.

mod shell;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use slotkv_client::{ClientConfig, SlotKv};

use crate::shell::{Outcome, Shell, HELP};

/// Shell options from the command line.
#[derive(Debug, Default)]
struct Options {
    /// JSON file with `ClientConfig` fields.
    config: Option<PathBuf>,
    /// Single line to execute instead of reading stdin.
    command: Option<String>,
}

impl Options {
    fn from_args() -> Result<Self> {
        let mut options = Options::default();
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config requires a path")?;
                    options.config = Some(PathBuf::from(path));
                }
                "-c" | "--command" => {
                    options.command = Some(args.next().context("-c requires a command line")?);
                }
                "--help" | "-h" => {
                    println!("usage: slotkv [--config <path>] [-c <line>]\n\n{}", HELP);
                    std::process::exit(0);
                }
                "--version" | "-V" => {
                    println!("slotkv {}", env!("CARGO_PKG_VERSION"));
                    std::process::exit(0);
                }
                other => bail!("unknown argument: {}", other),
            }
        }

        Ok(options)
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<ClientConfig> {
    let Some(path) = path else {
        return Ok(ClientConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("slotkv=info,slotkv_client=info")),
        )
        .with_writer(io::stderr)
        .init();

    let options = Options::from_args()?;
    let config = load_config(options.config.as_ref())?;
    info!(?config, "slotkv shell starting");
    let shell = Shell::new(SlotKv::with_config(config));

    if let Some(line) = options.command {
        return match shell.execute(&line)? {
            Outcome::Output(text) => {
                println!("{}", text);
                Ok(())
            }
            Outcome::Nothing | Outcome::Quit => Ok(()),
        };
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        match shell.execute(&line) {
            Ok(Outcome::Output(text)) => writeln!(stdout, "{}", text)?,
            Ok(Outcome::Nothing) => {}
            Ok(Outcome::Quit) => break,
            Err(err) => eprintln!("ERROR: {:#}", err),
        }
        stdout.flush()?;
    }

    Ok(())
}
