//! # Line Shell
//!
//! Purpose: Map one text line onto one `SlotKv` call, playing the part of the
//! host runtime: decode arguments, call, print a single text result.
//!
//! ## Grammar
//!
//! ```text
//! connect    <slot> <host> <port> [password] [db] [ignore]
//! disconnect <slot>
//! command    <slot> <template> [arg ...]       (at most 4 args)
//! argv       <slot> <name> [arg ...]
//! push       <slot> <record-json> <prefix> <key,key,...> [keyset] [push_keys]
//! drop       <slot> <keyset> <prefix>          (exactly one non-null)
//! ```
//!
//! Lines split with POSIX shell quoting (`shlex`); a word starting with `#`
//! begins a comment. The token `\N` (written `'\N'`) is a null argument, and
//! so is a bare `\N` entry in the comma-separated key list.

use anyhow::{anyhow, bail, Context, Result};

use slotkv_client::{Record, SlotKv};

/// Token that stands for a null argument.
pub const NULL_TOKEN: &str = "\\N";

pub const HELP: &str = "\
commands:
  connect    <slot> <host> <port> [password] [db] [ignore]
  disconnect <slot>
  command    <slot> <template> [arg ...]
  argv       <slot> <name> [arg ...]
  push       <slot> <record-json> <prefix> <key,key,...> [keyset] [push_keys]
  drop       <slot> <keyset|'\\N'> <prefix|'\\N'>
  help | quit

'\\N' is a null argument; quote with '...' or \"...\".";

/// Outcome of one shell line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Text to print (command results, or `OK` for void operations).
    Output(String),
    /// Blank line or comment.
    Nothing,
    Quit,
}

pub struct Shell {
    client: SlotKv,
}

impl Shell {
    pub fn new(client: SlotKv) -> Self {
        Shell { client }
    }

    /// Executes one line.
    pub fn execute(&self, line: &str) -> Result<Outcome> {
        let tokens = tokenize(line)?;
        let Some((verb, rest)) = tokens.split_first() else {
            return Ok(Outcome::Nothing);
        };
        let verb = verb.as_deref().ok_or_else(|| anyhow!("command verb cannot be null"))?;
        if verb.starts_with('#') {
            return Ok(Outcome::Nothing);
        }
        let args = Args::new(verb, rest);

        let ok = || -> Result<Outcome> { Ok(Outcome::Output("OK".to_string())) };
        match verb.to_ascii_lowercase().as_str() {
            "help" => Ok(Outcome::Output(HELP.to_string())),
            "quit" | "exit" => Ok(Outcome::Quit),
            "connect" => {
                self.client.connect(
                    args.int(0, "slot")?,
                    args.text(1, "host")?,
                    args.int(2, "port")?,
                    args.opt_text(3).unwrap_or(""),
                    args.opt_int(4, "db")?.unwrap_or(0),
                    args.opt_bool(5, "ignore")?.unwrap_or(false),
                )?;
                ok()
            }
            "disconnect" => {
                self.client.disconnect(args.int(0, "slot")?)?;
                ok()
            }
            "command" => {
                let slot = args.int(0, "slot")?;
                let template = args.text(1, "template")?;
                let out = self.client.command(slot, template, &args.tail(2))?;
                Ok(Outcome::Output(out))
            }
            "argv" => {
                let slot = args.int(0, "slot")?;
                let out = self.client.command_argv(slot, &args.tail(1))?;
                Ok(Outcome::Output(out))
            }
            "push" => {
                let slot = args.int(0, "slot")?;
                let record = match args.opt_text(1) {
                    Some(json) => {
                        let value: serde_json::Value =
                            serde_json::from_str(json).context("record must be a JSON object")?;
                        Some(Record::from_json(&value)?)
                    }
                    None => None,
                };
                let keys: Option<Vec<Option<&str>>> = args.opt_text(3).map(|list| {
                    list.split(',')
                        .map(|name| if name == NULL_TOKEN { None } else { Some(name) })
                        .collect()
                });
                self.client.push_record(
                    slot,
                    record.as_ref(),
                    args.opt_bool(5, "push_keys")?,
                    args.opt_text(4),
                    args.opt_text(2),
                    keys.as_deref(),
                )?;
                ok()
            }
            "drop" => {
                let slot = args.int(0, "slot")?;
                self.client.drop_collection(slot, args.opt_text(1), args.opt_text(2))?;
                ok()
            }
            other => bail!("unknown command '{}' (try 'help')", other),
        }
    }
}

struct Args<'a> {
    verb: &'a str,
    items: &'a [Option<String>],
}

impl<'a> Args<'a> {
    fn new(verb: &'a str, items: &'a [Option<String>]) -> Self {
        Args { verb, items }
    }

    fn opt_text(&self, idx: usize) -> Option<&'a str> {
        self.items.get(idx).and_then(|item| item.as_deref())
    }

    fn text(&self, idx: usize, name: &str) -> Result<&'a str> {
        self.opt_text(idx)
            .ok_or_else(|| anyhow!("{}: missing <{}>", self.verb, name))
    }

    fn opt_int(&self, idx: usize, name: &str) -> Result<Option<i32>> {
        self.opt_text(idx)
            .map(|text| {
                text.parse::<i32>()
                    .with_context(|| format!("{}: <{}> must be an integer, got '{}'", self.verb, name, text))
            })
            .transpose()
    }

    fn int(&self, idx: usize, name: &str) -> Result<i32> {
        self.opt_int(idx, name)?
            .ok_or_else(|| anyhow!("{}: missing <{}>", self.verb, name))
    }

    fn opt_bool(&self, idx: usize, name: &str) -> Result<Option<bool>> {
        match self.opt_text(idx) {
            None => Ok(None),
            Some(text) => match text.to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "1" => Ok(Some(true)),
                "false" | "f" | "no" | "0" => Ok(Some(false)),
                _ => bail!("{}: <{}> must be a boolean, got '{}'", self.verb, name, text),
            },
        }
    }

    fn tail(&self, from: usize) -> Vec<Option<&'a str>> {
        self.items
            .iter()
            .skip(from)
            .map(|item| item.as_deref())
            .collect()
    }
}

/// Splits a line into tokens; `\N` becomes `None`.
pub fn tokenize(line: &str) -> Result<Vec<Option<String>>> {
    let words = shlex::split(line).ok_or_else(|| anyhow!("invalid quoting: {}", line))?;
    Ok(words
        .into_iter()
        .map(|word| if word == NULL_TOKEN { None } else { Some(word) })
        .collect())
}
