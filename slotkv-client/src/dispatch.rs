//! # Command Dispatch
//!
//! Purpose: Send one command through a slot and classify the outcome.
//!
//! ## Design Principles
//! 1. **One Path**: The fixed-arity and argv entry points both build an
//!    ordered argument list and share `dispatch`.
//! 2. **Poison On Transport Failure**: If no reply can be obtained the slot is
//!    invalidated; it must be reopened before further use.
//! 3. **Command Errors Are Harmless**: An error reply means the store ran and
//!    rejected the command; the slot stays open.
//!
//! ## Command Templates
//!
//! The fixed-arity entry point accepts a template such as `"HGET %s %s"`.
//! The template is split on whitespace; inside each token `%s` takes the
//! next positional argument and `%%` is a literal `%`. Arguments not
//! consumed by a placeholder are appended after the template tokens.
//!
//! ```text
//! ("GET",          ["k"])       -> GET k
//! ("SET %s %s",    ["k", "v"])  -> SET k v
//! ("GET user:%s",  ["7"])       -> GET user:7
//! ```

use tracing::{debug, warn};

use slotkv_common::{SlotKvError, SlotKvResult, MAX_FIXED_ARGS};

use crate::reply::{translate, NilRendering};
use crate::resp::RespValue;
use crate::slots::{SlotHandle, SlotTable};

/// Fixed-arity command: a template plus at most four positional arguments.
///
/// A null argument bound to a placeholder expands to empty text; a null
/// argument in the appended tail is left out. Nil replies render as `nil`.
pub fn send_fixed(
    table: &SlotTable,
    index: i32,
    template: &str,
    args: &[Option<&str>],
) -> SlotKvResult<String> {
    if args.len() > MAX_FIXED_ARGS {
        return Err(SlotKvError::UnsupportedArity(args.len()));
    }
    let argv = expand_template(template, args)?;
    let context = format!("command {} failed", template);
    dispatch(table, index, &argv, &context, NilRendering::Literal)
}

/// Variadic command: `args[0]` is the command name.
///
/// Null arguments are sent as empty strings. Nil replies render as empty text.
pub fn send_variadic(table: &SlotTable, index: i32, args: &[Option<&str>]) -> SlotKvResult<String> {
    let name = match args.first() {
        Some(Some(name)) if !name.is_empty() => *name,
        _ => return Err(SlotKvError::CommandRequired),
    };
    let argv: Vec<String> = args.iter().map(|arg| arg.unwrap_or("").to_string()).collect();
    let context = format!("command {} failed", name);
    dispatch(table, index, &argv, &context, NilRendering::Empty)
}

fn dispatch(
    table: &SlotTable,
    index: i32,
    argv: &[String],
    context: &str,
    nil: NilRendering,
) -> SlotKvResult<String> {
    let mut handle = table.resolve(index)?;
    let args: Vec<&[u8]> = argv.iter().map(|arg| arg.as_bytes()).collect();
    let reply = send(&mut handle, &args, context)?;
    translate(&reply, nil)
}

/// Sends `args` through an already-resolved slot.
///
/// Transport failures invalidate the slot; error replies become
/// `SlotKvError::Command`. Everything else is returned untouched.
pub fn send(handle: &mut SlotHandle<'_>, args: &[&[u8]], context: &str) -> SlotKvResult<RespValue> {
    debug!(
        slot = handle.index(),
        command = %args.first().map(|name| String::from_utf8_lossy(name)).unwrap_or_default(),
        argc = args.len(),
        "dispatching command"
    );
    match handle.exec(args) {
        Ok(RespValue::Error(message)) => Err(SlotKvError::command(
            context,
            String::from_utf8_lossy(&message),
        )),
        Ok(reply) => Ok(reply),
        Err(err) => {
            handle.invalidate();
            warn!(slot = handle.index(), error = %err, "transport failure, slot invalidated");
            Err(SlotKvError::transport(context, err.to_string()))
        }
    }
}

/// Expands a command template against positional arguments.
pub fn expand_template(template: &str, args: &[Option<&str>]) -> SlotKvResult<Vec<String>> {
    let mut argv = Vec::new();
    let mut next = 0;

    for token in template.split_ascii_whitespace() {
        let mut out = String::with_capacity(token.len());
        let mut chars = token.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '%' {
                out.push(ch);
                continue;
            }
            match chars.peek() {
                Some('s') => {
                    chars.next();
                    if let Some(Some(arg)) = args.get(next) {
                        out.push_str(arg);
                    }
                    next += 1;
                }
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                _ => out.push('%'),
            }
        }
        argv.push(out);
    }

    argv.extend(args.iter().skip(next).flatten().map(|arg| arg.to_string()));

    if argv.first().map_or(true, |name| name.is_empty()) {
        return Err(SlotKvError::CommandRequired);
    }
    Ok(argv)
}
