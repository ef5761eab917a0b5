//! # Collection Drop
//!
//! Purpose: Delete every record of a logical table, found either through its
//! keyset (`SMEMBERS`) or through a key prefix (`KEYS prefix*`), and then the
//! keyset itself.
//!
//! Member names are checked before the first `DEL`, so a malformed listing
//! deletes nothing. Deletions themselves are not atomic: a failure part way
//! through leaves earlier members deleted.

use tracing::info;

use slotkv_common::{SlotKvError, SlotKvResult};

use crate::dispatch::send;
use crate::resp::RespValue;
use crate::slots::SlotHandle;

/// How the members of a collection are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionSelector<'a> {
    /// Members of the named set; the set is deleted afterwards.
    Keyset(&'a str),
    /// All keys starting with the prefix.
    Prefix(&'a str),
}

impl<'a> CollectionSelector<'a> {
    /// Picks the selector from two nullable host arguments.
    ///
    /// # Errors
    /// `AmbiguousSelector` unless exactly one argument is present.
    pub fn from_args(keyset: Option<&'a str>, prefix: Option<&'a str>) -> SlotKvResult<Self> {
        match (keyset, prefix) {
            (Some(keyset), None) => Ok(CollectionSelector::Keyset(keyset)),
            (None, Some(prefix)) => Ok(CollectionSelector::Prefix(prefix)),
            _ => Err(SlotKvError::AmbiguousSelector),
        }
    }

    fn listing(&self) -> (&'static str, String) {
        match self {
            CollectionSelector::Keyset(keyset) => ("SMEMBERS", keyset.to_string()),
            CollectionSelector::Prefix(prefix) => ("KEYS", format!("{}*", escape_glob(prefix))),
        }
    }
}

/// Deletes every member of the selected collection.
///
/// Returns the number of members processed.
pub fn drop_collection(handle: &mut SlotHandle<'_>, selector: CollectionSelector<'_>) -> SlotKvResult<usize> {
    let (verb, pattern) = selector.listing();
    let listing = format!("{} {}", verb, pattern);
    let context = format!("command {} failed", listing);

    let members = match send(handle, &[verb.as_bytes(), pattern.as_bytes()], &context)? {
        RespValue::Array(items) => member_names(items, &listing)?,
        _ => return Err(SlotKvError::UnexpectedReplyShape(listing)),
    };

    for member in &members {
        let context = format!("command DEL {} failed", member);
        send(handle, &[b"DEL", member.as_bytes()], &context)?;
    }

    if let CollectionSelector::Keyset(keyset) = selector {
        let context = format!("command DEL {} failed", keyset);
        send(handle, &[b"DEL", keyset.as_bytes()], &context)?;
    }

    info!(slot = handle.index(), listing = %listing, members = members.len(), "collection dropped");
    Ok(members.len())
}

fn member_names(items: Vec<RespValue>, listing: &str) -> SlotKvResult<Vec<String>> {
    items
        .into_iter()
        .map(|item| match item {
            RespValue::Bulk(data) => String::from_utf8(data).map_err(|_| SlotKvError::Encoding),
            _ => Err(SlotKvError::UnexpectedElementShape(listing.to_string())),
        })
        .collect()
}

// KEYS takes a glob; escape the prefix so only the trailing `*` is special.
fn escape_glob(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
