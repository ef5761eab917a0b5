//! # Record Projection
//!
//! Purpose: Store a structured record as a hash under a composite key derived
//! from its key fields, optionally indexing that key in a keyset.
//!
//! ## Steps
//! 1. Validate the key field list (`KeySpec::new`).
//! 2. Walk live fields in declaration order, collecting key values and the
//!    flat field/value list (`project`). Pure; nothing is sent yet.
//! 3. `DEL key`, then `HMSET key f1 v1 f2 v2 ...`, then `SADD keyset key`
//!    (`push_projection`).
//!
//! ## Consistency
//! Steps in 3 are not atomic. A failure after `HMSET` leaves the record
//! written but missing from the keyset; it is reported, not rolled back.

use tracing::info;

use slotkv_common::{Record, SlotKvError, SlotKvResult};

use crate::dispatch::send;
use crate::slots::SlotHandle;

/// Separator between the prefix and each key value.
pub const KEY_SEPARATOR: char = ':';

/// Literal stored for null non-key values.
pub const NULL_VALUE: &str = "nil";

/// Validated, ordered list of key field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    names: Vec<String>,
}

impl KeySpec {
    /// Validates host-supplied key field names.
    ///
    /// # Errors
    /// `InvalidKeySpec` when the list is empty or holds a null or empty name.
    pub fn new(names: &[Option<&str>]) -> SlotKvResult<Self> {
        if names.is_empty() {
            return Err(SlotKvError::InvalidKeySpec("no key elements".into()));
        }
        let mut validated = Vec::with_capacity(names.len());
        for name in names {
            match name {
                None => return Err(SlotKvError::InvalidKeySpec("null key elements".into())),
                Some("") => return Err(SlotKvError::InvalidKeySpec("empty key elements".into())),
                Some(name) => validated.push(name.to_string()),
            }
        }
        Ok(KeySpec { names: validated })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.names.iter().position(|name| name == field)
    }
}

/// A record flattened for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// `prefix:value1:value2...`
    pub key: String,
    /// Field/value pairs in declaration order.
    pub values: Vec<(String, String)>,
}

/// Flattens `record` under `spec`.
///
/// The first key field is always stored among the values; the others only
/// when `include_keys` is set. Non-key fields are always stored, null ones as
/// `nil`.
pub fn project(
    record: &Record,
    spec: &KeySpec,
    prefix: &str,
    include_keys: bool,
) -> SlotKvResult<Projection> {
    let mut key_values: Vec<Option<String>> = vec![None; spec.names.len()];
    let mut values = Vec::with_capacity(record.len());

    for field in record.live_fields() {
        let rendered = field.value.render();
        let key_col = spec.position(&field.name);

        if let Some(col) = key_col {
            match &rendered {
                Some(text) => key_values[col] = Some(text.clone()),
                None => return Err(SlotKvError::NullKeyValue(field.name.clone())),
            }
        }
        if key_col.map_or(true, |col| col == 0 || include_keys) {
            values.push((
                field.name.clone(),
                rendered.unwrap_or_else(|| NULL_VALUE.to_string()),
            ));
        }
    }

    let mut key = String::from(prefix);
    for (name, value) in spec.names.iter().zip(&key_values) {
        let value = value
            .as_deref()
            .ok_or_else(|| SlotKvError::MissingKeyValue(name.clone()))?;
        key.push(KEY_SEPARATOR);
        key.push_str(value);
    }

    Ok(Projection { key, values })
}

/// Writes a projection through an open slot: clear, write, then index.
pub fn push_projection(
    handle: &mut SlotHandle<'_>,
    projection: &Projection,
    keyset: Option<&str>,
) -> SlotKvResult<()> {
    let key = projection.key.as_bytes();

    send(handle, &[b"DEL", key], "record delete failure")?;

    let mut args: Vec<&[u8]> = Vec::with_capacity(2 + projection.values.len() * 2);
    args.push(b"HMSET");
    args.push(key);
    for (field, value) in &projection.values {
        args.push(field.as_bytes());
        args.push(value.as_bytes());
    }
    send(handle, &args, "record push failure")?;

    if let Some(keyset) = keyset {
        send(handle, &[b"SADD", keyset.as_bytes(), key], "keyset add failure")?;
    }

    info!(
        slot = handle.index(),
        key = %projection.key,
        fields = projection.values.len(),
        keyset = keyset.unwrap_or("-"),
        "record pushed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::RespValue;
    use crate::slots::{SlotTable, SlotTarget};
    use crate::testing::{ScriptedConnector, Step};

    fn spec(names: &[&str]) -> KeySpec {
        let names: Vec<Option<&str>> = names.iter().map(|name| Some(*name)).collect();
        KeySpec::new(&names).unwrap()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn key_spec_validation() {
        assert!(matches!(KeySpec::new(&[]), Err(SlotKvError::InvalidKeySpec(_))));
        assert!(matches!(KeySpec::new(&[Some("id"), None]), Err(SlotKvError::InvalidKeySpec(_))));
        assert!(matches!(KeySpec::new(&[Some("")]), Err(SlotKvError::InvalidKeySpec(_))));
        assert_eq!(spec(&["a", "b"]).names(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn single_key_projection() {
        let record = Record::new().with("id", 1).with("name", "x");
        let projection = project(&record, &spec(&["id"]), "users", false).unwrap();
        assert_eq!(projection.key, "users:1");
        assert_eq!(projection.values, pairs(&[("id", "1"), ("name", "x")]));
    }

    #[test]
    fn secondary_keys_need_include_flag() {
        let record = Record::new()
            .with("region", "eu")
            .with("id", 9)
            .with("score", 1.5)
            .with("note", None::<&str>);
        let keys = spec(&["id", "region"]);

        let projection = project(&record, &keys, "t", false).unwrap();
        assert_eq!(projection.key, "t:9:eu");
        assert_eq!(projection.values, pairs(&[("id", "9"), ("score", "1.5"), ("note", "nil")]));

        let projection = project(&record, &keys, "t", true).unwrap();
        assert_eq!(
            projection.values,
            pairs(&[("region", "eu"), ("id", "9"), ("score", "1.5"), ("note", "nil")])
        );
    }

    #[test]
    fn dropped_fields_contribute_nothing() {
        let record = Record::new().with("id", 3).with_dropped("old").with("v", true);
        let projection = project(&record, &spec(&["id"]), "p", false).unwrap();
        assert_eq!(projection.values, pairs(&[("id", "3"), ("v", "t")]));

        // A dropped column cannot supply a key value.
        assert_eq!(
            project(&record, &spec(&["id", "old"]), "p", false),
            Err(SlotKvError::MissingKeyValue("old".into()))
        );
    }

    #[test]
    fn null_key_value_is_rejected() {
        let record = Record::new().with("id", None::<i64>).with("name", "x");
        assert_eq!(
            project(&record, &spec(&["id"]), "users", false),
            Err(SlotKvError::NullKeyValue("id".into()))
        );
    }

    #[test]
    fn missing_key_value_names_the_field() {
        let record = Record::new().with("id", 1);
        assert_eq!(
            project(&record, &spec(&["id", "tenant"]), "users", false),
            Err(SlotKvError::MissingKeyValue("tenant".into()))
        );
    }

    fn open(steps: Vec<Step>) -> (SlotTable, crate::testing::CommandLog) {
        let connector = ScriptedConnector::new(steps);
        let log = connector.log();
        let table = SlotTable::with_connector(connector);
        let target = SlotTarget {
            host: "localhost",
            port: 6379,
            password: "",
            database: 0,
        };
        table.open(0, &target, false).unwrap();
        (table, log)
    }

    #[test]
    fn push_issues_delete_write_and_keyset_add() {
        let (table, log) = open(vec![
            Step::Reply(RespValue::Integer(0)),
            Step::Reply(RespValue::status("OK")),
            Step::Reply(RespValue::Integer(1)),
        ]);
        let record = Record::new().with("id", 1).with("name", "x");
        let projection = project(&record, &spec(&["id"]), "users", false).unwrap();

        let mut handle = table.resolve(0).unwrap();
        push_projection(&mut handle, &projection, Some("users_keys")).unwrap();
        drop(handle);

        let log = log.lock();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], vec!["DEL", "users:1"]);
        assert_eq!(log[1], vec!["HMSET", "users:1", "id", "1", "name", "x"]);
        assert_eq!(log[2], vec!["SADD", "users_keys", "users:1"]);
    }

    #[test]
    fn push_failure_stops_before_keyset() {
        let (table, log) = open(vec![
            Step::Reply(RespValue::Integer(1)),
            Step::Reply(RespValue::Error(b"WRONGTYPE".to_vec())),
        ]);
        let projection = Projection {
            key: "k:1".into(),
            values: pairs(&[("a", "b")]),
        };

        let mut handle = table.resolve(0).unwrap();
        let err = push_projection(&mut handle, &projection, Some("ks")).unwrap_err();
        assert_eq!(err, SlotKvError::command("record push failure", "WRONGTYPE"));
        assert!(handle.is_valid());
        drop(handle);
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn keyset_failure_is_reported() {
        let (table, _) = open(vec![
            Step::Reply(RespValue::Integer(1)),
            Step::Reply(RespValue::status("OK")),
            Step::Fail,
        ]);
        let projection = Projection {
            key: "k:1".into(),
            values: pairs(&[("a", "b")]),
        };

        let mut handle = table.resolve(0).unwrap();
        let err = push_projection(&mut handle, &projection, Some("ks")).unwrap_err();
        assert!(matches!(err, SlotKvError::Transport { ref context, .. } if context == "keyset add failure"));
        drop(handle);
        assert!(!table.is_open(0));
    }
}
