//! # Slot Client Facade
//!
//! Purpose: Expose the host-facing operations (connect, disconnect, command,
//! command_argv, push_record, drop_collection) over one slot table.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `SlotKv` hides slot locking, dispatch, and
//!    translation behind calls shaped like the host's arguments.
//! 2. **Host-Shaped Nulls**: Nullable host values arrive as `Option`s;
//!    required ones are checked here and fail with `InvalidArgument`.
//! 3. **Fail Fast**: Every error is terminal for the call. Nothing retries.

use slotkv_common::{Record, SlotKvError, SlotKvResult};

use crate::collection::{drop_collection, CollectionSelector};
use crate::config::ClientConfig;
use crate::dispatch::{send_fixed, send_variadic};
use crate::projector::{project, push_projection, KeySpec};
use crate::slots::{SlotTable, SlotTarget};
use crate::transport::Connector;

/// Slot-addressed store client.
///
/// Safe to share across threads: each slot serializes its own traffic.
pub struct SlotKv {
    slots: SlotTable,
}

impl SlotKv {
    /// Creates a client with default TCP settings.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client whose slots use the given TCP settings.
    pub fn with_config(config: ClientConfig) -> Self {
        SlotKv {
            slots: SlotTable::new(config),
        }
    }

    /// Creates a client with a custom connector.
    pub fn with_connector(connector: impl Connector + 'static) -> Self {
        SlotKv {
            slots: SlotTable::with_connector(connector),
        }
    }

    /// Opens slot `slot`, authenticating when `password` is non-empty and
    /// selecting `database` when non-zero.
    pub fn connect(
        &self,
        slot: i32,
        host: &str,
        port: i32,
        password: &str,
        database: i32,
        ignore_if_open: bool,
    ) -> SlotKvResult<()> {
        let target = SlotTarget {
            host,
            port,
            password,
            database,
        };
        self.slots.open(slot, &target, ignore_if_open)
    }

    /// Closes slot `slot`.
    pub fn disconnect(&self, slot: i32) -> SlotKvResult<()> {
        self.slots.close(slot)
    }

    /// Runs a command template with up to four positional arguments.
    pub fn command(&self, slot: i32, command: &str, args: &[Option<&str>]) -> SlotKvResult<String> {
        send_fixed(&self.slots, slot, command, args)
    }

    /// Runs a command given as a full argument vector.
    pub fn command_argv(&self, slot: i32, args: &[Option<&str>]) -> SlotKvResult<String> {
        send_variadic(&self.slots, slot, args)
    }

    /// Stores `record` as a hash keyed by `prefix` and the key field values.
    ///
    /// A null `push_keys` counts as false. When `keyset` is given the
    /// composite key is added to that set.
    pub fn push_record(
        &self,
        slot: i32,
        record: Option<&Record>,
        push_keys: Option<bool>,
        keyset: Option<&str>,
        prefix: Option<&str>,
        key_names: Option<&[Option<&str>]>,
    ) -> SlotKvResult<()> {
        let record = record.ok_or(SlotKvError::InvalidArgument("record"))?;
        let prefix = prefix.ok_or(SlotKvError::InvalidArgument("table prefix"))?;
        let key_names = key_names.ok_or(SlotKvError::InvalidArgument("list of key names"))?;

        let mut handle = self.slots.resolve(slot)?;
        let spec = KeySpec::new(key_names)?;
        let projection = project(record, &spec, prefix, push_keys.unwrap_or(false))?;
        push_projection(&mut handle, &projection, keyset)
    }

    /// Deletes a stored table by keyset or by key prefix; exactly one must be
    /// given.
    pub fn drop_collection(&self, slot: i32, keyset: Option<&str>, prefix: Option<&str>) -> SlotKvResult<()> {
        let selector = CollectionSelector::from_args(keyset, prefix)?;
        let mut handle = self.slots.resolve(slot)?;
        drop_collection(&mut handle, selector).map(|_| ())
    }

    /// Returns true when `slot` holds a live connection.
    pub fn is_open(&self, slot: i32) -> bool {
        self.slots.is_open(slot)
    }

    /// Direct access to the underlying slot table.
    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }
}

impl Default for SlotKv {
    fn default() -> Self {
        Self::new()
    }
}
