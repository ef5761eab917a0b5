//! # Slot Table
//!
//! Purpose: Own a fixed set of numbered connection slots, each EMPTY or OPEN,
//! and hand out exclusive access to a slot's live connection.
//!
//! ## Design Principles
//! 1. **Explicit Context**: The table is a plain value owned by the caller,
//!    not process-global state.
//! 2. **Per-Slot Locking**: Every slot has its own mutex. Open/close hold it
//!    for the whole transition; command traffic holds it for the whole
//!    request/reply exchange, so one slot never blocks another.
//! 3. **Build Then Publish**: A connection is stored only after connect, AUTH
//!    and SELECT all succeed; a half-built connection is dropped.
//!
//! ## Lifecycle
//!
//! ```text
//!            open (connect + AUTH + SELECT ok)
//!   EMPTY ───────────────────────────────────────▶ OPEN
//!     ▲                                             │
//!     └──── close, or transport failure in use ◀────┘
//! ```

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use slotkv_common::{SlotKvError, SlotKvResult, NUM_SLOTS};

use crate::config::ClientConfig;
use crate::resp::RespValue;
use crate::transport::{Connector, TcpConnector, Transport, TransportError};

type SlotCell = Mutex<Option<Box<dyn Transport>>>;

/// Where and how to open a slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotTarget<'a> {
    pub host: &'a str,
    pub port: i32,
    /// Empty means no AUTH.
    pub password: &'a str,
    /// Zero means no SELECT.
    pub database: i32,
}

/// Fixed-size registry of connection slots.
pub struct SlotTable {
    slots: [SlotCell; NUM_SLOTS],
    connector: Box<dyn Connector>,
}

impl SlotTable {
    /// Creates a table whose slots open TCP connections with `config`.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(TcpConnector::new(config))
    }

    /// Creates a table with a custom connector.
    pub fn with_connector(connector: impl Connector + 'static) -> Self {
        SlotTable {
            slots: std::array::from_fn(|_| Mutex::new(None)),
            connector: Box::new(connector),
        }
    }

    /// Opens slot `index`.
    ///
    /// Already-open slots are left untouched: the call succeeds when
    /// `ignore_if_open` is set and fails with `SlotAlreadyOpen` otherwise.
    pub fn open(&self, index: i32, target: &SlotTarget<'_>, ignore_if_open: bool) -> SlotKvResult<()> {
        let mut slot = self.cell(index)?.lock();
        if slot.is_some() {
            if ignore_if_open {
                debug!(slot = index, "slot already open, ignoring");
                return Ok(());
            }
            return Err(SlotKvError::SlotAlreadyOpen(index));
        }

        let connect_failure = |message: String| SlotKvError::ConnectFailure {
            host: target.host.to_string(),
            port: target.port,
            message,
        };
        let port = u16::try_from(target.port)
            .map_err(|_| connect_failure("port out of range".to_string()))?;
        let mut conn = self
            .connector
            .connect(target.host, port)
            .map_err(|err| connect_failure(err.to_string()))?;

        // Any failure below drops `conn`, releasing the half-built connection.
        if !target.password.is_empty() {
            handshake(conn.as_mut(), &[b"AUTH", target.password.as_bytes()])
                .map_err(SlotKvError::AuthFailure)?;
        }
        if target.database != 0 {
            let db = target.database.to_string();
            handshake(conn.as_mut(), &[b"SELECT", db.as_bytes()])
                .map_err(SlotKvError::SelectFailure)?;
        }

        *slot = Some(conn);
        debug!(slot = index, host = target.host, port, db = target.database, "slot opened");
        Ok(())
    }

    /// Closes slot `index`, dropping its connection.
    pub fn close(&self, index: i32) -> SlotKvResult<()> {
        let mut slot = self.cell(index)?.lock();
        match slot.take() {
            Some(_) => {
                debug!(slot = index, "slot closed");
                Ok(())
            }
            None => Err(SlotKvError::SlotNotOpen(index)),
        }
    }

    /// Locks slot `index` and returns its live connection.
    ///
    /// Every command-issuing operation passes through here first. The slot
    /// stays locked until the returned handle is dropped.
    pub fn resolve(&self, index: i32) -> SlotKvResult<SlotHandle<'_>> {
        let guard = self.cell(index)?.lock();
        if guard.is_none() {
            return Err(SlotKvError::SlotNotOpen(index));
        }
        Ok(SlotHandle { index, guard })
    }

    /// Returns true when slot `index` holds a live connection.
    ///
    /// Out-of-range indexes report false.
    pub fn is_open(&self, index: i32) -> bool {
        self.cell(index).map(|cell| cell.lock().is_some()).unwrap_or(false)
    }

    fn cell(&self, index: i32) -> SlotKvResult<&SlotCell> {
        usize::try_from(index)
            .ok()
            .and_then(|idx| self.slots.get(idx))
            .ok_or(SlotKvError::InvalidSlotIndex(index))
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

fn handshake(conn: &mut dyn Transport, args: &[&[u8]]) -> Result<(), String> {
    match conn.exec(args) {
        Ok(RespValue::Error(message)) => Err(String::from_utf8_lossy(&message).into_owned()),
        Ok(_) => Ok(()),
        Err(err) => Err(err.to_string()),
    }
}

/// Exclusive access to one OPEN slot.
pub struct SlotHandle<'a> {
    index: i32,
    guard: MutexGuard<'a, Option<Box<dyn Transport>>>,
}

impl SlotHandle<'_> {
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Sends one command over the slot's connection.
    ///
    /// Returns `TransportError::Closed` once the handle has been invalidated.
    pub fn exec(&mut self, args: &[&[u8]]) -> Result<RespValue, TransportError> {
        match self.guard.as_mut() {
            Some(conn) => conn.exec(args),
            None => Err(TransportError::Closed),
        }
    }

    /// Drops the connection and marks the slot EMPTY.
    pub fn invalidate(&mut self) {
        *self.guard = None;
    }

    pub fn is_valid(&self) -> bool {
        self.guard.is_some()
    }
}
