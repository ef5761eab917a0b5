//! # slotkv Client
//!
//! Purpose: Keep a small, fixed table of named connections to a
//! Redis-compatible store, forward caller commands through them, and turn the
//! store's typed replies into text.
//!
//! ## Design Principles
//! 1. **Fixed Slot Table**: Sixteen numbered slots, each EMPTY or OPEN.
//! 2. **Poison On Transport Failure**: A broken connection empties its slot;
//!    an error reply does not.
//! 3. **Total Translation**: Every reply variant maps to text or to a named
//!    error, never to partial output.
//! 4. **Synchronous**: Every call runs to completion on the calling thread.
//!
//! ## Layers
//!
//! ```text
//! SlotKv (facade)
//!   ├── projector   record -> DEL / HMSET / SADD
//!   ├── collection  SMEMBERS | KEYS -> DEL ...
//!   └── dispatch    template/argv -> one command -> reply
//!         ├── slots      per-slot lock, open/close/resolve
//!         ├── transport  TCP + RESP2
//!         └── reply      RespValue -> text
//! ```

mod client;
mod collection;
mod config;
mod dispatch;
mod projector;
mod reply;
mod resp;
mod slots;
mod transport;

#[cfg(test)]
mod testing;

pub use client::SlotKv;
pub use collection::{drop_collection, CollectionSelector};
pub use config::ClientConfig;
pub use dispatch::{expand_template, send, send_fixed, send_variadic};
pub use projector::{project, push_projection, KeySpec, Projection};
pub use reply::{translate, translate_array, NilRendering};
pub use resp::RespValue;
pub use slots::{SlotHandle, SlotTable, SlotTarget};
pub use transport::{Connector, TcpConnector, TcpTransport, Transport, TransportError};

pub use slotkv_common::{ErrorClass, Record, SlotKvError, SlotKvResult, NUM_SLOTS};
