//! # Error Taxonomy
//!
//! Purpose: Give every failure of the slot client a named variant with a
//! human-readable message, and classify it by what it does to slot state.
//!
//! ## Classes
//!
//! | Class         | Slot state afterwards | Examples                          |
//! |---------------|-----------------------|-----------------------------------|
//! | `Validation`  | unchanged             | bad slot index, bad arity         |
//! | `Transport`   | slot forced EMPTY     | socket closed mid-reply           |
//! | `Command`     | slot stays OPEN       | `-ERR wrong number of arguments`  |
//! | `Translation` | slot stays OPEN       | invalid UTF-8, nested array reply |
//!
//! Nothing is retried. Messages combine a fixed context phrase with the
//! transport or store text, e.g. `record push failure: ERR ...`.

use thiserror::Error;

use crate::NUM_SLOTS;

/// Result alias used across the slotkv crates.
pub type SlotKvResult<T> = Result<T, SlotKvError>;

/// Coarse failure class, see the module table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Transport,
    Command,
    Translation,
}

/// Errors surfaced by slot management, dispatch, and translation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotKvError {
    #[error("slot index {0} out of range: must be between 0 and {}", NUM_SLOTS - 1)]
    InvalidSlotIndex(i32),

    #[error("connection number {0} is already open")]
    SlotAlreadyOpen(i32),

    #[error("connection number {0} is not open")]
    SlotNotOpen(i32),

    #[error("failed to connect to redis at {host}:{port}: {message}")]
    ConnectFailure {
        host: String,
        port: i32,
        message: String,
    },

    #[error("authentication failure: {0}")]
    AuthFailure(String),

    #[error("selecting db failure: {0}")]
    SelectFailure(String),

    /// The fixed-arity path accepts at most four positional arguments.
    #[error("unsupported number of command parameters: {0} (can have 0 - 4); use command_argv instead")]
    UnsupportedArity(usize),

    #[error("command required")]
    CommandRequired,

    /// The connection is unusable; the slot has been invalidated.
    #[error("{context}: {message}")]
    Transport { context: String, message: String },

    /// The store executed the command and replied with an error.
    #[error("{context}: {message}")]
    Command { context: String, message: String },

    #[error("invalid UTF-8 in reply payload")]
    Encoding,

    #[error("nested array replies are not supported")]
    UnsupportedNestedArray,

    #[error("invalid key specification: {0}")]
    InvalidKeySpec(String),

    #[error("null value for key field {0}")]
    NullKeyValue(String),

    #[error("key value for {0} not found")]
    MissingKeyValue(String),

    #[error("must have exactly one keyset or prefix argument not null")]
    AmbiguousSelector,

    #[error("unexpected reply type for {0}")]
    UnexpectedReplyShape(String),

    #[error("unexpected reply element type in {0}")]
    UnexpectedElementShape(String),

    /// A required host argument was null.
    #[error("must provide non-null {0}")]
    InvalidArgument(&'static str),
}

impl SlotKvError {
    /// Builds a transport failure with the given context phrase.
    pub fn transport(context: impl Into<String>, message: impl Into<String>) -> Self {
        SlotKvError::Transport {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Builds a command failure with the given context phrase.
    pub fn command(context: impl Into<String>, message: impl Into<String>) -> Self {
        SlotKvError::Command {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Returns the failure class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            SlotKvError::Transport { .. } | SlotKvError::ConnectFailure { .. } => {
                ErrorClass::Transport
            }
            SlotKvError::Command { .. }
            | SlotKvError::AuthFailure(_)
            | SlotKvError::SelectFailure(_) => ErrorClass::Command,
            SlotKvError::Encoding
            | SlotKvError::UnsupportedNestedArray
            | SlotKvError::UnexpectedReplyShape(_)
            | SlotKvError::UnexpectedElementShape(_) => ErrorClass::Translation,
            SlotKvError::InvalidSlotIndex(_)
            | SlotKvError::SlotAlreadyOpen(_)
            | SlotKvError::SlotNotOpen(_)
            | SlotKvError::UnsupportedArity(_)
            | SlotKvError::CommandRequired
            | SlotKvError::InvalidKeySpec(_)
            | SlotKvError::NullKeyValue(_)
            | SlotKvError::MissingKeyValue(_)
            | SlotKvError::AmbiguousSelector
            | SlotKvError::InvalidArgument(_) => ErrorClass::Validation,
        }
    }

    /// Returns true when the error left the slot invalidated.
    #[inline]
    pub fn poisons_slot(&self) -> bool {
        matches!(self, SlotKvError::Transport { .. })
    }
}
