//! Scripted connector for unit tests: replays canned replies and records
//! every command it receives.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::resp::RespValue;
use crate::transport::{Connector, Transport, TransportError};

pub(crate) type CommandLog = Arc<Mutex<Vec<Vec<String>>>>;

/// One scripted exchange.
pub(crate) enum Step {
    Reply(RespValue),
    /// Break the connection: the exec call returns an io error.
    Fail,
}

/// Every connection it opens shares one script and one log.
#[derive(Clone)]
pub(crate) struct ScriptedConnector {
    script: Arc<Mutex<VecDeque<Step>>>,
    log: CommandLog,
    connects: Arc<AtomicUsize>,
    refuse: bool,
}

impl ScriptedConnector {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        ScriptedConnector {
            script: Arc::new(Mutex::new(steps.into())),
            log: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(AtomicUsize::new(0)),
            refuse: false,
        }
    }

    pub(crate) fn refusing() -> Self {
        ScriptedConnector {
            refuse: true,
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn log(&self) -> CommandLog {
        self.log.clone()
    }

    pub(crate) fn connect_count(&self) -> Arc<AtomicUsize> {
        self.connects.clone()
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, _host: &str, _port: u16) -> Result<Box<dyn Transport>, TransportError> {
        if self.refuse {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedTransport {
            script: self.script.clone(),
            log: self.log.clone(),
        }))
    }
}

struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Step>>>,
    log: CommandLog,
}

impl Transport for ScriptedTransport {
    fn exec(&mut self, args: &[&[u8]]) -> Result<RespValue, TransportError> {
        self.log.lock().push(
            args.iter()
                .map(|arg| String::from_utf8_lossy(arg).into_owned())
                .collect(),
        );
        // An exhausted script answers +OK.
        match self.script.lock().pop_front() {
            Some(Step::Reply(value)) => Ok(value),
            Some(Step::Fail) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "broken pipe",
            ))),
            None => Ok(RespValue::status("OK")),
        }
    }
}
