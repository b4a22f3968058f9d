//! Scripted relay used by unit tests across the crate.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::relay::{Command, CommandRelay, Credentials, RelayRequest};
use crate::{Error, Result};

enum Scripted {
    Ok(Value),
    Provider(String),
    Timeout,
}

/// Relay answering from per-command queues and recording every request.
#[derive(Default)]
pub struct ScriptedRelay {
    responses: Mutex<HashMap<Command, VecDeque<Scripted>>>,
    requests: Mutex<Vec<RelayRequest>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedRelay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, command: Command, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .entry(command)
            .or_default()
            .push_back(response);
    }

    pub fn push_ok(&self, command: Command, payload: Value) {
        self.push(command, Scripted::Ok(payload));
    }

    pub fn push_error(&self, command: Command, message: &str) {
        self.push(command, Scripted::Provider(message.to_string()));
    }

    pub fn push_timeout(&self, command: Command) {
        self.push(command, Scripted::Timeout);
    }

    /// Hold every call until the returned handle is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub fn requests(&self) -> Vec<RelayRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, command: Command) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.command() == command)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandRelay for ScriptedRelay {
    async fn execute(&self, _credentials: &Credentials, request: &RelayRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&request.command())
            .and_then(VecDeque::pop_front);

        match next {
            Some(Scripted::Ok(payload)) => Ok(payload),
            Some(Scripted::Provider(message)) => Err(Error::Provider(message)),
            Some(Scripted::Timeout) => Err(Error::Timeout("scripted timeout".into())),
            None => Err(Error::Provider(format!(
                "no scripted response for {}",
                request.command()
            ))),
        }
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("alice", "s3cret").unwrap()
}
