//! Pool ↔ worker message format.
//!
//! Each message is one line of JSON. The pool writes exactly one message to
//! the worker's stdin; the worker writes exactly one reply to its stdout.
//!
//! ```text
//! pool → worker   {"name":"run","config":{...},"navigation":{...}}
//! worker → pool   {"result":{"inputPath":"...","outputPath":"..."}}
//!             or  {"error":"Unable to read ...: No such file or directory"}
//! ```
//!
//! Anything else on either side is a protocol error.

use crate::types::{BuildConfig, BuildContext, PageOutput};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The only message a worker accepts.
pub const RUN: &str = "run";

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown message '{0}'")]
    UnknownMessage(String),
    #[error("reply carries neither a result nor an error")]
    EmptyReply,
}

/// Pool → worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMessage {
    pub name: String,
    pub config: BuildConfig,
    pub navigation: crate::nav::Navigation,
}

impl RunMessage {
    pub fn new(context: &BuildContext) -> Self {
        Self {
            name: RUN.to_string(),
            config: context.config.clone(),
            navigation: context.navigation.clone(),
        }
    }

    pub fn into_context(self) -> BuildContext {
        BuildContext {
            config: self.config,
            navigation: self.navigation,
        }
    }
}

/// Worker → pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PageOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerMessage {
    pub fn result(output: PageOutput) -> Self {
        Self {
            result: Some(output),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }

    /// The reply as a single line, without the trailing newline.
    pub fn to_line(&self) -> String {
        // A struct of strings and paths always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"error":"unserializable reply"}"#.into())
    }

    /// `Ok` for a result, `Err` with the worker's message for an error reply.
    pub fn into_outcome(self) -> Result<Result<PageOutput, String>, ProtocolError> {
        match (self.result, self.error) {
            (Some(output), _) => Ok(Ok(output)),
            (None, Some(message)) => Ok(Err(message)),
            (None, None) => Err(ProtocolError::EmptyReply),
        }
    }
}

/// Serialize the run message for `context`.
pub fn encode_run(context: &BuildContext) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&RunMessage::new(context))?)
}

/// Parse a line the pool sent. Only `run` is accepted.
pub fn decode_run(line: &str) -> Result<BuildContext, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    let name = value
        .get("name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    if name != RUN {
        return Err(ProtocolError::UnknownMessage(name.to_string()));
    }
    let message: RunMessage = serde_json::from_value(value)?;
    Ok(message.into_context())
}

/// Parse the line a worker replied with.
pub fn decode_reply(line: &str) -> Result<Result<PageOutput, String>, ProtocolError> {
    let message: WorkerMessage = serde_json::from_str(line)?;
    message.into_outcome()
}
