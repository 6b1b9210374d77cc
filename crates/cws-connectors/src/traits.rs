//! Transport contract for the Cascade web-service API.
//!
//! This module defines the error type shared by every layer of the workspace,
//! the normalized [`OperationResult`] both transports produce, and the
//! [`AssetOperations`] trait the RPC, HTTP+JSON and mock transports implement.

use crate::asset_type::AssetTypeTable;
use crate::identifier::Identifier;
use crate::operation::Operation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use thiserror::Error;

/// Errors raised by identifier resolution, transports and the layers above them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CascadeError {
    #[error("Empty value: {0}")]
    EmptyValue(String),

    #[error("Unacceptable value: {0}")]
    UnacceptableValue(String),

    #[error("Null asset: {0}")]
    NullAsset(String),

    #[error("Null service: {0}")]
    NullService(String),

    #[error("Wrong asset type: expected {expected}, got {actual}")]
    WrongAssetType { expected: String, actual: String },

    #[error("Editing failed: {0}")]
    EditingFailure(String),

    #[error("Renaming failed: {0}")]
    RenamingFailure(String),

    #[error("Deleting failed: {0}")]
    DeletingFailure(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("No such type: {0}")]
    NoSuchType(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Result type for every fallible call in the workspace.
pub type CascadeResult<T> = Result<T, CascadeError>;

/// Wire protocol a transport speaks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Typed RPC envelopes posted to the asset operation service.
    Rpc,
    /// Positional URL segments plus JSON bodies.
    #[default]
    Rest,
}

/// Normalized outcome of one remote operation.
///
/// `entries` is only populated for a batch, one entry per sub-operation in
/// submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: Option<String>,
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<OperationResult>,
}

impl OperationResult {
    /// A successful result carrying `payload`.
    pub fn success(payload: Option<Value>) -> Self {
        Self {
            success: true,
            message: None,
            payload,
            entries: Vec::new(),
        }
    }

    /// A remote-reported failure.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            payload: None,
            entries: Vec::new(),
        }
    }

    /// A batch result wrapping ordered sub-results.
    pub fn batch(entries: Vec<OperationResult>) -> Self {
        Self {
            success: entries.iter().all(|e| e.success),
            message: None,
            payload: None,
            entries,
        }
    }

    /// Decodes the common `{ success, message, ...rest }` reply shape.
    ///
    /// `success` arrives as a JSON boolean from the HTTP+JSON service and as
    /// the strings `"true"`/`"false"` from the RPC service. Every other key
    /// is kept as the payload object.
    pub fn from_reply(reply: &Value) -> CascadeResult<Self> {
        let object = reply.as_object().ok_or_else(|| {
            CascadeError::InvalidResponse(format!("Expected an object reply, got {}", reply))
        })?;

        let success = match object.get("success") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            other => {
                return Err(CascadeError::InvalidResponse(format!(
                    "Reply has no usable success flag: {:?}",
                    other
                )))
            }
        };

        let message = object
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(String::from);

        let rest: serde_json::Map<String, Value> = object
            .iter()
            .filter(|(k, _)| k.as_str() != "success" && k.as_str() != "message")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            success,
            message,
            payload: if rest.is_empty() {
                None
            } else {
                Some(Value::Object(rest))
            },
            entries: Vec::new(),
        })
    }
}

/// Uniform operation-dispatch contract over the Cascade web services.
///
/// Non-mutating calls return remote `success=false` as data. Edit, move and
/// delete escalate it to [`CascadeError::EditingFailure`],
/// [`CascadeError::RenamingFailure`] and [`CascadeError::DeletingFailure`].
#[async_trait]
pub trait AssetOperations: Send + Sync {
    /// Returns the wire protocol this transport speaks.
    fn protocol(&self) -> Protocol;

    /// Returns the type/property table this transport normalizes reads with.
    fn type_table(&self) -> &AssetTypeTable;

    /// Executes one remote operation.
    async fn perform(&self, operation: Operation) -> CascadeResult<OperationResult>;

    /// Whether the most recent call reported success.
    fn is_successful(&self) -> bool;

    /// Message attached to the most recent reply, if any.
    fn last_message(&self) -> Option<String>;

    /// The most recent reply exactly as decoded from the wire.
    fn last_raw_reply(&self) -> Option<Value>;

    /// Reads one asset; the payload is the asset's own property object.
    async fn read(&self, identifier: &Identifier) -> CascadeResult<OperationResult> {
        self.perform(Operation::Read {
            identifier: identifier.clone(),
        })
        .await
    }

    /// Edits an asset given its `{ <property>: {...} }` envelope.
    async fn edit(&self, asset: Value) -> CascadeResult<OperationResult> {
        self.perform(Operation::Edit { asset }).await
    }

    /// Deletes an asset.
    async fn delete(&self, identifier: &Identifier) -> CascadeResult<OperationResult> {
        self.perform(Operation::Delete {
            identifier: identifier.clone(),
        })
        .await
    }

    /// Renames an asset in place.
    async fn rename(&self, identifier: &Identifier, new_name: &str) -> CascadeResult<OperationResult> {
        self.perform(Operation::Move {
            identifier: identifier.clone(),
            destination: None,
            new_name: Some(new_name.to_string()),
        })
        .await
    }

    /// Submits sub-operations as one round trip; results keep input order.
    async fn batch(&self, operations: Vec<Operation>) -> CascadeResult<Vec<OperationResult>> {
        let result = self.perform(Operation::Batch { operations }).await?;
        Ok(result.entries)
    }
}

/// Bookkeeping for `is_successful`, `last_message` and `last_raw_reply`.
#[derive(Debug, Default)]
pub struct LastReply {
    state: Mutex<LastReplyState>,
}

#[derive(Debug, Default, Clone)]
struct LastReplyState {
    success: bool,
    message: Option<String>,
    raw: Option<Value>,
}

impl LastReply {
    /// Records the outcome of a call.
    pub fn record(&self, result: &OperationResult, raw: Option<Value>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.success = result.success;
        state.message = result.message.clone();
        state.raw = raw;
    }

    pub fn success(&self) -> bool {
        self.state.lock().map(|s| s.success).unwrap_or(false)
    }

    pub fn message(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.message.clone())
    }

    pub fn raw(&self) -> Option<Value> {
        self.state.lock().ok().and_then(|s| s.raw.clone())
    }
}
