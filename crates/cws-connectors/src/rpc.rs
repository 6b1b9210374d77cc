//! RPC transport.
//!
//! Every call posts a typed envelope `{ authentication, <fields> }` to the
//! asset operation service, named after the remote procedure, and unwraps
//! the `<procedure>Return` member of the reply.

use crate::asset_type::AssetTypeTable;
use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::http::{AuthPlacement, HttpClient};
use crate::operation::Operation;
use crate::reply::{decode_batch, decode_single};
use crate::traits::{
    AssetOperations, CascadeError, CascadeResult, LastReply, OperationResult, Protocol,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Path of the asset operation service below the instance root.
pub const SERVICE_PATH: &str = "ws/services/AssetOperationService";

/// Client speaking the typed RPC protocol.
pub struct RpcClient {
    http: HttpClient,
    credentials: Credentials,
    types: Arc<AssetTypeTable>,
    last: LastReply,
}

impl RpcClient {
    pub fn new(config: &ClientConfig, types: Arc<AssetTypeTable>) -> CascadeResult<Self> {
        let http = HttpClient::new(config)?;
        info!(client = %config.name, base_url = %config.base_url, "RPC client initialized");
        Ok(Self {
            http,
            credentials: config.credentials.clone(),
            types,
            last: LastReply::default(),
        })
    }

    /// The typed envelope for `operation`.
    pub fn envelope(&self, operation: &Operation) -> CascadeResult<Value> {
        let request = operation.wire_request()?;
        let mut envelope = Map::new();
        envelope.insert(
            "authentication".to_string(),
            self.credentials.rpc_authentication(),
        );
        envelope.extend(request.to_envelope_fields());
        Ok(Value::Object(envelope))
    }

    /// Extracts and decodes `<procedure>Return` from a reply.
    pub fn unwrap_reply(&self, operation: &Operation, reply: &Value) -> CascadeResult<OperationResult> {
        let key = format!("{}Return", operation.name());
        let returned = reply.get(&key).ok_or_else(|| {
            CascadeError::InvalidResponse(format!("Reply has no '{}' member", key))
        })?;
        match operation {
            Operation::Batch { operations } => decode_batch(returned, operations),
            _ => decode_single(&self.types, operation, returned),
        }
    }
}

#[async_trait]
impl AssetOperations for RpcClient {
    fn protocol(&self) -> Protocol {
        Protocol::Rpc
    }

    fn type_table(&self) -> &AssetTypeTable {
        &self.types
    }

    #[instrument(skip(self, operation), fields(operation = operation.name()))]
    async fn perform(&self, operation: Operation) -> CascadeResult<OperationResult> {
        let envelope = self.envelope(&operation)?;
        let url = self.http.endpoint(&[SERVICE_PATH, operation.name()])?;
        debug!(%url, "Invoking remote procedure");

        let reply = self.http.post_json(url, &envelope, AuthPlacement::None).await?;
        let result = self.unwrap_reply(&operation, &reply)?;
        self.last.record(&result, Some(reply));
        operation.escalate(result)
    }

    fn is_successful(&self) -> bool {
        self.last.success()
    }

    fn last_message(&self) -> Option<String> {
        self.last.message()
    }

    fn last_raw_reply(&self) -> Option<Value> {
        self.last.raw()
    }
}
