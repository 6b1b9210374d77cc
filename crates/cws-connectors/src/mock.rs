//! In-memory transport for testing.
//!
//! Holds assets keyed by id and by `site:path`, answers reads, batches and
//! the mutating calls the way the service does, and records every operation
//! it is asked to perform.

use crate::asset_type::{AssetType, AssetTypeTable};
use crate::identifier::{Identifier, Locator};
use crate::operation::Operation;
use crate::traits::{
    AssetOperations, CascadeError, CascadeResult, LastReply, OperationResult, Protocol,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

const NOT_FOUND: &str = "Unable to identify an entity based on provided entity path or id";

#[derive(Debug, Clone)]
struct StoredAsset {
    asset_type: AssetType,
    data: Value,
}

#[derive(Debug, Default)]
struct MockState {
    assets: HashMap<String, StoredAsset>,
    paths: HashMap<(String, String), String>,
    aliases: HashSet<(String, AssetType)>,
    failures: HashMap<&'static str, String>,
    performed: Vec<Operation>,
    next_id: u64,
}

/// Mock transport for testing.
pub struct MockTransport {
    types: Arc<AssetTypeTable>,
    protocol: Protocol,
    state: Mutex<MockState>,
    last: LastReply,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn path_key(site_name: Option<&str>, path: &str) -> (String, String) {
    (
        site_name.unwrap_or_default().to_string(),
        path.trim_matches('/').to_string(),
    )
}

impl MockTransport {
    /// Creates an empty mock speaking the RPC protocol.
    pub fn new() -> Self {
        Self {
            types: AssetTypeTable::shared(),
            protocol: Protocol::Rpc,
            state: Mutex::new(MockState::default()),
            last: LastReply::default(),
        }
    }

    /// Makes the mock behave like the given protocol (batch is refused over REST).
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores an asset. `data` must carry `id`; `path` and `siteName` index it by path.
    pub fn insert(&self, asset_type: AssetType, data: Value) -> String {
        let id = data
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let mut state = self.state();
        if let Some(path) = data.get("path").and_then(|v| v.as_str()) {
            let site = data.get("siteName").and_then(|v| v.as_str());
            state.paths.insert(path_key(site, path), id.clone());
        }
        state
            .assets
            .insert(id.clone(), StoredAsset { asset_type, data });
        id
    }

    /// Lets reads of `id` as `asset_type` succeed as well as reads as its stored type.
    pub fn add_type_alias(&self, id: &str, asset_type: AssetType) {
        self.state().aliases.insert((id.to_string(), asset_type));
    }

    /// Makes every call to the named operation report `success=false`.
    pub fn fail_operation(&self, name: &'static str, message: &str) {
        self.state().failures.insert(name, message.to_string());
    }

    /// Every operation performed so far, in order.
    pub fn performed(&self) -> Vec<Operation> {
        self.state().performed.clone()
    }

    /// Number of performed operations with the given wire name.
    pub fn count(&self, name: &str) -> usize {
        self.state()
            .performed
            .iter()
            .filter(|op| op.name() == name)
            .count()
    }

    /// The stored payload for `id`, if any.
    pub fn stored(&self, id: &str) -> Option<Value> {
        self.state().assets.get(id).map(|a| a.data.clone())
    }

    fn locate(state: &MockState, identifier: &Identifier) -> Option<(String, StoredAsset)> {
        let id = match &identifier.locator {
            Locator::ById(id) => id.clone(),
            Locator::ByPath { path, site_name } => state
                .paths
                .get(&path_key(site_name.as_deref(), path))?
                .clone(),
        };
        let stored = state.assets.get(&id)?;
        let type_ok = stored.asset_type == identifier.asset_type
            || state.aliases.contains(&(id.clone(), identifier.asset_type));
        type_ok.then(|| (id, stored.clone()))
    }

    fn apply(
        &self,
        state: &mut MockState,
        operation: &Operation,
        in_batch: bool,
    ) -> CascadeResult<OperationResult> {
        if let Some(message) = state.failures.get(operation.name()) {
            return Ok(OperationResult::failure(message.clone()));
        }

        let result = match operation {
            Operation::Read { identifier } => match Self::locate(state, identifier) {
                Some((_, stored)) if in_batch => {
                    let property = self.types.property(identifier.asset_type)?;
                    OperationResult::success(Some(json!({ property: stored.data })))
                }
                Some((_, stored)) => OperationResult::success(Some(stored.data)),
                None => OperationResult::failure(NOT_FOUND),
            },

            Operation::Create { asset } | Operation::Edit { asset } => {
                let (property, body) = asset
                    .as_object()
                    .and_then(|m| m.iter().next())
                    .ok_or_else(|| CascadeError::NullAsset("Empty asset envelope".into()))?;
                let asset_type = self.types.type_for_property(property).ok_or_else(|| {
                    CascadeError::NoSuchType(format!("No type uses property '{}'", property))
                })?;

                if matches!(operation, Operation::Create { .. }) {
                    state.next_id += 1;
                    let id = format!("{:032x}", state.next_id);
                    let mut data = body.clone();
                    data["id"] = json!(id);
                    state
                        .assets
                        .insert(id.clone(), StoredAsset { asset_type, data });
                    OperationResult::success(Some(json!({ "createdAssetId": id })))
                } else {
                    let id = body.get("id").and_then(|v| v.as_str()).unwrap_or_default();
                    match state.assets.get_mut(id) {
                        Some(stored) if stored.asset_type == asset_type => {
                            stored.data = body.clone();
                            OperationResult::success(None)
                        }
                        _ => OperationResult::failure(NOT_FOUND),
                    }
                }
            }

            Operation::Delete { identifier } => match Self::locate(state, identifier) {
                Some((id, _)) => {
                    state.assets.remove(&id);
                    state.paths.retain(|_, v| *v != id);
                    OperationResult::success(None)
                }
                None => OperationResult::failure(NOT_FOUND),
            },

            Operation::Move {
                identifier,
                new_name,
                ..
            } => match (Self::locate(state, identifier), new_name) {
                (Some((id, _)), Some(name)) => {
                    if let Some(stored) = state.assets.get_mut(&id) {
                        stored.data["name"] = json!(name);
                    }
                    OperationResult::success(None)
                }
                (Some(_), None) => OperationResult::success(None),
                (None, _) => OperationResult::failure(NOT_FOUND),
            },

            Operation::Batch { operations } => {
                let entries = operations
                    .iter()
                    .map(|op| self.apply(state, op, true))
                    .collect::<CascadeResult<Vec<_>>>()?;
                OperationResult::batch(entries)
            }

            _ => OperationResult::success(None),
        };
        Ok(result)
    }
}

#[async_trait]
impl AssetOperations for MockTransport {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn type_table(&self) -> &AssetTypeTable {
        &self.types
    }

    async fn perform(&self, operation: Operation) -> CascadeResult<OperationResult> {
        operation.wire_request()?;
        if self.protocol == Protocol::Rest && matches!(operation, Operation::Batch { .. }) {
            return Err(CascadeError::Unsupported(
                "batch is not available over the HTTP+JSON protocol".to_string(),
            ));
        }

        let result = {
            let mut state = self.state();
            state.performed.push(operation.clone());
            self.apply(&mut state, &operation, false)?
        };

        let raw = serde_json::to_value(&result).ok();
        self.last.record(&result, raw);
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
