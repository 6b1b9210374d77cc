//! # cws-connectors
//!
//! Client plumbing for the Cascade web-service API.
//!
//! This crate resolves identifiers, models the remote operation set, and
//! executes operations over either wire protocol behind one
//! [`AssetOperations`] contract. It also discovers an asset's concrete type
//! from a bare id.

pub mod asset_type;
pub mod config;
pub mod credentials;
pub mod http;
pub mod identifier;
pub mod mock;
pub mod operation;
pub mod prober;
pub mod reply;
pub mod rest;
pub mod rpc;
#[cfg(test)]
mod stub_server;
pub mod testing;
pub mod traits;

use std::sync::Arc;

pub use asset_type::{AssetType, AssetTypeTable, ChildSource, TypeInfo, BLOCK_TYPES, FORMAT_TYPES};
pub use config::{ClientConfig, RestAuth};
pub use credentials::{Credentials, SecureString};
pub use identifier::{is_hex_id, resolve, Identifier, Locator};
pub use mock::MockTransport;
pub use operation::{AuditQuery, MessageMark, MutationKind, Operation, SearchQuery};
pub use prober::{probe_any_type, probe_block_type, probe_format_type, probe_type, ProbeOutcome};
pub use rest::RestClient;
pub use rpc::RpcClient;
pub use traits::{AssetOperations, CascadeError, CascadeResult, OperationResult, Protocol};

/// Builds the transport `config.protocol` selects.
pub fn connect(config: &ClientConfig) -> CascadeResult<Arc<dyn AssetOperations>> {
    let types = AssetTypeTable::shared();
    let client: Arc<dyn AssetOperations> = match config.protocol {
        Protocol::Rpc => Arc::new(RpcClient::new(config, types)?),
        Protocol::Rest => Arc::new(RestClient::new(config, types)?),
    };
    Ok(client)
}
