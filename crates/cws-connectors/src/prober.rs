//! Type discovery for bare ids.
//!
//! One read per candidate type is bundled into a single batch; the first
//! entry reporting success decides, and the concrete type is whichever
//! candidate's property appears on that entry's `asset` envelope.

use crate::asset_type::{AssetType, BLOCK_TYPES, FORMAT_TYPES};
use crate::identifier::Identifier;
use crate::operation::Operation;
use crate::traits::{AssetOperations, CascadeError, CascadeResult};
use tracing::{debug, warn};

/// Outcome of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Resolved(AssetType),
    Unknown,
}

impl ProbeOutcome {
    pub fn asset_type(&self) -> Option<AssetType> {
        match self {
            ProbeOutcome::Resolved(t) => Some(*t),
            ProbeOutcome::Unknown => None,
        }
    }
}

/// Discovers which of `candidates` the asset `id` is.
///
/// Candidates are tried in the order given and the first successful batch
/// entry wins. More than one success is logged but does not change the answer.
pub async fn probe_type(
    client: &dyn AssetOperations,
    id: &str,
    candidates: &[AssetType],
) -> CascadeResult<ProbeOutcome> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CascadeError::EmptyValue("Empty id to probe".to_string()));
    }
    if candidates.is_empty() {
        return Err(CascadeError::EmptyValue(
            "No candidate types to probe".to_string(),
        ));
    }

    let reads = candidates
        .iter()
        .map(|t| Operation::Read {
            identifier: Identifier::by_id(*t, id),
        })
        .collect();
    let entries = client.batch(reads).await?;
    let table = client.type_table();

    let successes = entries.iter().filter(|e| e.success).count();
    if successes > 1 {
        warn!(id, successes, "More than one candidate type read successfully");
    }

    for entry in entries.iter().filter(|e| e.success) {
        let Some(envelope) = entry.payload.as_ref() else {
            continue;
        };
        for candidate in candidates {
            if envelope.get(table.property(*candidate)?).is_some() {
                debug!(id, asset_type = %candidate, "Resolved type");
                return Ok(ProbeOutcome::Resolved(*candidate));
            }
        }
    }

    debug!(id, "No candidate type matched");
    Ok(ProbeOutcome::Unknown)
}

/// Discovers which block subtype `id` is.
pub async fn probe_block_type(client: &dyn AssetOperations, id: &str) -> CascadeResult<ProbeOutcome> {
    probe_type(client, id, BLOCK_TYPES).await
}

/// Discovers which format subtype `id` is.
pub async fn probe_format_type(client: &dyn AssetOperations, id: &str) -> CascadeResult<ProbeOutcome> {
    probe_type(client, id, FORMAT_TYPES).await
}

/// Discovers `id`'s type across the whole type universe.
pub async fn probe_any_type(client: &dyn AssetOperations, id: &str) -> CascadeResult<ProbeOutcome> {
    probe_type(client, id, AssetType::ALL).await
}
