//! Reply normalization shared by every transport.

use crate::asset_type::{AssetType, AssetTypeTable};
use crate::operation::Operation;
use crate::traits::{CascadeError, CascadeResult, OperationResult};
use serde_json::Value;

/// Narrows a successful read's payload to the requested type's property.
///
/// The wire payload is `{ "asset": { "<property>": {...} } }`; afterwards it
/// is the inner `{...}`. Failed reads are returned untouched.
pub fn normalize_read(
    table: &AssetTypeTable,
    asset_type: AssetType,
    mut result: OperationResult,
) -> CascadeResult<OperationResult> {
    if !result.success {
        result.payload = None;
        return Ok(result);
    }
    let property = table.property(asset_type)?;
    let asset = result
        .payload
        .as_ref()
        .and_then(|p| p.get("asset"))
        .and_then(|a| a.get(property))
        .cloned()
        .ok_or_else(|| {
            CascadeError::InvalidResponse(format!(
                "Read of {} succeeded but carried no '{}' property",
                asset_type, property
            ))
        })?;
    result.payload = Some(asset);
    Ok(result)
}

/// Coerces a wire list into one ordered sequence.
///
/// The same list arrives as a bare array, as `{ <wrapper>: [...] }`, or, when
/// it holds exactly one element, as `{ <wrapper>: {...} }`. Missing and null
/// lists are empty.
pub fn list_of<'a>(value: Option<&'a Value>, wrapper: &str) -> Vec<&'a Value> {
    let inner = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Object(map)) if map.contains_key(wrapper) => &map[wrapper],
        Some(other) => other,
    };
    match inner {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        single => vec![single],
    }
}

/// Decodes one batch entry.
///
/// An entry is either a bare result or a single-key wrapper around one
/// (`readResult`, `operationResult`, ...). Read entries keep the generic
/// `asset` envelope as their payload so callers can see which property came
/// back.
pub fn decode_batch_entry(entry: &Value, operation: &Operation) -> CascadeResult<OperationResult> {
    let inner = if entry.get("success").is_some() {
        entry
    } else {
        entry
            .as_object()
            .and_then(|m| m.values().find(|v| v.get("success").is_some()))
            .ok_or_else(|| {
                CascadeError::InvalidResponse(format!("Unrecognized batch entry: {}", entry))
            })?
    };

    let mut result = OperationResult::from_reply(inner)?;
    if matches!(operation, Operation::Read { .. }) {
        result.payload = if result.success {
            result.payload.and_then(|p| p.get("asset").cloned())
        } else {
            None
        };
    }
    Ok(result)
}

/// Decodes the ordered entries of a batch reply against the submitted operations.
pub fn decode_batch(entries: &Value, operations: &[Operation]) -> CascadeResult<OperationResult> {
    let entries = entries.as_array().ok_or_else(|| {
        CascadeError::InvalidResponse("Batch reply is not an array".to_string())
    })?;
    if entries.len() != operations.len() {
        return Err(CascadeError::InvalidResponse(format!(
            "Batch sent {} operations but received {} results",
            operations.len(),
            entries.len()
        )));
    }
    let decoded = entries
        .iter()
        .zip(operations)
        .map(|(entry, op)| decode_batch_entry(entry, op))
        .collect::<CascadeResult<Vec<_>>>()?;
    Ok(OperationResult::batch(decoded))
}

/// Decodes a single, non-batch reply for `operation`.
pub fn decode_single(
    table: &AssetTypeTable,
    operation: &Operation,
    reply: &Value,
) -> CascadeResult<OperationResult> {
    let result = OperationResult::from_reply(reply)?;
    match operation {
        Operation::Read { identifier } => normalize_read(table, identifier.asset_type, result),
        _ => Ok(result),
    }
}
