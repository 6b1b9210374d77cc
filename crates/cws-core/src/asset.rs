//! Materialized assets.

use crate::metadata::{parse_timestamp, Metadata};
use chrono::{DateTime, Utc};
use cws_connectors::{AssetType, CascadeError, CascadeResult, Identifier, OperationResult};
use serde::Serialize;
use serde_json::Value;

/// One fully read asset: its concrete type plus the property payload the read returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    asset_type: AssetType,
    data: Value,
}

impl Asset {
    pub fn new(asset_type: AssetType, data: Value) -> Self {
        Self { asset_type, data }
    }

    /// Builds an asset from a normalized read reply for `identifier`.
    ///
    /// A failed read or one without a payload is [`CascadeError::NullAsset`].
    pub fn from_read(identifier: &Identifier, result: OperationResult) -> CascadeResult<Self> {
        if !result.success {
            return Err(CascadeError::NullAsset(format!(
                "Unable to read {}: {}",
                identifier,
                result.message.unwrap_or_default()
            )));
        }
        let data = result.payload.ok_or_else(|| {
            CascadeError::NullAsset(format!("Read of {} returned no asset", identifier))
        })?;
        Ok(Self::new(identifier.asset_type, data))
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    /// Raw property payload.
    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.text("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    pub fn path(&self) -> Option<&str> {
        self.text("path")
    }

    pub fn site_id(&self) -> Option<&str> {
        self.text("siteId")
    }

    pub fn site_name(&self) -> Option<&str> {
        self.text("siteName")
    }

    /// The asset's metadata; assets without any have an empty one.
    pub fn metadata(&self) -> Metadata {
        self.data
            .get("metadata")
            .map(Metadata::from_value)
            .unwrap_or_default()
    }

    pub fn last_modified_date(&self) -> Option<DateTime<Utc>> {
        self.text("lastModifiedDate").and_then(parse_timestamp)
    }

    pub fn created_date(&self) -> Option<DateTime<Utc>> {
        self.text("createdDate").and_then(parse_timestamp)
    }

    /// `shouldBePublished`, for the types that carry it. Accepts the RPC string form.
    pub fn should_be_published(&self) -> Option<bool> {
        match self.data.get("shouldBePublished")? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Text content of pages and text/XHTML blocks.
    ///
    /// Pages and XHTML blocks keep it under `xhtml`, text blocks under `text`.
    /// Structured-data content is not flattened.
    pub fn xhtml(&self) -> Option<&str> {
        match self.asset_type {
            AssetType::TextBlock => self.text("text"),
            _ => self.text("xhtml"),
        }
    }

    /// Fails with [`CascadeError::WrongAssetType`] unless this asset is an `expected`.
    pub fn require_type(&self, expected: AssetType) -> CascadeResult<()> {
        if self.asset_type == expected {
            Ok(())
        } else {
            Err(CascadeError::WrongAssetType {
                expected: expected.to_string(),
                actual: self.asset_type.to_string(),
            })
        }
    }
}
