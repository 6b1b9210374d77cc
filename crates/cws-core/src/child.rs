//! Lightweight handles to tree nodes.

use crate::asset::Asset;
use cws_connectors::{AssetOperations, AssetType, CascadeError, CascadeResult, Identifier};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Immutable snapshot of one node in an asset tree.
///
/// A `Child` never holds the asset itself; [`Child::get_asset`] reads it on
/// demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Child {
    id: String,
    asset_type: AssetType,
    path: String,
    site_id: Option<String>,
    site_name: Option<String>,
    recycled: bool,
}

impl Child {
    pub fn new(
        id: impl Into<String>,
        asset_type: AssetType,
        path: impl Into<String>,
        site_name: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            asset_type,
            path: path.into(),
            site_id: None,
            site_name: site_name.map(str::to_string),
            recycled: false,
        }
    }

    pub fn with_site_id(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    /// Parses one entry of a container's child list.
    ///
    /// `path` is either `{ path, siteId, siteName }` or a bare string.
    pub fn from_wire(value: &Value) -> CascadeResult<Self> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CascadeError::EmptyValue(format!("Child without id: {}", value)))?;
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CascadeError::EmptyValue(format!("Child {} without type", id)))?;
        let asset_type: AssetType = type_name.parse()?;

        let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);
        let (path, site_id, site_name) = match value.get("path") {
            Some(Value::String(p)) => (p.clone(), None, None),
            Some(obj) => (
                text(obj.get("path")).unwrap_or_default(),
                text(obj.get("siteId")),
                text(obj.get("siteName")),
            ),
            None => (String::new(), None, None),
        };
        let recycled = match value.get("recycled") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        };

        Ok(Self {
            id: id.to_string(),
            asset_type,
            path,
            site_id,
            site_name,
            recycled,
        })
    }

    /// A handle for an asset that has already been read.
    pub fn from_asset(asset: &Asset) -> CascadeResult<Self> {
        let id = asset
            .id()
            .ok_or_else(|| CascadeError::EmptyValue("Asset without id".to_string()))?;
        Ok(Self {
            id: id.to_string(),
            asset_type: asset.asset_type(),
            path: asset.path().unwrap_or_default().to_string(),
            site_id: asset.site_id().map(str::to_string),
            site_name: asset.site_name().map(str::to_string),
            recycled: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn site_id(&self) -> Option<&str> {
        self.site_id.as_deref()
    }

    pub fn site_name(&self) -> Option<&str> {
        self.site_name.as_deref()
    }

    pub fn is_recycled(&self) -> bool {
        self.recycled
    }

    /// Children are always addressed by id.
    pub fn identifier(&self) -> Identifier {
        Identifier::by_id(self.asset_type, &self.id)
    }

    /// Cache key: the identifier string.
    pub fn key(&self) -> String {
        self.identifier().key()
    }

    /// Reads the full asset.
    pub async fn get_asset(&self, client: &dyn AssetOperations) -> CascadeResult<Asset> {
        let identifier = self.identifier();
        debug!(key = %identifier.key(), "Materializing child");
        let result = client.read(&identifier).await?;
        Asset::from_read(&identifier, result)
    }

    /// Wire shape, as found in a container's child list.
    pub fn to_wire(&self) -> Value {
        json!({
            "id": self.id,
            "type": self.asset_type,
            "path": {
                "path": self.path,
                "siteId": self.site_id,
                "siteName": self.site_name,
            },
            "recycled": self.recycled,
        })
    }
}
