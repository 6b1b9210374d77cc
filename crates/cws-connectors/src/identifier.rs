//! Identifier resolution.
//!
//! Every remote call addresses its asset with `{ type, id }` or
//! `{ type, path: { path, siteName } }`, never both. [`resolve`] turns a type,
//! a free-form locator and an optional site name into that structure.

use crate::asset_type::AssetType;
use crate::traits::{CascadeError, CascadeResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::OnceLock;

/// Prefix of the ids the service gives to per-site root containers.
const ROOT_PREFIX: &str = "ROOT_";

fn hex_id_pattern() -> &'static Regex {
    static INSTANCE: OnceLock<Regex> = OnceLock::new();
    INSTANCE.get_or_init(|| Regex::new(r"^[0-9a-f]{32}$").expect("valid hex id pattern"))
}

/// Whether `s` is a 32-hex-digit asset id.
pub fn is_hex_id(s: &str) -> bool {
    hex_id_pattern().is_match(s)
}

/// How an asset is located.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    ById(String),
    /// `site_name` is `None` only for assets in the Global scope.
    ByPath {
        path: String,
        site_name: Option<String>,
    },
}

/// Wire-level addressing structure for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub asset_type: AssetType,
    pub locator: Locator,
}

impl Identifier {
    /// An id-based identifier, bypassing resolution rules.
    pub fn by_id(asset_type: AssetType, id: impl Into<String>) -> Self {
        Self {
            asset_type,
            locator: Locator::ById(id.into()),
        }
    }

    /// A path-based identifier, bypassing resolution rules.
    pub fn by_path(asset_type: AssetType, path: impl Into<String>, site_name: Option<&str>) -> Self {
        Self {
            asset_type,
            locator: Locator::ByPath {
                path: path.into(),
                site_name: site_name.map(String::from),
            },
        }
    }

    pub fn id(&self) -> Option<&str> {
        match &self.locator {
            Locator::ById(id) => Some(id),
            Locator::ByPath { .. } => None,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match &self.locator {
            Locator::ById(_) => None,
            Locator::ByPath { path, .. } => Some(path),
        }
    }

    pub fn site_name(&self) -> Option<&str> {
        match &self.locator {
            Locator::ById(_) => None,
            Locator::ByPath { site_name, .. } => site_name.as_deref(),
        }
    }

    /// Stable string key, used for cache lookups and logging.
    pub fn key(&self) -> String {
        match &self.locator {
            Locator::ById(id) => format!("{}:{}", self.asset_type, id),
            Locator::ByPath { path, site_name } => format!(
                "{}:{}:{}",
                self.asset_type,
                site_name.as_deref().unwrap_or(""),
                path
            ),
        }
    }

    /// The `identifier` object sent on the wire.
    pub fn to_wire(&self) -> Value {
        match &self.locator {
            Locator::ById(id) => json!({ "id": id, "type": self.asset_type }),
            Locator::ByPath { path, site_name } => {
                let mut path_obj = json!({ "path": path });
                if let Some(site) = site_name {
                    path_obj["siteName"] = json!(site);
                }
                json!({ "path": path_obj, "type": self.asset_type })
            }
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Builds an [`Identifier`] from a type, a path-or-id locator and a site name.
///
/// Rules apply in order:
/// 1. a 32-hex-digit locator is an id, whatever `site_name` says;
/// 2. groups, roles and users are addressed by their opaque name;
/// 3. a site is always addressed by path (its name);
/// 4. a `ROOT_`-prefixed locator is an id;
/// 5. anything else is a path, trimmed of whitespace and slashes.
///
/// For paths, `site_name = None` addresses the Global scope and an empty site
/// name fails with [`CascadeError::EmptyValue`].
pub fn resolve(
    asset_type: AssetType,
    locator: &str,
    site_name: Option<&str>,
) -> CascadeResult<Identifier> {
    let locator = locator.trim();
    if locator.is_empty() {
        return Err(CascadeError::EmptyValue(format!(
            "Empty locator for {}",
            asset_type
        )));
    }

    if is_hex_id(locator) || asset_type.is_named() {
        return Ok(Identifier::by_id(asset_type, locator));
    }
    if asset_type == AssetType::Site {
        return Ok(Identifier::by_path(asset_type, locator, None));
    }
    if locator.starts_with(ROOT_PREFIX) {
        return Ok(Identifier::by_id(asset_type, locator));
    }

    let site_name = match site_name {
        None => None,
        Some(s) if s.trim().is_empty() => {
            return Err(CascadeError::EmptyValue(format!(
                "Empty site name for {} '{}'",
                asset_type, locator
            )))
        }
        Some(s) => Some(s.trim()),
    };

    let path = locator.trim_matches(|c: char| c == '/' || c.is_whitespace());
    let path = if path.is_empty() { "/" } else { path };

    Ok(Identifier::by_path(asset_type, path, site_name))
}
