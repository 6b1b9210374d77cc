//! Asset type universe and the type/property table.
//!
//! Every read reply wraps the asset in a generic `asset` object whose single
//! key is the type's property name (`page`, `xhtmlDataDefinitionBlock`, ...).
//! [`AssetTypeTable`] is built once and shared by reference with every
//! component that needs to go from one to the other.

use crate::traits::{CascadeError, CascadeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

macro_rules! asset_types {
    ($( $variant:ident => $wire:literal, $property:literal, $children:ident; )+) => {
        /// Concrete asset type tag as used on the wire.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum AssetType {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl AssetType {
            /// Every known type, in declaration order.
            pub const ALL: &'static [AssetType] = &[$(AssetType::$variant),+];

            /// The wire string for this type.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(AssetType::$variant => $wire,)+
                }
            }
        }

        impl FromStr for AssetType {
            type Err = CascadeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(AssetType::$variant),)+
                    other => Err(CascadeError::NoSuchType(other.to_string())),
                }
            }
        }

        fn standard_entries() -> Vec<(AssetType, TypeInfo)> {
            vec![
                $((
                    AssetType::$variant,
                    TypeInfo { property: $property, children: ChildSource::$children },
                ),)+
            ]
        }
    };
}

asset_types! {
    AssetFactory => "assetfactory", "assetFactory", None;
    AssetFactoryContainer => "assetfactorycontainer", "assetFactoryContainer", ChildList;
    CloudTransport => "transport_cloud", "cloudTransport", None;
    ConnectorContainer => "connectorcontainer", "connectorContainer", ChildList;
    ContentType => "contenttype", "contentType", None;
    ContentTypeContainer => "contenttypecontainer", "contentTypeContainer", ChildList;
    DataDefinition => "datadefinition", "dataDefinition", None;
    DataDefinitionContainer => "datadefinitioncontainer", "dataDefinitionContainer", ChildList;
    DatabaseTransport => "transport_db", "databaseTransport", None;
    Destination => "destination", "destination", None;
    EditorConfiguration => "editorconfiguration", "editorConfiguration", None;
    FacebookConnector => "facebookconnector", "facebookConnector", None;
    FeedBlock => "block_FEED", "feedBlock", None;
    File => "file", "file", None;
    FileSystemTransport => "transport_fs", "fileSystemTransport", None;
    Folder => "folder", "folder", ChildList;
    FtpTransport => "transport_ftp", "ftpTransport", None;
    GoogleAnalyticsConnector => "googleanalyticsconnector", "googleAnalyticsConnector", None;
    Group => "group", "group", None;
    IndexBlock => "block_INDEX", "indexBlock", None;
    Message => "message", "message", None;
    MetadataSet => "metadataset", "metadataSet", None;
    MetadataSetContainer => "metadatasetcontainer", "metadataSetContainer", ChildList;
    Page => "page", "page", None;
    PageConfigurationSet => "pageconfigurationset", "pageConfigurationSet", None;
    PageConfigurationSetContainer => "pageconfigurationsetcontainer", "pageConfigurationSetContainer", ChildList;
    PublishSet => "publishset", "publishSet", None;
    PublishSetContainer => "publishsetcontainer", "publishSetContainer", ChildList;
    Reference => "reference", "reference", None;
    Role => "role", "role", None;
    ScriptFormat => "format_SCRIPT", "scriptFormat", None;
    SharedField => "sharedfield", "sharedField", None;
    SharedFieldContainer => "sharedfieldcontainer", "sharedFieldContainer", ChildList;
    Site => "site", "site", SiteRoots;
    SiteDestinationContainer => "sitedestinationcontainer", "siteDestinationContainer", ChildList;
    Symlink => "symlink", "symlink", None;
    Target => "target", "target", None;
    Template => "template", "template", None;
    TextBlock => "block_TEXT", "textBlock", None;
    TransportContainer => "transportcontainer", "transportContainer", ChildList;
    TwitterConnector => "twitterconnector", "twitterConnector", None;
    User => "user", "user", None;
    WordPressConnector => "wordpressconnector", "wordPressConnector", None;
    WorkflowDefinition => "workflowdefinition", "workflowDefinition", None;
    WorkflowDefinitionContainer => "workflowdefinitioncontainer", "workflowDefinitionContainer", ChildList;
    WorkflowEmail => "workflowemail", "workflowEmail", None;
    WorkflowEmailContainer => "workflowemailcontainer", "workflowEmailContainer", ChildList;
    XhtmlDataDefinitionBlock => "block_XHTML_DATADEFINITION", "xhtmlDataDefinitionBlock", None;
    XmlBlock => "block_XML", "xmlBlock", None;
    XsltFormat => "format_XSLT", "xsltFormat", None;
}

/// Block subtypes, the narrowed family for block type discovery.
pub const BLOCK_TYPES: &[AssetType] = &[
    AssetType::FeedBlock,
    AssetType::IndexBlock,
    AssetType::TextBlock,
    AssetType::XhtmlDataDefinitionBlock,
    AssetType::XmlBlock,
];

/// Format subtypes, the narrowed family for format type discovery.
pub const FORMAT_TYPES: &[AssetType] = &[AssetType::ScriptFormat, AssetType::XsltFormat];

/// Types addressed by an opaque name rather than a path.
pub const NAMED_TYPES: &[AssetType] = &[AssetType::Group, AssetType::Role, AssetType::User];

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AssetType {
    /// Whether this type is addressed by name (groups, roles, users).
    pub fn is_named(&self) -> bool {
        NAMED_TYPES.contains(self)
    }

    /// Whether this type is one of the block subtypes.
    pub fn is_block(&self) -> bool {
        BLOCK_TYPES.contains(self)
    }
}

/// Where a container's children come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSource {
    /// Not a container.
    None,
    /// A `children` list on the container's own payload.
    ChildList,
    /// The site's `root*Id` properties, one root container each.
    SiteRoots,
}

/// Static facts about one asset type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    /// Property name inside the generic `asset` wrapper.
    pub property: &'static str,
    pub children: ChildSource,
}

/// Immutable type/property lookup table.
#[derive(Debug, Clone)]
pub struct AssetTypeTable {
    by_type: HashMap<AssetType, TypeInfo>,
    by_property: HashMap<&'static str, AssetType>,
}

impl AssetTypeTable {
    /// Builds the table for the full type universe.
    pub fn standard() -> Self {
        let entries = standard_entries();
        let by_property = entries.iter().map(|(t, info)| (info.property, *t)).collect();
        Self {
            by_type: entries.into_iter().collect(),
            by_property,
        }
    }

    /// A process-wide shared instance of [`AssetTypeTable::standard`].
    pub fn shared() -> Arc<Self> {
        static INSTANCE: OnceLock<Arc<AssetTypeTable>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(AssetTypeTable::standard()))
            .clone()
    }

    /// Facts about `asset_type`.
    pub fn info(&self, asset_type: AssetType) -> CascadeResult<TypeInfo> {
        self.by_type
            .get(&asset_type)
            .copied()
            .ok_or_else(|| CascadeError::NoSuchType(asset_type.to_string()))
    }

    /// Property name used to extract `asset_type`'s payload.
    pub fn property(&self, asset_type: AssetType) -> CascadeResult<&'static str> {
        self.info(asset_type).map(|i| i.property)
    }

    /// Reverse lookup from a property name.
    pub fn type_for_property(&self, property: &str) -> Option<AssetType> {
        self.by_property.get(property).copied()
    }

    /// Whether `asset_type` can hold child assets.
    pub fn is_container(&self, asset_type: AssetType) -> bool {
        self.by_type
            .get(&asset_type)
            .map(|i| i.children != ChildSource::None)
            .unwrap_or(false)
    }

    /// Parses a wire type string.
    pub fn parse(&self, s: &str) -> CascadeResult<AssetType> {
        s.parse()
    }

    /// Number of types in the table.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl Default for AssetTypeTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_type() {
        let table = AssetTypeTable::standard();
        assert_eq!(table.len(), AssetType::ALL.len());
        for t in AssetType::ALL {
            let property = table.property(*t).unwrap();
            assert_eq!(table.type_for_property(property), Some(*t));
        }
    }

    #[test]
    fn test_wire_strings_round_trip() {
        for t in AssetType::ALL {
            assert_eq!(t.as_str().parse::<AssetType>().unwrap(), *t);
        }
        assert_eq!(
            "block_XHTML_DATADEFINITION".parse::<AssetType>().unwrap(),
            AssetType::XhtmlDataDefinitionBlock
        );
    }

    #[test]
    fn test_unknown_type_string() {
        let err = "widget".parse::<AssetType>().unwrap_err();
        assert_eq!(err, CascadeError::NoSuchType("widget".to_string()));
    }

    #[test]
    fn test_property_names() {
        let table = AssetTypeTable::standard();
        assert_eq!(table.property(AssetType::Page).unwrap(), "page");
        assert_eq!(table.property(AssetType::XsltFormat).unwrap(), "xsltFormat");
        assert_eq!(
            table.property(AssetType::DatabaseTransport).unwrap(),
            "databaseTransport"
        );
    }

    #[test]
    fn test_containers() {
        let table = AssetTypeTable::standard();
        assert!(table.is_container(AssetType::Folder));
        assert!(table.is_container(AssetType::Site));
        assert!(table.is_container(AssetType::MetadataSetContainer));
        assert!(!table.is_container(AssetType::Page));
        assert!(!table.is_container(AssetType::TextBlock));
        assert_eq!(
            table.info(AssetType::Site).unwrap().children,
            ChildSource::SiteRoots
        );
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        let json = serde_json::to_string(&AssetType::FeedBlock).unwrap();
        assert_eq!(json, "\"block_FEED\"");
        let back: AssetType = serde_json::from_str("\"format_SCRIPT\"").unwrap();
        assert_eq!(back, AssetType::ScriptFormat);
    }

    #[test]
    fn test_families() {
        assert!(AssetType::TextBlock.is_block());
        assert!(!AssetType::Page.is_block());
        assert!(AssetType::Role.is_named());
        assert!(FORMAT_TYPES.contains(&AssetType::XsltFormat));
    }

    #[test]
    fn test_shared_is_same_instance() {
        assert!(Arc::ptr_eq(&AssetTypeTable::shared(), &AssetTypeTable::shared()));
    }
}
