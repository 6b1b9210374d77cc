//! Container-rooted asset hierarchies.
//!
//! Folders and the typed containers list their children under `children`;
//! a site has none of its own and instead points at one root container per
//! container type through its `root*Id` properties.

use crate::asset::Asset;
use crate::child::Child;
use cws_connectors::reply::list_of;
use cws_connectors::{AssetType, AssetTypeTable, CascadeError, CascadeResult, ChildSource};
use serde_json::Value;
use tracing::warn;

/// Site properties naming each root container, in the order they are walked.
pub const SITE_ROOTS: &[(&str, AssetType)] = &[
    ("rootFolderId", AssetType::Folder),
    ("rootAssetFactoryContainerId", AssetType::AssetFactoryContainer),
    ("rootPageConfigurationSetContainerId", AssetType::PageConfigurationSetContainer),
    ("rootContentTypeContainerId", AssetType::ContentTypeContainer),
    ("rootDataDefinitionContainerId", AssetType::DataDefinitionContainer),
    ("rootSharedFieldContainerId", AssetType::SharedFieldContainer),
    ("rootMetadataSetContainerId", AssetType::MetadataSetContainer),
    ("rootPublishSetContainerId", AssetType::PublishSetContainer),
    ("rootSiteDestinationContainerId", AssetType::SiteDestinationContainer),
    ("rootTransportContainerId", AssetType::TransportContainer),
    ("rootWorkflowDefinitionContainerId", AssetType::WorkflowDefinitionContainer),
    ("rootWorkflowEmailContainerId", AssetType::WorkflowEmailContainer),
    ("rootConnectorContainerId", AssetType::ConnectorContainer),
];

/// The ordered children of a materialized container.
///
/// Non-containers have none. A container's child list is coerced from
/// whichever shape the transport produced. Entries whose type this client
/// does not know are logged and skipped.
pub fn child_list(types: &AssetTypeTable, asset: &Asset) -> CascadeResult<Vec<Child>> {
    match types.info(asset.asset_type())?.children {
        ChildSource::None => Ok(Vec::new()),
        ChildSource::ChildList => {
            let mut children = Vec::new();
            for entry in list_of(asset.data().get("children"), "child") {
                match Child::from_wire(entry) {
                    Ok(child) => children.push(child),
                    Err(CascadeError::NoSuchType(type_name)) => {
                        warn!(
                            parent = asset.path().unwrap_or_default(),
                            %type_name,
                            "Skipping child of unknown type"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(children)
        }
        ChildSource::SiteRoots => Ok(site_roots(asset)),
    }
}

fn site_roots(site: &Asset) -> Vec<Child> {
    SITE_ROOTS
        .iter()
        .filter_map(|(property, asset_type)| {
            let id = site.data().get(*property).and_then(Value::as_str)?;
            let mut root = Child::new(id, *asset_type, "/", site.name());
            if let Some(site_id) = site.id() {
                root = root.with_site_id(site_id);
            }
            Some(root)
        })
        .collect()
}

/// A lazy hierarchy rooted at one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTree {
    root: Child,
}

impl AssetTree {
    /// Fails with [`CascadeError::WrongAssetType`] unless `root` is a container.
    pub fn new(types: &AssetTypeTable, root: Child) -> CascadeResult<Self> {
        if !types.is_container(root.asset_type()) {
            return Err(CascadeError::WrongAssetType {
                expected: "container".to_string(),
                actual: root.asset_type().to_string(),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Child {
        &self.root
    }
}
