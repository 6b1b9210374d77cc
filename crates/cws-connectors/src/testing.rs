//! Fixtures for tests of the transports and the layers built on them.

use crate::asset_type::AssetType;
use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::mock::MockTransport;
use serde_json::{json, Value};

/// A client config pointing at `base_url` with throwaway credentials.
pub fn test_client_config(base_url: &str) -> ClientConfig {
    ClientConfig::new(base_url, Credentials::new("test-user", "test-password"))
}

/// Builds a 32-hex-digit id from a small number, for readable fixtures.
pub fn hex_id(n: u64) -> String {
    format!("{:032x}", n)
}

/// The wire shape of one entry in a container's child list.
pub fn sample_child_json(id: &str, asset_type: AssetType, path: &str, site_name: &str) -> Value {
    json!({
        "id": id,
        "type": asset_type,
        "path": {"path": path, "siteId": hex_id(0x5173), "siteName": site_name},
        "recycled": false
    })
}

/// A page payload with optional metadata.
pub fn sample_page(id: &str, path: &str, site_name: &str, metadata: Value) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({
        "id": id,
        "name": name,
        "path": path,
        "siteName": site_name,
        "metadata": metadata,
        "shouldBePublished": true
    })
}

/// A folder payload whose `children` list holds `children` (wire child entries).
pub fn sample_folder(id: &str, path: &str, site_name: &str, children: Vec<Value>) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    json!({
        "id": id,
        "name": name,
        "path": path,
        "siteName": site_name,
        "metadata": {},
        "children": children
    })
}

/// A mock holding a folder `docs` with three pages, the second with an end date.
pub fn mock_with_sample_tree() -> MockTransport {
    let mock = MockTransport::new();
    let folder_id = hex_id(1);
    let pages = [
        (hex_id(2), "docs/a", json!({})),
        (hex_id(3), "docs/b", json!({"endDate": "2020-01-01T00:00:00Z"})),
        (hex_id(4), "docs/c", json!({})),
    ];

    let children = pages
        .iter()
        .map(|(id, path, _)| sample_child_json(id, AssetType::Page, path, "www"))
        .collect();
    mock.insert(
        AssetType::Folder,
        sample_folder(&folder_id, "docs", "www", children),
    );
    for (id, path, metadata) in pages {
        mock.insert(AssetType::Page, sample_page(&id, path, "www", metadata));
    }
    mock
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use crate::traits::AssetOperations;

    #[test]
    fn test_test_client_config() {
        let config = test_client_config("https://cms.example.edu");
        assert!(config.validate().is_ok());
        assert_eq!(config.credentials.username, "test-user");
    }

    #[test]
    fn test_hex_id() {
        assert_eq!(hex_id(1).len(), 32);
        assert!(crate::identifier::is_hex_id(&hex_id(0xabc)));
    }

    #[tokio::test]
    async fn test_sample_tree_is_readable() {
        let mock = mock_with_sample_tree();
        let folder = mock
            .read(&Identifier::by_path(AssetType::Folder, "docs", Some("www")))
            .await
            .unwrap();
        assert!(folder.success);
        assert_eq!(folder.payload.unwrap()["children"].as_array().unwrap().len(), 3);
    }
}
