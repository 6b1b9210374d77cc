//! HTTP+JSON transport.
//!
//! The operation name and the addressed asset travel as URL segments
//! (`operation/type/id` or `operation/type/siteName/path`); any remaining
//! fields are posted as a JSON body. Batch is not offered by this protocol
//! and fails fast, as does a path identifier without a site: the route has no
//! segment for the Global scope, and dropping the site would make the URL
//! address another asset.

use crate::asset_type::AssetTypeTable;
use crate::config::{ClientConfig, RestAuth};
use crate::credentials::Credentials;
use crate::http::{AuthPlacement, HttpClient};
use crate::identifier::{Identifier, Locator};
use crate::operation::{HttpMethod, Operation};
use crate::reply::decode_single;
use crate::traits::{
    AssetOperations, CascadeError, CascadeResult, LastReply, OperationResult, Protocol,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

/// Path of the HTTP+JSON API below the instance root.
pub const API_PATH: &str = "api/v1";

/// Client speaking the HTTP+JSON protocol.
pub struct RestClient {
    http: HttpClient,
    credentials: Credentials,
    auth: RestAuth,
    types: Arc<AssetTypeTable>,
    last: LastReply,
}

/// URL segments addressing `identifier`.
///
/// Fails with [`CascadeError::Unsupported`] for a Global-scope path, which
/// must be addressed by id over this protocol.
pub fn identifier_segments(identifier: &Identifier) -> CascadeResult<Vec<String>> {
    let mut segments = vec![identifier.asset_type.as_str().to_string()];
    match &identifier.locator {
        Locator::ById(id) => segments.push(id.clone()),
        Locator::ByPath {
            path,
            site_name: Some(site),
        } => {
            segments.push(site.clone());
            segments.push(path.clone());
        }
        Locator::ByPath {
            path,
            site_name: None,
        } => {
            return Err(CascadeError::Unsupported(format!(
                "{} '{}' has no site; Global-scope assets are addressed by id over the HTTP+JSON protocol",
                identifier.asset_type, path
            )))
        }
    }
    Ok(segments)
}

impl RestClient {
    pub fn new(config: &ClientConfig, types: Arc<AssetTypeTable>) -> CascadeResult<Self> {
        let http = HttpClient::new(config)?;
        info!(client = %config.name, base_url = %config.base_url, "HTTP+JSON client initialized");
        Ok(Self {
            http,
            credentials: config.credentials.clone(),
            auth: config.rest_auth,
            types,
            last: LastReply::default(),
        })
    }

    /// The URL `operation` is sent to, without credentials.
    pub fn url_for(&self, operation: &Operation) -> CascadeResult<Url> {
        let request = operation.wire_request()?;
        let mut segments = vec![API_PATH.to_string(), operation.name().to_string()];
        if let Some(identifier) = &request.identifier {
            segments.extend(identifier_segments(identifier)?);
        }
        self.http.endpoint(&segments)
    }

    fn placement(&self, method: HttpMethod) -> AuthPlacement<'_> {
        match (method, self.auth) {
            (HttpMethod::Post, RestAuth::Header) => AuthPlacement::Header(&self.credentials),
            _ => AuthPlacement::Query(&self.credentials),
        }
    }
}

#[async_trait]
impl AssetOperations for RestClient {
    fn protocol(&self) -> Protocol {
        Protocol::Rest
    }

    fn type_table(&self) -> &AssetTypeTable {
        &self.types
    }

    #[instrument(skip(self, operation), fields(operation = operation.name()))]
    async fn perform(&self, operation: Operation) -> CascadeResult<OperationResult> {
        if matches!(operation, Operation::Batch { .. }) {
            return Err(CascadeError::Unsupported(
                "batch is not available over the HTTP+JSON protocol".to_string(),
            ));
        }

        let request = operation.wire_request()?;
        let url = self.url_for(&operation)?;
        let method = operation.http_method();
        debug!(%url, ?method, "Sending request");

        let reply = match method {
            HttpMethod::Get => self.http.get_json(url, self.placement(method)).await?,
            HttpMethod::Post => {
                let body = Value::Object(request.fields);
                self.http
                    .post_json(url, &body, self.placement(method))
                    .await?
            }
        };

        let result = decode_single(&self.types, &operation, &reply)?;
        self.last.record(&result, Some(reply));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset_type::AssetType;
    use crate::stub_server::{closed_port, StubServer};
    use crate::testing::{hex_id, test_client_config};
    use serde_json::json;

    fn client(auth: RestAuth) -> RestClient {
        client_at("https://cms.example.edu", auth)
    }

    fn client_at(base_url: &str, auth: RestAuth) -> RestClient {
        let config = test_client_config(base_url).with_rest_auth(auth);
        RestClient::new(&config, AssetTypeTable::shared()).unwrap()
    }

    #[test]
    fn test_url_by_id() {
        let op = Operation::Read {
            identifier: Identifier::by_id(AssetType::Page, "0a1b2c3d4e5f60718293a4b5c6d7e8f9"),
        };
        assert_eq!(
            client(RestAuth::Query).url_for(&op).unwrap().as_str(),
            "https://cms.example.edu/api/v1/read/page/0a1b2c3d4e5f60718293a4b5c6d7e8f9"
        );
    }

    #[test]
    fn test_url_by_path() {
        let op = Operation::Delete {
            identifier: Identifier::by_path(AssetType::File, "css/site.css", Some("www")),
        };
        assert_eq!(
            client(RestAuth::Query).url_for(&op).unwrap().as_str(),
            "https://cms.example.edu/api/v1/delete/file/www/css/site.css"
        );
    }

    #[test]
    fn test_global_path_has_no_url() {
        let rest = client(RestAuth::Query);
        for path in ["Default", "dept/Default"] {
            let op = Operation::Delete {
                identifier: Identifier::by_path(AssetType::MetadataSet, path, None),
            };
            assert!(matches!(
                rest.url_for(&op),
                Err(CascadeError::Unsupported(_))
            ));
        }

        let by_site = Operation::Read {
            identifier: Identifier::by_path(AssetType::MetadataSet, "Default", Some("dept")),
        };
        assert_eq!(
            rest.url_for(&by_site).unwrap().as_str(),
            "https://cms.example.edu/api/v1/read/metadataset/dept/Default"
        );
    }

    #[tokio::test]
    async fn test_global_path_fails_before_sending() {
        let addr = closed_port().await;
        let rest = client_at(&format!("http://{}", addr), RestAuth::Query);
        let op = Operation::Delete {
            identifier: Identifier::by_path(AssetType::MetadataSet, "Default", None),
        };
        let err = rest.perform(op).await.unwrap_err();
        assert!(matches!(err, CascadeError::Unsupported(_)));
    }

    #[test]
    fn test_url_without_identifier() {
        let op = Operation::Edit {
            asset: json!({"page": {"id": "p1"}}),
        };
        assert_eq!(
            client(RestAuth::Query).url_for(&op).unwrap().as_str(),
            "https://cms.example.edu/api/v1/edit"
        );
    }

    #[test]
    fn test_auth_placement() {
        let query = client(RestAuth::Query);
        assert!(matches!(query.placement(HttpMethod::Post), AuthPlacement::Query(_)));

        let header = client(RestAuth::Header);
        assert!(matches!(header.placement(HttpMethod::Get), AuthPlacement::Query(_)));
        assert!(matches!(header.placement(HttpMethod::Post), AuthPlacement::Header(_)));
    }

    #[tokio::test]
    async fn test_batch_fails_fast() {
        let op = Operation::Batch {
            operations: vec![Operation::ListSites],
        };
        let err = client(RestAuth::Query).perform(op).await.unwrap_err();
        assert!(matches!(err, CascadeError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_validation_precedes_network() {
        let op = Operation::SiteCopy {
            original_site_name: "www".into(),
            new_site_name: "".into(),
        };
        let err = client(RestAuth::Query).perform(op).await.unwrap_err();
        assert!(matches!(err, CascadeError::EmptyValue(_)));
    }

    #[tokio::test]
    async fn test_read_sends_query_credentials() {
        let id = hex_id(7);
        let server = StubServer::reply(
            200,
            json!({"success": true, "asset": {"page": {"id": id, "name": "index"}}}),
        )
        .await;
        let rest = client_at(&server.base_url, RestAuth::Query);

        let result = rest
            .perform(Operation::Read {
                identifier: Identifier::by_id(AssetType::Page, &id),
            })
            .await
            .unwrap();
        assert_eq!(result.payload, Some(json!({"id": id, "name": "index"})));
        assert!(rest.is_successful());

        let request = server.received().await;
        assert_eq!(
            request.request_line,
            format!("GET /api/v1/read/page/{}?u=test-user&p=test-password HTTP/1.1", id)
        );
        assert!(request.header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_failed_edit_escalates_and_keeps_reply() {
        let reply = json!({"success": false, "message": "Asset is locked"});
        let server = StubServer::reply(200, reply.clone()).await;
        let rest = client_at(&server.base_url, RestAuth::Header);

        let asset = json!({"page": {"id": hex_id(7), "name": "index"}});
        let err = rest
            .perform(Operation::Edit {
                asset: asset.clone(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CascadeError::EditingFailure(ref m) if m == "Asset is locked"));
        assert!(!rest.is_successful());
        assert_eq!(rest.last_message().as_deref(), Some("Asset is locked"));
        assert_eq!(rest.last_raw_reply(), Some(reply));

        let request = server.received().await;
        assert_eq!(request.request_line, "POST /api/v1/edit HTTP/1.1");
        let expected = Credentials::new("test-user", "test-password").basic_header();
        assert_eq!(request.header("authorization"), Some(expected.expose_secret()));
        assert_eq!(request.json_body(), json!({"asset": asset}));
    }

    #[tokio::test]
    async fn test_http_error_is_server_error() {
        let server = StubServer::reply(500, json!({"error": "boom"})).await;
        let rest = client_at(&server.base_url, RestAuth::Query);

        let err = rest.perform(Operation::ListSites).await.unwrap_err();
        assert!(matches!(err, CascadeError::Server(_)));
        server.received().await;
    }

    #[tokio::test]
    async fn test_connection_refused_is_server_error() {
        let addr = closed_port().await;
        let rest = client_at(&format!("http://{}", addr), RestAuth::Query);

        let err = rest.perform(Operation::ListSites).await.unwrap_err();
        assert!(matches!(err, CascadeError::Server(_)));
        assert!(rest.last_raw_reply().is_none());
    }
}
