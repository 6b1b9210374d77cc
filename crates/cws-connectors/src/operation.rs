//! The remote operation set.
//!
//! Each [`Operation`] encodes once into a [`WireRequest`]: the identifier the
//! call addresses (if any) plus the remaining operation-specific fields. The
//! RPC transport folds both into its typed envelope; the HTTP+JSON transport
//! moves the identifier into URL segments and posts the rest as the body.

use crate::asset_type::AssetType;
use crate::identifier::Identifier;
use crate::traits::{CascadeError, CascadeResult, OperationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Which mutating family an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Editing,
    Renaming,
    Deleting,
}

/// How a message is marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageMark {
    Read,
    Unread,
    Archive,
    Unarchive,
}

/// Filters for an audit read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditQuery {
    pub identifier: Option<Identifier>,
    pub username: Option<String>,
    pub audit_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Parameters of a search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub terms: String,
    pub site_name: Option<String>,
    pub fields: Vec<String>,
    pub types: Vec<AssetType>,
}

/// One remote action with its action-specific fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Read {
        identifier: Identifier,
    },
    /// `asset` is the `{ <property>: {...} }` envelope.
    Create {
        asset: Value,
    },
    Edit {
        asset: Value,
    },
    Delete {
        identifier: Identifier,
    },
    /// Moves and/or renames. At least one of the two must be set.
    Move {
        identifier: Identifier,
        destination: Option<Identifier>,
        new_name: Option<String>,
    },
    Copy {
        identifier: Identifier,
        destination: Identifier,
        new_name: String,
    },
    SiteCopy {
        original_site_name: String,
        new_site_name: String,
    },
    Publish {
        identifier: Identifier,
        destinations: Vec<Identifier>,
    },
    Unpublish {
        identifier: Identifier,
        destinations: Vec<Identifier>,
    },
    /// Sub-operations must be Read, Create, Edit or Delete.
    Batch {
        operations: Vec<Operation>,
    },
    Search {
        query: SearchQuery,
    },
    ReadAudits {
        query: AuditQuery,
    },
    ReadAccessRights {
        identifier: Identifier,
    },
    EditAccessRights {
        identifier: Identifier,
        access_rights: Value,
        apply_to_children: bool,
    },
    ReadWorkflowSettings {
        identifier: Identifier,
    },
    EditWorkflowSettings {
        identifier: Identifier,
        workflow_settings: Value,
        apply_inherit_to_children: bool,
        apply_require_to_children: bool,
    },
    ReadWorkflowInformation {
        identifier: Identifier,
    },
    PerformWorkflowTransition {
        workflow_id: String,
        action_identifier: String,
        comment: Option<String>,
    },
    ReadPreferences,
    EditPreference {
        name: String,
        value: String,
    },
    ListSubscribers {
        identifier: Identifier,
    },
    ListMessages,
    MarkMessage {
        message_id: String,
        mark: MessageMark,
    },
    DeleteMessage {
        message_id: String,
    },
    CheckIn {
        identifier: Identifier,
        comments: String,
    },
    CheckOut {
        identifier: Identifier,
    },
    ListSites,
}

/// HTTP verb an operation travels with on the HTTP+JSON transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Transport-neutral encoding of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    /// The addressed asset, if the operation has one.
    pub identifier: Option<Identifier>,
    /// Every other field, keyed by its wire name.
    pub fields: Map<String, Value>,
}

impl WireRequest {
    fn new(identifier: Option<&Identifier>) -> Self {
        Self {
            identifier: identifier.cloned(),
            fields: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// All fields in one object, identifier included.
    pub fn to_envelope_fields(&self) -> Map<String, Value> {
        let mut fields = self.fields.clone();
        if let Some(identifier) = &self.identifier {
            fields.insert("identifier".to_string(), identifier.to_wire());
        }
        fields
    }
}

fn non_empty(value: &str, what: &str) -> CascadeResult<()> {
    if value.trim().is_empty() {
        Err(CascadeError::EmptyValue(format!("Empty {}", what)))
    } else {
        Ok(())
    }
}

fn require_asset(asset: &Value) -> CascadeResult<()> {
    match asset.as_object() {
        Some(map) if !map.is_empty() => Ok(()),
        _ => Err(CascadeError::NullAsset(
            "Create/edit requires a non-empty asset envelope".to_string(),
        )),
    }
}

fn message_identifier(message_id: &str) -> Identifier {
    Identifier::by_id(AssetType::Message, message_id)
}

impl Operation {
    /// Wire name of the remote procedure.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Read { .. } => "read",
            Operation::Create { .. } => "create",
            Operation::Edit { .. } => "edit",
            Operation::Delete { .. } => "delete",
            Operation::Move { .. } => "move",
            Operation::Copy { .. } => "copy",
            Operation::SiteCopy { .. } => "siteCopy",
            Operation::Publish { .. } | Operation::Unpublish { .. } => "publish",
            Operation::Batch { .. } => "batch",
            Operation::Search { .. } => "search",
            Operation::ReadAudits { .. } => "readAudits",
            Operation::ReadAccessRights { .. } => "readAccessRights",
            Operation::EditAccessRights { .. } => "editAccessRights",
            Operation::ReadWorkflowSettings { .. } => "readWorkflowSettings",
            Operation::EditWorkflowSettings { .. } => "editWorkflowSettings",
            Operation::ReadWorkflowInformation { .. } => "readWorkflowInformation",
            Operation::PerformWorkflowTransition { .. } => "performWorkflowTransition",
            Operation::ReadPreferences => "readPreferences",
            Operation::EditPreference { .. } => "editPreference",
            Operation::ListSubscribers { .. } => "listSubscribers",
            Operation::ListMessages => "listMessages",
            Operation::MarkMessage { .. } => "markMessage",
            Operation::DeleteMessage { .. } => "deleteMessage",
            Operation::CheckIn { .. } => "checkIn",
            Operation::CheckOut { .. } => "checkOut",
            Operation::ListSites => "listSites",
        }
    }

    /// The mutating family whose failures escalate to an error, if any.
    pub fn mutation(&self) -> Option<MutationKind> {
        match self {
            Operation::Edit { .. } => Some(MutationKind::Editing),
            Operation::Move { .. } => Some(MutationKind::Renaming),
            Operation::Delete { .. } => Some(MutationKind::Deleting),
            _ => None,
        }
    }

    /// Verb used by the HTTP+JSON transport.
    pub fn http_method(&self) -> HttpMethod {
        match self {
            Operation::Read { .. }
            | Operation::ReadAccessRights { .. }
            | Operation::ReadWorkflowSettings { .. }
            | Operation::ReadWorkflowInformation { .. }
            | Operation::ListSubscribers { .. }
            | Operation::ReadPreferences
            | Operation::ListMessages
            | Operation::ListSites => HttpMethod::Get,
            _ => HttpMethod::Post,
        }
    }

    /// Validates and encodes the operation. Runs before anything is sent.
    pub fn wire_request(&self) -> CascadeResult<WireRequest> {
        let request = match self {
            Operation::Read { identifier }
            | Operation::Delete { identifier }
            | Operation::ReadAccessRights { identifier }
            | Operation::ReadWorkflowSettings { identifier }
            | Operation::ReadWorkflowInformation { identifier }
            | Operation::ListSubscribers { identifier }
            | Operation::CheckOut { identifier } => WireRequest::new(Some(identifier)),

            Operation::Create { asset } | Operation::Edit { asset } => {
                require_asset(asset)?;
                WireRequest::new(None).with("asset", asset.clone())
            }

            Operation::Move {
                identifier,
                destination,
                new_name,
            } => {
                if destination.is_none() && new_name.is_none() {
                    return Err(CascadeError::EmptyValue(
                        "Move requires a destination or a new name".to_string(),
                    ));
                }
                if let Some(name) = new_name {
                    non_empty(name, "new name")?;
                }
                let mut params = json!({ "doWorkflow": false });
                if let Some(dest) = destination {
                    params["destinationContainerIdentifier"] = dest.to_wire();
                }
                if let Some(name) = new_name {
                    params["newName"] = json!(name);
                }
                WireRequest::new(Some(identifier)).with("moveParameters", params)
            }

            Operation::Copy {
                identifier,
                destination,
                new_name,
            } => {
                non_empty(new_name, "new name")?;
                WireRequest::new(Some(identifier)).with(
                    "copyParameters",
                    json!({
                        "destinationContainerIdentifier": destination.to_wire(),
                        "doWorkflow": false,
                        "newName": new_name,
                    }),
                )
            }

            Operation::SiteCopy {
                original_site_name,
                new_site_name,
            } => {
                non_empty(original_site_name, "original site name")?;
                non_empty(new_site_name, "new site name")?;
                WireRequest::new(None)
                    .with("originalSiteName", json!(original_site_name))
                    .with("newSiteName", json!(new_site_name))
            }

            Operation::Publish {
                identifier,
                destinations,
            }
            | Operation::Unpublish {
                identifier,
                destinations,
            } => {
                let unpublish = matches!(self, Operation::Unpublish { .. });
                let mut info = json!({ "unpublish": unpublish });
                if !destinations.is_empty() {
                    info["destinations"] =
                        Value::Array(destinations.iter().map(|d| d.to_wire()).collect());
                }
                WireRequest::new(Some(identifier)).with("publishInformation", info)
            }

            Operation::Batch { operations } => {
                if operations.is_empty() {
                    return Err(CascadeError::EmptyValue(
                        "Batch requires at least one operation".to_string(),
                    ));
                }
                let entries = operations
                    .iter()
                    .map(|op| op.batch_entry())
                    .collect::<CascadeResult<Vec<_>>>()?;
                WireRequest::new(None).with("operation", Value::Array(entries))
            }

            Operation::Search { query } => {
                non_empty(&query.terms, "search terms")?;
                let mut info = json!({ "searchTerms": query.terms });
                if let Some(site) = &query.site_name {
                    info["siteName"] = json!(site);
                }
                if !query.fields.is_empty() {
                    info["searchFields"] = json!(query.fields);
                }
                if !query.types.is_empty() {
                    info["searchTypes"] = json!(query.types);
                }
                WireRequest::new(None).with("searchInformation", info)
            }

            Operation::ReadAudits { query } => {
                let mut params = Map::new();
                if let Some(identifier) = &query.identifier {
                    params.insert("identifier".into(), identifier.to_wire());
                }
                if let Some(user) = &query.username {
                    params.insert("username".into(), json!(user));
                }
                if let Some(kind) = &query.audit_type {
                    params.insert("auditType".into(), json!(kind));
                }
                if let Some(start) = query.start_date {
                    params.insert("startDate".into(), json!(start.to_rfc3339()));
                }
                if let Some(end) = query.end_date {
                    params.insert("endDate".into(), json!(end.to_rfc3339()));
                }
                WireRequest::new(None).with("auditParameters", Value::Object(params))
            }

            Operation::EditAccessRights {
                identifier,
                access_rights,
                apply_to_children,
            } => {
                let mut info = access_rights.clone();
                if !info.is_object() {
                    return Err(CascadeError::UnacceptableValue(
                        "Access rights must be an object".to_string(),
                    ));
                }
                info["identifier"] = identifier.to_wire();
                WireRequest::new(None)
                    .with("accessRightsInformation", info)
                    .with("applyToChildren", json!(apply_to_children))
            }

            Operation::EditWorkflowSettings {
                identifier,
                workflow_settings,
                apply_inherit_to_children,
                apply_require_to_children,
            } => {
                let mut settings = workflow_settings.clone();
                if !settings.is_object() {
                    return Err(CascadeError::UnacceptableValue(
                        "Workflow settings must be an object".to_string(),
                    ));
                }
                settings["identifier"] = identifier.to_wire();
                WireRequest::new(None)
                    .with("workflowSettings", settings)
                    .with(
                        "applyInheritWorkflowsToChildren",
                        json!(apply_inherit_to_children),
                    )
                    .with(
                        "applyRequireWorkflowToChildren",
                        json!(apply_require_to_children),
                    )
            }

            Operation::PerformWorkflowTransition {
                workflow_id,
                action_identifier,
                comment,
            } => {
                non_empty(workflow_id, "workflow id")?;
                non_empty(action_identifier, "action identifier")?;
                WireRequest::new(None).with(
                    "workflowTransitionInformation",
                    json!({
                        "workflowId": workflow_id,
                        "actionIdentifier": action_identifier,
                        "transitionComment": comment.clone().unwrap_or_default(),
                    }),
                )
            }

            Operation::EditPreference { name, value } => {
                non_empty(name, "preference name")?;
                WireRequest::new(None).with("preference", json!({ "name": name, "value": value }))
            }

            Operation::MarkMessage { message_id, mark } => {
                non_empty(message_id, "message id")?;
                WireRequest::new(Some(&message_identifier(message_id)))
                    .with("markType", json!(mark))
            }

            Operation::DeleteMessage { message_id } => {
                non_empty(message_id, "message id")?;
                WireRequest::new(Some(&message_identifier(message_id)))
            }

            Operation::CheckIn {
                identifier,
                comments,
            } => WireRequest::new(Some(identifier)).with("comments", json!(comments)),

            Operation::ReadPreferences | Operation::ListMessages | Operation::ListSites => {
                WireRequest::new(None)
            }
        };
        Ok(request)
    }

    /// Encodes this operation as one entry of a batch.
    pub fn batch_entry(&self) -> CascadeResult<Value> {
        let key = match self {
            Operation::Read { .. } => "read",
            Operation::Create { .. } => "create",
            Operation::Edit { .. } => "edit",
            Operation::Delete { .. } => "delete",
            other => {
                return Err(CascadeError::UnacceptableValue(format!(
                    "'{}' cannot be part of a batch",
                    other.name()
                )))
            }
        };
        let request = self.wire_request()?;
        let mut entry = Map::new();
        entry.insert(key.to_string(), Value::Object(request.to_envelope_fields()));
        Ok(Value::Object(entry))
    }

    /// Turns a remote-reported failure of a mutating call into its typed error.
    ///
    /// Non-mutating results pass through untouched, successful or not.
    pub fn escalate(&self, result: OperationResult) -> CascadeResult<OperationResult> {
        if result.success {
            return Ok(result);
        }
        let message = result
            .message
            .clone()
            .unwrap_or_else(|| format!("{} failed", self.name()));
        match self.mutation() {
            Some(MutationKind::Editing) => Err(CascadeError::EditingFailure(message)),
            Some(MutationKind::Renaming) => Err(CascadeError::RenamingFailure(message)),
            Some(MutationKind::Deleting) => Err(CascadeError::DeletingFailure(message)),
            None => Ok(result),
        }
    }
}
