//! Platform record types shared by the adapters.
//!
//! # Design
//! The service fields of app items and process instances are collected in
//! `AppCommon` and `ProcCommon`. User record types embed them with
//! `#[serde(flatten)]` next to their own fields:
//!
//! ```
//! use e365_gateway::AppCommon;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct Product {
//!     #[serde(flatten)]
//!     common: AppCommon,
//!     #[serde(default, skip_serializing_if = "Option::is_none")]
//!     price: Option<i64>,
//! }
//! ```
//!
//! Every service field is optional so that a record can be sent to `create`
//! with only user fields set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process state of a finished instance.
pub const STATE_DONE: &str = "done";
/// Process state of a running instance.
pub const STATE_EXEC: &str = "exec";

/// Service fields present on every app item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppCommon {
    #[serde(rename = "__id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "__name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "__createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "__createdBy", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(rename = "__updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "__updatedBy", default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(rename = "__deletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(rename = "__index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(rename = "__subscribers", default, skip_serializing_if = "Vec::is_empty")]
    pub subscribers: Vec<String>,
    #[serde(rename = "__version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(rename = "__debug", default, skip_serializing_if = "std::ops::Not::not")]
    pub debug: bool,
    #[serde(rename = "__externalId", default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(rename = "__status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

/// Current status of an app item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStatus {
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub status: i64,
}

/// Statuses and status groups configured for an app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    #[serde(default)]
    pub status_items: Vec<StatusItem>,
    #[serde(default)]
    pub group_items: Vec<GroupItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusItem {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub group_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupItem {
    pub id: String,
    pub code: String,
    pub name: String,
}

/// The template a process instance was started from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcTemplate {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub version: i64,
}

/// Service fields present on every process instance context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcCommon {
    #[serde(rename = "__id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "__name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "__state", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "__templateId", default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(rename = "__template", default, skip_serializing_if = "Option::is_none")]
    pub template: Option<ProcTemplate>,
    #[serde(rename = "__createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "__createdBy", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(rename = "__updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "__updatedBy", default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(rename = "__subscribers", default, skip_serializing_if = "Vec::is_empty")]
    pub subscribers: Vec<String>,
}

/// Process context with only service fields, for processes that take no
/// input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyProcCtx {
    #[serde(flatten)]
    pub common: ProcCommon,
}

/// Metadata of a stored file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(rename = "__id")]
    pub id: String,
    #[serde(rename = "__name", default)]
    pub name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub version: i64,
    #[serde(rename = "__createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "__createdBy", default)]
    pub created_by: Option<String>,
    #[serde(rename = "__updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "__deletedAt", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Metadata of a disk directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryInfo {
    #[serde(rename = "__id")]
    pub id: String,
    #[serde(rename = "__name", default)]
    pub name: String,
    #[serde(default)]
    pub system: bool,
    /// Parent directory id.
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub parents_list: Vec<String>,
    #[serde(default)]
    pub unique_names: bool,
    #[serde(rename = "__createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "__createdBy", default)]
    pub created_by: Option<String>,
    #[serde(rename = "__deletedAt", default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_common_omits_unset_fields() {
        let common = AppCommon {
            name: Some("test1".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&common).unwrap();
        assert_eq!(json, serde_json::json!({"__name": "test1"}));
    }

    #[test]
    fn app_common_reads_service_fields() {
        let raw = r#"{
            "__id": "018a2b9f-003d-2b48-7e2a-324e6fc16db8",
            "__name": "test2",
            "__createdAt": "2023-08-24T10:00:00Z",
            "__status": {"order": 1, "status": 2},
            "__subscribers": ["u1"]
        }"#;
        let common: AppCommon = serde_json::from_str(raw).unwrap();
        assert_eq!(common.name.as_deref(), Some("test2"));
        assert_eq!(common.status, Some(ItemStatus { order: 1, status: 2 }));
        assert_eq!(common.subscribers, vec!["u1".to_string()]);
        assert!(common.created_at.is_some());
    }

    #[test]
    fn status_info_decodes() {
        let raw = r#"{"statusItems":[{"id":1,"name":"New","code":"st1","groupId":""}],"groupItems":[]}"#;
        let info: StatusInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.status_items[0].code, "st1");
        assert!(info.group_items.is_empty());
    }

    #[test]
    fn empty_proc_ctx_serializes_to_empty_object() {
        let json = serde_json::to_string(&EmptyProcCtx::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
