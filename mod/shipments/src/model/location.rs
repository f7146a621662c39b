use serde::{Deserialize, Serialize};

/// Location — a named delivery point with its own notification
/// subscriber list, mutable independently of any shipment. Many
/// shipments may reference one location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Internal id (UUIDv4, no dashes).
    pub id: String,

    /// Display name — unique. Implicit creation keys on this.
    pub name: String,

    /// Subscribed notification addresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notify_emails: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}
