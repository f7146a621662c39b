use serde::{Deserialize, Serialize};

/// ApiKey — credential for the external-client creation path.
///
/// The raw key value is stored as an indexed column for lookup; this is
/// an internal integration credential, not an end-user password, so no
/// hashing scheme is layered on top.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    /// Internal id (UUIDv4, no dashes).
    pub id: String,

    /// The key value presented in the `x-api-key` header.
    pub key: String,

    /// Who/what this key identifies.
    pub description: String,

    /// Inactive keys are rejected with 403 rather than deleted, so the
    /// identity survives for auditing.
    #[serde(default)]
    pub active: bool,

    /// Refreshed on every successful verification (best-effort).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}
