use serde::{Deserialize, Serialize};

/// Device — one physical unit within a shipment.
///
/// Serial numbers are unique within their shipment, not globally. A device
/// belongs to exactly one shipment for its lifetime; rows are only ever
/// mutated to flip the check-in flag, never reassigned or deleted on
/// their own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Internal id (UUIDv4, no dashes).
    pub id: String,

    /// Owning shipment (Shipment.id).
    pub shipment_id: String,

    pub serial: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Physically confirmed present.
    #[serde(default)]
    pub checked_in: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_in_at: Option<String>,

    /// True only for devices discovered during receiving, never for
    /// devices declared on the original manifest.
    #[serde(default)]
    pub is_extra: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_json_roundtrip() {
        let d = Device {
            id: "d1".into(),
            shipment_id: "s1".into(),
            serial: "SN-001".into(),
            asset_tag: Some("IT-4411".into()),
            model: None,
            checked_in: false,
            checked_in_at: None,
            is_extra: false,
            create_at: Some("2026-01-01T00:00:00Z".into()),
            update_at: None,
        };
        let json = serde_json::to_string(&d).unwrap();
        let back: Device = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}
