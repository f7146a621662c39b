use serde::{Deserialize, Serialize};

use shiptrack_core::ServiceError;

/// Shipment lifecycle status.
///
/// Forward-only: PENDING → IN_TRANSIT → DELIVERED → RECEIVED → COMPLETED,
/// with CANCELLED terminal from any non-terminal state. Which transitions
/// each actor may trigger lives in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Pending,
    InTransit,
    Delivered,
    Received,
    Completed,
    Cancelled,
}

impl Default for ShipmentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl ShipmentStatus {
    /// Wire/storage form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "PENDING",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Received => "RECEIVED",
            ShipmentStatus::Completed => "COMPLETED",
            ShipmentStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parse the wire form. Used for query filters.
    pub fn parse(s: &str) -> Result<Self, ServiceError> {
        match s {
            "PENDING" => Ok(ShipmentStatus::Pending),
            "IN_TRANSIT" => Ok(ShipmentStatus::InTransit),
            "DELIVERED" => Ok(ShipmentStatus::Delivered),
            "RECEIVED" => Ok(ShipmentStatus::Received),
            "COMPLETED" => Ok(ShipmentStatus::Completed),
            "CANCELLED" => Ok(ShipmentStatus::Cancelled),
            other => Err(ServiceError::Validation(format!(
                "unknown shipment status '{}'",
                other
            ))),
        }
    }
}

/// Shipment — one unit of transit from a sender to a destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    /// Internal id (UUIDv4, no dashes). Opaque and stable.
    pub id: String,

    /// Public 6-letter code — unique, immutable, printed on the manifest.
    pub short_code: String,

    /// Lifecycle status.
    #[serde(default)]
    pub status: ShipmentStatus,

    pub sender_name: String,

    pub sender_email: String,

    /// Destination (Location.id).
    pub location_id: String,

    /// Carrier tracking number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Client-supplied reference string (external integrations).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Addresses explicitly attached at creation, notified on lifecycle events.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notify_emails: Vec<String>,

    /// Set during receiving; unset until status reaches RECEIVED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,

    /// Signature image payload (base64). Set during receiving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_form_roundtrip() {
        for s in [
            ShipmentStatus::Pending,
            ShipmentStatus::InTransit,
            ShipmentStatus::Delivered,
            ShipmentStatus::Received,
            ShipmentStatus::Completed,
            ShipmentStatus::Cancelled,
        ] {
            assert_eq!(ShipmentStatus::parse(s.as_str()).unwrap(), s);
            // serde form matches as_str
            let json = serde_json::to_value(s).unwrap();
            assert_eq!(json.as_str().unwrap(), s.as_str());
        }
        assert!(ShipmentStatus::parse("SHIPPED").is_err());
    }

    #[test]
    fn shipment_json_roundtrip() {
        let s = Shipment {
            id: "a1".into(),
            short_code: "ABCDEF".into(),
            status: ShipmentStatus::Pending,
            sender_name: "IT Ops".into(),
            sender_email: "ops@example.com".into(),
            location_id: "loc1".into(),
            tracking_number: None,
            notes: None,
            reference: None,
            notify_emails: vec!["dock@example.com".into()],
            recipient_name: None,
            signature: None,
            received_at: None,
            create_at: Some("2026-01-01T00:00:00Z".into()),
            update_at: Some("2026-01-01T00:00:00Z".into()),
        };
        let json = serde_json::to_string(&s).unwrap();
        let back: Shipment = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
        // Recipient fields stay off the wire until receiving sets them.
        assert!(!json.contains("recipientName"));
    }
}
