//! Notification fan-out assembly.
//!
//! Pure functions from a lifecycle event plus entities to a deduplicated
//! recipient set. Sending is someone else's job (`effects::Mailer`).

use std::collections::BTreeSet;

use crate::model::{Location, Shipment};

/// Lifecycle events that fan out to email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEvent {
    Created,
    Received,
}

/// Assemble the recipient set for an event.
///
/// - Created: administrators ∪ location subscribers ∪ addresses supplied
///   with the creation request.
/// - Received: administrators ∪ location subscribers ∪ the sender.
///
/// Every address is trimmed, empties are dropped, and duplicates collapse
/// by exact match (no case folding beyond the trim).
pub fn recipients(
    event: NotifyEvent,
    shipment: &Shipment,
    location: Option<&Location>,
    admins: &[String],
) -> Vec<String> {
    let mut set: BTreeSet<String> = BTreeSet::new();

    let mut add = |addr: &str| {
        let trimmed = addr.trim();
        if !trimmed.is_empty() {
            set.insert(trimmed.to_string());
        }
    };

    for a in admins {
        add(a);
    }
    if let Some(loc) = location {
        for a in &loc.notify_emails {
            add(a);
        }
    }
    match event {
        NotifyEvent::Created => {
            for a in &shipment.notify_emails {
                add(a);
            }
        }
        NotifyEvent::Received => add(&shipment.sender_email),
    }

    set.into_iter().collect()
}

/// Subject line for an event. Template content is out of scope; this is
/// the minimal wrapper the mail collaborator needs.
pub fn subject(event: NotifyEvent, shipment: &Shipment) -> String {
    match event {
        NotifyEvent::Created => format!("Shipment {} created", shipment.short_code),
        NotifyEvent::Received => format!("Shipment {} received", shipment.short_code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShipmentStatus;

    fn shipment() -> Shipment {
        Shipment {
            id: "s1".into(),
            short_code: "ABCDEF".into(),
            status: ShipmentStatus::Pending,
            sender_name: "IT Ops".into(),
            sender_email: "sender@example.com".into(),
            location_id: "loc1".into(),
            tracking_number: None,
            notes: None,
            reference: None,
            notify_emails: vec![" extra@example.com ".into(), "admin@example.com".into()],
            recipient_name: None,
            signature: None,
            received_at: None,
            create_at: None,
            update_at: None,
        }
    }

    fn location() -> Location {
        Location {
            id: "loc1".into(),
            name: "Warehouse 3".into(),
            notify_emails: vec!["dock@example.com".into(), "".into()],
            create_at: None,
            update_at: None,
        }
    }

    #[test]
    fn created_unions_all_three_sources() {
        let admins = vec!["admin@example.com".to_string()];
        let out = recipients(NotifyEvent::Created, &shipment(), Some(&location()), &admins);
        assert_eq!(
            out,
            vec![
                "admin@example.com".to_string(),
                "dock@example.com".to_string(),
                "extra@example.com".to_string(),
            ]
        );
    }

    #[test]
    fn received_includes_sender_not_request_addresses() {
        let admins = vec!["admin@example.com".to_string()];
        let out = recipients(NotifyEvent::Received, &shipment(), Some(&location()), &admins);
        assert!(out.contains(&"sender@example.com".to_string()));
        assert!(!out.contains(&"extra@example.com".to_string()));
    }

    #[test]
    fn empties_and_duplicates_dropped() {
        let admins = vec!["admin@example.com".to_string(), "  ".to_string()];
        let out = recipients(NotifyEvent::Created, &shipment(), Some(&location()), &admins);
        // admin@example.com appears in both admins and the shipment list.
        assert_eq!(out.iter().filter(|a| *a == "admin@example.com").count(), 1);
        assert!(out.iter().all(|a| !a.is_empty()));
    }

    #[test]
    fn dedup_is_exact_match_only() {
        let admins = vec!["Admin@example.com".to_string(), "admin@example.com".to_string()];
        let out = recipients(NotifyEvent::Received, &shipment(), None, &admins);
        // Case variants are distinct addresses here.
        assert!(out.contains(&"Admin@example.com".to_string()));
        assert!(out.contains(&"admin@example.com".to_string()));
    }

    #[test]
    fn no_location_is_fine() {
        let out = recipients(NotifyEvent::Received, &shipment(), None, &[]);
        assert_eq!(out, vec!["sender@example.com".to_string()]);
    }
}
