//! Shipment lifecycle state machine.
//!
//! All three entry points (dashboard edits, the public receive endpoint,
//! administrative verification) consult this single authority instead of
//! re-implementing the guard per endpoint. Every check is evaluated
//! against a status read *inside* the caller's transaction, so racing
//! writers resolve here rather than on a stale status from earlier in
//! the request.

use shiptrack_core::ServiceError;

use crate::model::ShipmentStatus;

/// Statuses from which the public receive action is legal.
pub const RECEIVABLE: &[ShipmentStatus] = &[
    ShipmentStatus::Pending,
    ShipmentStatus::InTransit,
    ShipmentStatus::Delivered,
];

/// Public receive: legal only from PENDING / IN_TRANSIT / DELIVERED,
/// target always RECEIVED. Anything else is a conflict naming the
/// current status — not a validation error, since the request itself
/// was well-formed and a retry against a different shipment may succeed.
pub fn check_public_receive(current: ShipmentStatus) -> Result<(), ServiceError> {
    if RECEIVABLE.contains(&current) {
        return Ok(());
    }
    Err(ServiceError::Conflict(format!(
        "shipment cannot be received: status is {}",
        current.as_str()
    )))
}

/// Administrative edit guard.
///
/// Edits are rejected outright once a shipment is COMPLETED or
/// CANCELLED, with one deliberate exception: an edit that targets
/// COMPLETED is permitted from any current status other than CANCELLED.
/// That asymmetry finalizes a received shipment while still refusing to
/// resurrect a cancelled one; it is kept exactly as-is rather than
/// generalized.
pub fn check_admin_edit(
    current: ShipmentStatus,
    target: Option<ShipmentStatus>,
) -> Result<(), ServiceError> {
    let terminal = matches!(
        current,
        ShipmentStatus::Completed | ShipmentStatus::Cancelled
    );
    if !terminal {
        return Ok(());
    }
    if target == Some(ShipmentStatus::Completed) && current != ShipmentStatus::Cancelled {
        return Ok(());
    }
    Err(ServiceError::Conflict(format!(
        "shipment is {} and can no longer be edited",
        current.as_str()
    )))
}

/// Administrative verification: RECEIVED → COMPLETED only.
pub fn check_verify(current: ShipmentStatus) -> Result<(), ServiceError> {
    if current == ShipmentStatus::Received {
        return Ok(());
    }
    Err(ServiceError::Conflict(format!(
        "shipment cannot be verified: status is {}, expected RECEIVED",
        current.as_str()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ShipmentStatus::*;

    #[test]
    fn receive_legal_sources() {
        assert!(check_public_receive(Pending).is_ok());
        assert!(check_public_receive(InTransit).is_ok());
        assert!(check_public_receive(Delivered).is_ok());
    }

    #[test]
    fn receive_illegal_sources_conflict() {
        for s in [Received, Completed, Cancelled] {
            let err = check_public_receive(s).unwrap_err();
            match err {
                ServiceError::Conflict(msg) => assert!(msg.contains(s.as_str())),
                other => panic!("expected Conflict, got {:?}", other),
            }
        }
    }

    #[test]
    fn admin_edit_free_from_non_terminal() {
        for current in [Pending, InTransit, Delivered, Received] {
            for target in [Pending, InTransit, Delivered, Received, Completed, Cancelled] {
                assert!(check_admin_edit(current, Some(target)).is_ok());
            }
            assert!(check_admin_edit(current, None).is_ok());
        }
    }

    #[test]
    fn admin_edit_blocked_once_terminal() {
        assert!(check_admin_edit(Completed, Some(Pending)).is_err());
        assert!(check_admin_edit(Completed, Some(Cancelled)).is_err());
        assert!(check_admin_edit(Completed, None).is_err());
        assert!(check_admin_edit(Cancelled, Some(Pending)).is_err());
        assert!(check_admin_edit(Cancelled, None).is_err());
    }

    #[test]
    fn admin_edit_completed_carveout() {
        // Targeting COMPLETED is allowed from anywhere except CANCELLED.
        for current in [Pending, InTransit, Delivered, Received, Completed] {
            assert!(check_admin_edit(current, Some(Completed)).is_ok());
        }
        assert!(check_admin_edit(Cancelled, Some(Completed)).is_err());
    }

    #[test]
    fn verify_only_from_received() {
        assert!(check_verify(Received).is_ok());
        for s in [Pending, InTransit, Delivered, Completed, Cancelled] {
            assert!(check_verify(s).is_err());
        }
    }
}
