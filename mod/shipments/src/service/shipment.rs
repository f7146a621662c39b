use std::collections::{BTreeSet, HashSet};

use shiptrack_core::{new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use shiptrack_sql::{SQLError, Value};

use crate::code;
use crate::effects::Effect;
use crate::lifecycle;
use crate::model::{Device, Shipment, ShipmentStatus};
use crate::notify::{self, NotifyEvent};

use super::{
    fetch_devices, fetch_shipment_by_code, insert_device, insert_shipment, write_device,
    write_shipment, ShipmentService,
};

/// Bounded retry for short-code allocation. The code space is 26^6, so
/// hitting this bound means something other than bad luck.
const MAX_CODE_ATTEMPTS: usize = 5;

pub struct CreateShipmentInput {
    pub sender_name: String,
    pub sender_email: String,
    /// Destination by id; exactly one of `location_id` / `location_name`.
    pub location_id: Option<String>,
    /// Destination by name, created implicitly on first use.
    pub location_name: Option<String>,
    pub devices: Vec<DeviceInput>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub reference: Option<String>,
    pub notify_emails: Vec<String>,
}

pub struct DeviceInput {
    pub serial: String,
    pub asset_tag: Option<String>,
    pub model: Option<String>,
}

/// Typed patch for administrative edits. Absent fields are untouched;
/// an empty string clears `tracking_number` / `notes`. Short code and
/// recipient fields are deliberately not patchable.
#[derive(Debug, Default)]
pub struct ShipmentPatch {
    pub status: Option<ShipmentStatus>,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub notify_emails: Option<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct ShipmentFilters {
    pub status: Option<ShipmentStatus>,
    pub location_id: Option<String>,
}

/// Outcome of an ad-hoc single-device check-in.
pub struct CheckInOutcome {
    pub device: Device,
    /// True if the device was already checked in; the returned device
    /// then carries the prior timestamp untouched.
    pub already_checked_in: bool,
}

impl ShipmentService {
    // ── Creation ──

    /// Create a shipment with its manifest devices.
    ///
    /// Short-code allocation is optimistic: draw a candidate, attempt the
    /// insert under the unique constraint, and retry on collision with a
    /// fresh candidate. Only a uniqueness violation on the short-code
    /// column retries; any other failure propagates immediately. The
    /// shipment row and every manifest device row land in one
    /// transaction, so a failed attempt leaves nothing behind.
    pub fn create_shipment(&self, input: CreateShipmentInput) -> Result<Shipment, ServiceError> {
        let sender_name = input.sender_name.trim().to_string();
        if sender_name.is_empty() {
            return Err(ServiceError::Validation("sender name is required".into()));
        }
        let sender_email = input.sender_email.trim().to_string();
        if sender_email.is_empty() {
            return Err(ServiceError::Validation("sender email is required".into()));
        }

        let mut seen = HashSet::new();
        for d in &input.devices {
            let serial = d.serial.trim();
            if serial.is_empty() {
                return Err(ServiceError::Validation(
                    "manifest device serial must not be empty".into(),
                ));
            }
            if !seen.insert(serial.to_string()) {
                return Err(ServiceError::Validation(format!(
                    "duplicate serial '{}' on manifest",
                    serial
                )));
            }
        }

        // Destinations persist independently of shipments, so resolving
        // (or implicitly creating) the location happens before the
        // allocation loop and survives a failed creation attempt.
        let location = match (&input.location_id, &input.location_name) {
            (Some(id), _) => self.get_location(id)?,
            (None, Some(name)) => self.find_or_create_location(name)?,
            (None, None) => {
                return Err(ServiceError::Validation(
                    "a destination location id or name is required".into(),
                ))
            }
        };

        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = (self.codegen)();
            let now = now_rfc3339();

            let shipment = Shipment {
                id: new_id(),
                short_code: candidate,
                status: ShipmentStatus::Pending,
                sender_name: sender_name.clone(),
                sender_email: sender_email.clone(),
                location_id: location.id.clone(),
                tracking_number: input.tracking_number.clone(),
                notes: input.notes.clone(),
                reference: input.reference.clone(),
                notify_emails: input.notify_emails.clone(),
                recipient_name: None,
                signature: None,
                received_at: None,
                create_at: Some(now.clone()),
                update_at: Some(now.clone()),
            };

            let mut code_taken = false;
            let result = self.in_tx(|ex| {
                match insert_shipment(ex, &shipment) {
                    Ok(()) => {}
                    Err(SQLError::UniqueViolation { constraint })
                        if constraint == "shipments.short_code" =>
                    {
                        code_taken = true;
                        return Err(ServiceError::Conflict(format!(
                            "short code {} already allocated",
                            shipment.short_code
                        )));
                    }
                    Err(e) => return Err(super::sql_err(e)),
                }

                for d in &input.devices {
                    let device = Device {
                        id: new_id(),
                        shipment_id: shipment.id.clone(),
                        serial: d.serial.trim().to_string(),
                        asset_tag: d.asset_tag.clone(),
                        model: d.model.clone(),
                        checked_in: false,
                        checked_in_at: None,
                        is_extra: false,
                        create_at: Some(now.clone()),
                        update_at: Some(now.clone()),
                    };
                    insert_device(ex, &device, false)?;
                }
                Ok(shipment.clone())
            });

            match result {
                Ok(created) => {
                    let to = notify::recipients(
                        NotifyEvent::Created,
                        &created,
                        Some(&location),
                        &self.admin_emails,
                    );
                    self.effects.enqueue(Effect::Notify {
                        to,
                        subject: notify::subject(NotifyEvent::Created, &created),
                        body: format!(
                            "Shipment {} to {} created with {} device(s).",
                            created.short_code,
                            location.name,
                            input.devices.len()
                        ),
                    });
                    return Ok(created);
                }
                Err(_) if code_taken => continue,
                Err(e) => return Err(e),
            }
        }

        Err(ServiceError::Conflict(format!(
            "short code allocation exhausted after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    // ── Lookup ──

    /// Get a shipment by short code (case-normalized).
    pub fn get_shipment(&self, raw_code: &str) -> Result<Shipment, ServiceError> {
        let code = code::normalize(raw_code)?;
        fetch_shipment_by_code(self.sql.as_ref(), &code)?
            .ok_or_else(|| ServiceError::NotFound(format!("shipment '{}' not found", code)))
    }

    /// List devices belonging to a shipment.
    pub fn list_devices(&self, raw_code: &str) -> Result<Vec<Device>, ServiceError> {
        let shipment = self.get_shipment(raw_code)?;
        fetch_devices(self.sql.as_ref(), &shipment.id)
    }

    pub fn list_shipments(
        &self,
        params: &ListParams,
        filters: &ShipmentFilters,
    ) -> Result<ListResult<Shipment>, ServiceError> {
        let limit = params.limit.min(500);
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(s) = filters.status {
            f.push(("status", Value::Text(s.as_str().to_string())));
        }
        if let Some(ref loc) = filters.location_id {
            f.push(("location_id", Value::Text(loc.clone())));
        }
        self.list_records("shipments", &f, limit, params.offset)
    }

    // ── Administrative operations ──

    /// Apply an administrative edit. The lifecycle guard runs against
    /// the status re-read inside the transaction, so an edit racing a
    /// public receive resolves on the committed status, not on whatever
    /// the dashboard last displayed.
    pub fn edit_shipment(
        &self,
        raw_code: &str,
        patch: ShipmentPatch,
    ) -> Result<Shipment, ServiceError> {
        let code = code::normalize(raw_code)?;
        self.in_tx(|ex| {
            let mut s = fetch_shipment_by_code(ex, &code)?
                .ok_or_else(|| ServiceError::NotFound(format!("shipment '{}' not found", code)))?;

            lifecycle::check_admin_edit(s.status, patch.status)?;

            if let Some(status) = patch.status {
                s.status = status;
            }
            if let Some(ref v) = patch.sender_name {
                s.sender_name = v.trim().to_string();
            }
            if let Some(ref v) = patch.sender_email {
                s.sender_email = v.trim().to_string();
            }
            // An empty value clears these fields; absent leaves them alone.
            if let Some(ref v) = patch.tracking_number {
                let v = v.trim();
                s.tracking_number = (!v.is_empty()).then(|| v.to_string());
            }
            if let Some(ref v) = patch.notes {
                let v = v.trim();
                s.notes = (!v.is_empty()).then(|| v.to_string());
            }
            if let Some(ref v) = patch.notify_emails {
                s.notify_emails = v.clone();
            }
            s.update_at = Some(now_rfc3339());

            write_shipment(ex, &s)?;
            Ok(s)
        })
    }

    /// Administrative verification: RECEIVED → COMPLETED, plus a
    /// selective check-in batch. Devices already checked in are left
    /// untouched — their original check-in timestamp stands.
    pub fn verify_shipment(
        &self,
        raw_code: &str,
        serials: &[String],
    ) -> Result<Shipment, ServiceError> {
        let code = code::normalize(raw_code)?;
        let wanted: BTreeSet<String> = serials
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        self.in_tx(|ex| {
            let mut s = fetch_shipment_by_code(ex, &code)?
                .ok_or_else(|| ServiceError::NotFound(format!("shipment '{}' not found", code)))?;

            lifecycle::check_verify(s.status)?;

            let now = now_rfc3339();
            s.status = ShipmentStatus::Completed;
            s.update_at = Some(now.clone());
            write_shipment(ex, &s)?;

            for mut device in fetch_devices(ex, &s.id)? {
                if device.checked_in || !wanted.contains(&device.serial) {
                    continue;
                }
                device.checked_in = true;
                device.checked_in_at = Some(now.clone());
                device.update_at = Some(now.clone());
                write_device(ex, &device)?;
            }
            Ok(s)
        })
    }

    /// Delete a shipment and its devices. Device rows never outlive
    /// their shipment.
    pub fn delete_shipment(&self, raw_code: &str) -> Result<(), ServiceError> {
        let code = code::normalize(raw_code)?;
        self.in_tx(|ex| {
            let s = fetch_shipment_by_code(ex, &code)?
                .ok_or_else(|| ServiceError::NotFound(format!("shipment '{}' not found", code)))?;
            ex.exec(
                "DELETE FROM devices WHERE shipment_id = ?1",
                &[Value::Text(s.id.clone())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
            ex.exec(
                "DELETE FROM shipments WHERE id = ?1",
                &[Value::Text(s.id.clone())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
            Ok(())
        })
    }

    /// Ad-hoc single-device check-in, outside the receiving flow.
    ///
    /// A device that is already checked in is a successful no-op
    /// reporting the prior timestamp, not an error.
    pub fn checkin_device(
        &self,
        raw_code: &str,
        serial: &str,
    ) -> Result<CheckInOutcome, ServiceError> {
        let code = code::normalize(raw_code)?;
        let serial = serial.trim().to_string();
        if serial.is_empty() {
            return Err(ServiceError::Validation("device serial is required".into()));
        }

        self.in_tx(|ex| {
            let s = fetch_shipment_by_code(ex, &code)?
                .ok_or_else(|| ServiceError::NotFound(format!("shipment '{}' not found", code)))?;

            let mut device = fetch_devices(ex, &s.id)?
                .into_iter()
                .find(|d| d.serial == serial)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "device '{}' not found on shipment {}",
                        serial, code
                    ))
                })?;

            if device.checked_in {
                return Ok(CheckInOutcome {
                    device,
                    already_checked_in: true,
                });
            }

            let now = now_rfc3339();
            device.checked_in = true;
            device.checked_in_at = Some(now.clone());
            device.update_at = Some(now);
            write_device(ex, &device)?;
            Ok(CheckInOutcome {
                device,
                already_checked_in: false,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::test_service;
    use super::*;

    fn input(devices: Vec<DeviceInput>) -> CreateShipmentInput {
        CreateShipmentInput {
            sender_name: "IT Ops".into(),
            sender_email: "ops@example.com".into(),
            location_id: None,
            location_name: Some("Warehouse 3".into()),
            devices,
            tracking_number: None,
            notes: None,
            reference: None,
            notify_emails: vec![],
        }
    }

    fn dev(serial: &str) -> DeviceInput {
        DeviceInput {
            serial: serial.into(),
            asset_tag: None,
            model: None,
        }
    }

    #[test]
    fn create_sets_pending_and_code_shape() {
        let (svc, mailer, _) = test_service();
        let s = svc.create_shipment(input(vec![dev("A1"), dev("A2")])).unwrap();
        assert_eq!(s.status, ShipmentStatus::Pending);
        assert_eq!(s.short_code.len(), 6);
        assert!(s.short_code.bytes().all(|b| b.is_ascii_uppercase()));
        assert!(s.recipient_name.is_none());
        assert!(s.received_at.is_none());

        let devices = svc.list_devices(&s.short_code).unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices.iter().all(|d| !d.checked_in && !d.is_extra));

        // Creation notification went out once.
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn create_codes_are_distinct() {
        let (svc, _, _) = test_service();
        let mut codes = std::collections::HashSet::new();
        for _ in 0..50 {
            let s = svc.create_shipment(input(vec![])).unwrap();
            assert!(codes.insert(s.short_code));
        }
    }

    #[test]
    fn allocation_exhaustion_conflicts_without_partial_rows() {
        let (svc, _, _) = test_service();
        let existing = svc.create_shipment(input(vec![])).unwrap();

        // Every candidate collides with the existing code, so the
        // allocator runs out of attempts.
        let taken = existing.short_code.clone();
        let svc = svc.with_codegen(move || taken.clone());

        let err = svc.create_shipment(input(vec![dev("A1")])).unwrap_err();
        match err {
            ServiceError::Conflict(msg) => assert!(msg.contains("exhausted")),
            other => panic!("expected Conflict, got {:?}", other),
        }

        // No shipment or device row survives the failed attempts.
        let all = svc
            .list_shipments(&ListParams::default(), &ShipmentFilters::default())
            .unwrap();
        assert_eq!(all.total, 1);
        let rows = svc.sql.query("SELECT COUNT(*) as cnt FROM devices", &[]).unwrap();
        assert_eq!(rows[0].get_i64("cnt"), Some(0));
    }

    #[test]
    fn short_code_collision_is_distinguishable() {
        // The allocator's retry condition: a duplicate short code must
        // surface as a UniqueViolation naming shipments.short_code,
        // not as a generic storage failure.
        let (svc, _, _) = test_service();
        let existing = svc.create_shipment(input(vec![])).unwrap();

        let mut clash = existing.clone();
        clash.id = shiptrack_core::new_id();
        let err = svc
            .in_tx(|ex| insert_shipment(ex, &clash).map_err(super::super::sql_err))
            .unwrap_err();
        match err {
            ServiceError::Conflict(msg) => assert!(msg.contains("shipments.short_code")),
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn create_validation_rejected_before_store() {
        let (svc, _, _) = test_service();
        let mut bad = input(vec![]);
        bad.sender_name = "   ".into();
        assert!(matches!(
            svc.create_shipment(bad),
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            svc.create_shipment(input(vec![dev("A1"), dev("A1")])),
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            svc.create_shipment(input(vec![dev("  ")])),
            Err(ServiceError::Validation(_))
        ));

        let mut no_loc = input(vec![]);
        no_loc.location_name = None;
        assert!(matches!(
            svc.create_shipment(no_loc),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn create_reuses_location_by_name() {
        let (svc, _, _) = test_service();
        let a = svc.create_shipment(input(vec![])).unwrap();
        let b = svc.create_shipment(input(vec![])).unwrap();
        assert_eq!(a.location_id, b.location_id);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let (svc, _, _) = test_service();
        let s = svc.create_shipment(input(vec![])).unwrap();
        let found = svc.get_shipment(&s.short_code.to_lowercase()).unwrap();
        assert_eq!(found.id, s.id);
    }

    #[test]
    fn lookup_bad_shape_is_validation_not_notfound() {
        let (svc, _, _) = test_service();
        assert!(matches!(
            svc.get_shipment("TOOLONG"),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.get_shipment("ZZZZZZ"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn edit_moves_status_forward() {
        let (svc, _, _) = test_service();
        let s = svc.create_shipment(input(vec![])).unwrap();
        let patch = ShipmentPatch {
            status: Some(ShipmentStatus::InTransit),
            tracking_number: Some("1Z999".into()),
            ..Default::default()
        };
        let updated = svc.edit_shipment(&s.short_code, patch).unwrap();
        assert_eq!(updated.status, ShipmentStatus::InTransit);
        assert_eq!(updated.tracking_number.as_deref(), Some("1Z999"));
    }

    #[test]
    fn edit_empty_value_clears_optional_fields() {
        let (svc, _, _) = test_service();
        let s = svc.create_shipment(input(vec![])).unwrap();
        svc.edit_shipment(
            &s.short_code,
            ShipmentPatch {
                tracking_number: Some("1Z999".into()),
                notes: Some("fragile".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let cleared = svc
            .edit_shipment(
                &s.short_code,
                ShipmentPatch {
                    tracking_number: Some("".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(cleared.tracking_number.is_none());
        // Absent field untouched.
        assert_eq!(cleared.notes.as_deref(), Some("fragile"));
    }

    #[test]
    fn edit_rejected_once_completed_except_completed_target() {
        let (svc, _, _) = test_service();
        let s = svc.create_shipment(input(vec![])).unwrap();
        svc.edit_shipment(
            &s.short_code,
            ShipmentPatch {
                status: Some(ShipmentStatus::Completed),
                ..Default::default()
            },
        )
        .unwrap();

        // COMPLETED → PENDING is a conflict.
        let err = svc
            .edit_shipment(
                &s.short_code,
                ShipmentPatch {
                    status: Some(ShipmentStatus::Pending),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(
            svc.get_shipment(&s.short_code).unwrap().status,
            ShipmentStatus::Completed
        );
    }

    #[test]
    fn edit_targeting_completed_allowed_from_received() {
        let (svc, _, _) = test_service();
        let s = svc.create_shipment(input(vec![])).unwrap();
        svc.edit_shipment(
            &s.short_code,
            ShipmentPatch {
                status: Some(ShipmentStatus::Received),
                ..Default::default()
            },
        )
        .unwrap();
        let updated = svc
            .edit_shipment(
                &s.short_code,
                ShipmentPatch {
                    status: Some(ShipmentStatus::Completed),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, ShipmentStatus::Completed);
    }

    #[test]
    fn edit_rejected_from_cancelled_even_to_completed() {
        let (svc, _, _) = test_service();
        let s = svc.create_shipment(input(vec![])).unwrap();
        svc.edit_shipment(
            &s.short_code,
            ShipmentPatch {
                status: Some(ShipmentStatus::Cancelled),
                ..Default::default()
            },
        )
        .unwrap();
        let err = svc
            .edit_shipment(
                &s.short_code,
                ShipmentPatch {
                    status: Some(ShipmentStatus::Completed),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn verify_requires_received_and_checks_in_selectively() {
        let (svc, _, _) = test_service();
        let s = svc.create_shipment(input(vec![dev("A1"), dev("A2")])).unwrap();

        // Not yet received.
        let err = svc.verify_shipment(&s.short_code, &[]).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        svc.edit_shipment(
            &s.short_code,
            ShipmentPatch {
                status: Some(ShipmentStatus::Received),
                ..Default::default()
            },
        )
        .unwrap();

        let done = svc
            .verify_shipment(&s.short_code, &["A1".to_string()])
            .unwrap();
        assert_eq!(done.status, ShipmentStatus::Completed);

        let devices = svc.list_devices(&s.short_code).unwrap();
        let a1 = devices.iter().find(|d| d.serial == "A1").unwrap();
        let a2 = devices.iter().find(|d| d.serial == "A2").unwrap();
        assert!(a1.checked_in);
        assert!(!a2.checked_in);
    }

    #[test]
    fn verify_does_not_overwrite_earlier_checkin() {
        let (svc, _, _) = test_service();
        let s = svc.create_shipment(input(vec![dev("A1")])).unwrap();
        let first = svc.checkin_device(&s.short_code, "A1").unwrap();
        assert!(!first.already_checked_in);
        let stamp = first.device.checked_in_at.clone().unwrap();

        svc.edit_shipment(
            &s.short_code,
            ShipmentPatch {
                status: Some(ShipmentStatus::Received),
                ..Default::default()
            },
        )
        .unwrap();
        svc.verify_shipment(&s.short_code, &["A1".to_string()]).unwrap();

        let devices = svc.list_devices(&s.short_code).unwrap();
        assert_eq!(devices[0].checked_in_at.as_deref(), Some(stamp.as_str()));
    }

    #[test]
    fn checkin_device_idempotent_and_notfound() {
        let (svc, _, _) = test_service();
        let s = svc.create_shipment(input(vec![dev("A1")])).unwrap();

        let first = svc.checkin_device(&s.short_code, "A1").unwrap();
        assert!(!first.already_checked_in);
        let second = svc.checkin_device(&s.short_code, "A1").unwrap();
        assert!(second.already_checked_in);
        assert_eq!(second.device.checked_in_at, first.device.checked_in_at);

        assert!(matches!(
            svc.checkin_device(&s.short_code, "NOPE"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn delete_removes_shipment_and_devices() {
        let (svc, _, _) = test_service();
        let s = svc.create_shipment(input(vec![dev("A1")])).unwrap();
        svc.delete_shipment(&s.short_code).unwrap();
        assert!(matches!(
            svc.get_shipment(&s.short_code),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn list_filters_by_status() {
        let (svc, _, _) = test_service();
        let a = svc.create_shipment(input(vec![])).unwrap();
        let _b = svc.create_shipment(input(vec![])).unwrap();
        svc.edit_shipment(
            &a.short_code,
            ShipmentPatch {
                status: Some(ShipmentStatus::InTransit),
                ..Default::default()
            },
        )
        .unwrap();

        let all = svc
            .list_shipments(&ListParams::default(), &ShipmentFilters::default())
            .unwrap();
        assert_eq!(all.total, 2);

        let in_transit = svc
            .list_shipments(
                &ListParams::default(),
                &ShipmentFilters {
                    status: Some(ShipmentStatus::InTransit),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(in_transit.total, 1);
        assert_eq!(in_transit.items[0].id, a.id);
    }
}
