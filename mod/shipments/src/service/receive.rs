use std::collections::BTreeSet;

use shiptrack_core::{new_id, now_rfc3339, ServiceError};

use crate::code;
use crate::effects::Effect;
use crate::lifecycle;
use crate::model::{Device, Shipment, ShipmentStatus};
use crate::notify::{self, NotifyEvent};

use super::{fetch_devices, fetch_shipment_by_code, insert_device, write_device, write_shipment, ShipmentService};

/// Public receive submission.
pub struct ReceiveInput {
    pub recipient_name: String,
    /// Signature image payload (base64).
    pub signature: String,
    /// Serials from the manifest confirmed present.
    pub received_serials: Vec<String>,
    /// Devices found in the box that were not on the manifest.
    pub extra_devices: Vec<ExtraDeviceInput>,
}

pub struct ExtraDeviceInput {
    pub serial: String,
    pub asset_tag: Option<String>,
    pub model: Option<String>,
}

impl ShipmentService {
    /// The receiving transaction coordinator.
    ///
    /// Validates the submission, then atomically: re-resolves the
    /// shipment by code, guards the status, flips it to RECEIVED with
    /// recipient name / signature / timestamp, checks in the confirmed
    /// manifest devices, and registers extra devices. A guard failure
    /// anywhere rolls back every write. Unlock calls and the received
    /// notification run after commit and cannot fail the request.
    ///
    /// Retried submissions are safe: the second attempt re-reads
    /// RECEIVED inside its own transaction and aborts with a conflict,
    /// and a re-sent extra serial hits the per-shipment unique
    /// constraint as a no-op.
    pub fn receive(&self, raw_code: &str, input: ReceiveInput) -> Result<Shipment, ServiceError> {
        let shipment_code = code::normalize(raw_code)?;

        let recipient_name = input.recipient_name.trim().to_string();
        if recipient_name.is_empty() {
            return Err(ServiceError::Validation("recipient name is required".into()));
        }
        if input.signature.trim().is_empty() {
            return Err(ServiceError::Validation(
                "signature payload is required".into(),
            ));
        }
        for extra in &input.extra_devices {
            if extra.serial.trim().is_empty() {
                return Err(ServiceError::Validation(
                    "extra device serial must not be empty".into(),
                ));
            }
        }

        let received: BTreeSet<String> = input
            .received_serials
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let shipment = self.in_tx(|ex| {
            let mut s = fetch_shipment_by_code(ex, &shipment_code)?.ok_or_else(|| {
                ServiceError::NotFound(format!("shipment '{}' not found", shipment_code))
            })?;

            lifecycle::check_public_receive(s.status)?;

            let now = now_rfc3339();
            s.status = ShipmentStatus::Received;
            s.recipient_name = Some(recipient_name.clone());
            s.signature = Some(input.signature.clone());
            s.received_at = Some(now.clone());
            s.update_at = Some(now.clone());
            write_shipment(ex, &s)?;

            // Manifest check-in is unconditional here: the receiving
            // transaction is the canonical first check-in event.
            for mut device in fetch_devices(ex, &s.id)? {
                if !received.contains(&device.serial) {
                    continue;
                }
                device.checked_in = true;
                device.checked_in_at = Some(now.clone());
                device.update_at = Some(now.clone());
                write_device(ex, &device)?;
            }

            for extra in &input.extra_devices {
                let device = Device {
                    id: new_id(),
                    shipment_id: s.id.clone(),
                    serial: extra.serial.trim().to_string(),
                    asset_tag: extra.asset_tag.clone(),
                    model: extra.model.clone(),
                    checked_in: true,
                    checked_in_at: Some(now.clone()),
                    is_extra: true,
                    create_at: Some(now.clone()),
                    update_at: Some(now.clone()),
                };
                insert_device(ex, &device, true)?;
            }

            Ok(s)
        })?;

        // Post-commit effects: one unlock attempt per confirmed serial,
        // then the received notification. Best-effort only.
        for serial in &received {
            self.effects.enqueue(Effect::Unlock {
                serial: serial.clone(),
            });
        }

        let location = self.get_location(&shipment.location_id).ok();
        let to = notify::recipients(
            NotifyEvent::Received,
            &shipment,
            location.as_ref(),
            &self.admin_emails,
        );
        self.effects.enqueue(Effect::Notify {
            to,
            subject: notify::subject(NotifyEvent::Received, &shipment),
            body: format!(
                "Shipment {} was received by {}.",
                shipment.short_code, recipient_name
            ),
        });

        Ok(shipment)
    }
}
