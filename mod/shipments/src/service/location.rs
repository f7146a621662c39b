use shiptrack_core::{new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use shiptrack_sql::Value;

use crate::model::Location;

use super::ShipmentService;

impl ShipmentService {
    /// Explicit location creation (administrator).
    pub fn create_location(
        &self,
        name: &str,
        notify_emails: Vec<String>,
    ) -> Result<Location, ServiceError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::Validation("location name is required".into()));
        }

        let id = new_id();
        let now = now_rfc3339();
        let record = Location {
            id: id.clone(),
            name: name.clone(),
            notify_emails,
            create_at: Some(now.clone()),
            update_at: Some(now.clone()),
        };

        self.insert_record("locations", &id, &record, &[
            ("name", Value::Text(name)),
            ("create_at", Value::Text(now.clone())),
            ("update_at", Value::Text(now)),
        ])?;

        Ok(record)
    }

    pub fn get_location(&self, id: &str) -> Result<Location, ServiceError> {
        self.get_record("locations", id)
    }

    pub fn list_locations(&self, params: &ListParams) -> Result<ListResult<Location>, ServiceError> {
        self.list_records("locations", &[], params.limit.min(500), params.offset)
    }

    /// Merge-patch a location (rename, subscriber list changes).
    pub fn update_location(
        &self,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Location, ServiceError> {
        let current: Location = self.get_record("locations", id)?;
        let updated: Location = Self::apply_patch(&current, patch)?;
        if updated.name.trim().is_empty() {
            return Err(ServiceError::Validation("location name is required".into()));
        }

        self.update_record("locations", id, &updated, &[
            ("name", Value::Text(updated.name.clone())),
            ("update_at", Value::Text(updated.update_at.clone().unwrap_or_default())),
        ])?;

        Ok(updated)
    }

    pub fn delete_location(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_record("locations", id)
    }

    /// Resolve a location by name, creating it on first use.
    ///
    /// Two creators racing on the same new name both try the insert; the
    /// loser hits the unique name constraint and re-reads the winner's
    /// row instead of failing the shipment creation.
    pub fn find_or_create_location(&self, name: &str) -> Result<Location, ServiceError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::Validation("location name is required".into()));
        }

        if let Some(existing) = self.lookup_location_by_name(&name)? {
            return Ok(existing);
        }

        match self.create_location(&name, vec![]) {
            Ok(created) => Ok(created),
            Err(ServiceError::Conflict(_)) => self
                .lookup_location_by_name(&name)?
                .ok_or_else(|| ServiceError::Internal("location vanished after conflict".into())),
            Err(e) => Err(e),
        }
    }

    fn lookup_location_by_name(&self, name: &str) -> Result<Option<Location>, ServiceError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM locations WHERE name = ?1",
                &[Value::Text(name.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = match rows.first() {
            Some(r) => r,
            None => return Ok(None),
        };
        let data = row
            .get_str("data")
            .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
        let loc = serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(Some(loc))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::test_service;
    use super::*;

    #[test]
    fn create_and_get() {
        let (svc, _, _) = test_service();
        let loc = svc
            .create_location("Warehouse 3", vec!["dock@example.com".into()])
            .unwrap();
        let found = svc.get_location(&loc.id).unwrap();
        assert_eq!(found.name, "Warehouse 3");
        assert_eq!(found.notify_emails, vec!["dock@example.com".to_string()]);
    }

    #[test]
    fn duplicate_name_conflicts() {
        let (svc, _, _) = test_service();
        svc.create_location("Warehouse 3", vec![]).unwrap();
        assert!(matches!(
            svc.create_location("Warehouse 3", vec![]),
            Err(ServiceError::Conflict(_))
        ));
    }

    #[test]
    fn find_or_create_reuses_existing() {
        let (svc, _, _) = test_service();
        let a = svc.find_or_create_location("Warehouse 3").unwrap();
        let b = svc.find_or_create_location(" Warehouse 3 ").unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn patch_subscriber_list() {
        let (svc, _, _) = test_service();
        let loc = svc.create_location("Warehouse 3", vec![]).unwrap();
        let updated = svc
            .update_location(
                &loc.id,
                serde_json::json!({"notifyEmails": ["dock@example.com"]}),
            )
            .unwrap();
        assert_eq!(updated.notify_emails, vec!["dock@example.com".to_string()]);
        // Name untouched by the patch.
        assert_eq!(updated.name, "Warehouse 3");
    }

    #[test]
    fn delete_missing_not_found() {
        let (svc, _, _) = test_service();
        assert!(matches!(
            svc.delete_location("nope"),
            Err(ServiceError::NotFound(_))
        ));
    }
}
