pub mod apikey;
pub mod location;
pub mod receive;
pub mod schema;
pub mod shipment;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use shiptrack_core::{merge_patch, now_rfc3339, ListResult, ServiceError};
use shiptrack_sql::{SQLError, SQLExecutor, SQLStore, Value};

use crate::code;
use crate::effects::EffectRunner;
use crate::model::{Device, Shipment};

/// Shipment service — holds the storage backend, the post-commit effect
/// runner, and the configured administrator notification addresses.
pub struct ShipmentService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) effects: EffectRunner,
    pub(crate) admin_emails: Vec<String>,
    /// Short-code candidate source. Random in production; swappable so
    /// tests can force collisions against the unique constraint.
    pub(crate) codegen: Box<dyn Fn() -> String + Send + Sync>,
}

impl ShipmentService {
    pub fn new(
        sql: Arc<dyn SQLStore>,
        effects: EffectRunner,
        admin_emails: Vec<String>,
    ) -> Result<Self, ServiceError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Self {
            sql,
            effects,
            admin_emails,
            codegen: Box::new(|| code::generate(&mut rand::thread_rng())),
        })
    }

    /// Replace the short-code candidate source.
    #[cfg(test)]
    pub(crate) fn with_codegen(
        mut self,
        f: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.codegen = Box::new(f);
        self
    }

    // ── Transactions ──

    /// Run a closure inside one store transaction, carrying a typed
    /// result (or a ServiceError) across the dyn boundary.
    ///
    /// A domain error from the closure rolls the transaction back and
    /// comes out unchanged, so a lifecycle conflict detected against the
    /// re-read status aborts every write from the same call.
    pub(crate) fn in_tx<T>(
        &self,
        mut f: impl FnMut(&dyn SQLExecutor) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut out: Option<T> = None;
        let mut failed: Option<ServiceError> = None;

        let result = self.sql.transaction(&mut |ex| match f(ex) {
            Ok(v) => {
                out = Some(v);
                Ok(())
            }
            Err(e) => {
                failed = Some(e);
                Err(SQLError::Rollback)
            }
        });

        match result {
            Ok(()) => out.ok_or_else(|| {
                ServiceError::Internal("transaction committed without a result".into())
            }),
            Err(SQLError::Rollback) => Err(failed
                .take()
                .unwrap_or_else(|| ServiceError::Internal("transaction aborted".into()))),
            Err(e) => Err(sql_err(e)),
        }
    }

    // ── Generic CRUD helpers (autocommit) ──

    /// Insert a record as JSON into a table with indexed columns.
    pub(crate) fn insert_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), ServiceError> {
        let json = to_json(record)?;

        let mut cols = vec!["id", "data"];
        let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
        let mut params = vec![Value::Text(id.to_string()), Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            let idx = i + 3;
            cols.push(col);
            placeholders.push(format!("?{}", idx));
            params.push(val.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        );

        self.sql.exec(&sql, &params).map_err(sql_err)?;
        Ok(())
    }

    /// Get a record by id, deserializing the JSON `data` column.
    pub(crate) fn get_record<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<T, ServiceError> {
        let sql = format!("SELECT data FROM {} WHERE id = ?1", table);
        let rows = self
            .sql
            .query(&sql, &[Value::Text(id.to_string())])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("{}/{}", table, id)))?;
        let data = row
            .get_str("data")
            .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
        serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))
    }

    /// Update a record's JSON data and indexed columns.
    pub(crate) fn update_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), ServiceError> {
        let json = to_json(record)?;

        let mut sets = vec!["data = ?1".to_string()];
        let mut params: Vec<Value> = vec![Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            let idx = i + 2;
            sets.push(format!("{} = ?{}", col, idx));
            params.push(val.clone());
        }

        let id_idx = params.len() + 1;
        params.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            sets.join(", "),
            id_idx,
        );

        let affected = self.sql.exec(&sql, &params).map_err(sql_err)?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("{}/{}", table, id)));
        }
        Ok(())
    }

    /// Delete a record by id.
    pub(crate) fn delete_record(&self, table: &str, id: &str) -> Result<(), ServiceError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table);
        let affected = self
            .sql
            .exec(&sql, &[Value::Text(id.to_string())])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("{}/{}", table, id)));
        }
        Ok(())
    }

    /// List records with optional filters, pagination, and total count.
    pub(crate) fn list_records<T: DeserializeOwned + Serialize>(
        &self,
        table: &str,
        filters: &[(&str, Value)],
        limit: usize,
        offset: usize,
    ) -> Result<ListResult<T>, ServiceError> {
        let mut where_clauses = Vec::new();
        let mut params = Vec::new();

        for (i, (col, val)) in filters.iter().enumerate() {
            let idx = i + 1;
            where_clauses.push(format!("{} = ?{}", col, idx));
            params.push(val.clone());
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) as cnt FROM {}{}", table, where_sql);
        let rows = self
            .sql
            .query(&count_sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as usize;

        let limit_idx = params.len() + 1;
        let offset_idx = params.len() + 2;
        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));

        let sql = format!(
            "SELECT data FROM {}{} ORDER BY create_at DESC LIMIT ?{} OFFSET ?{}",
            table, where_sql, limit_idx, offset_idx,
        );

        let rows = self
            .sql
            .query(&sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut items = Vec::new();
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            let item: T = serde_json::from_str(data)
                .map_err(|e| ServiceError::Internal(e.to_string()))?;
            items.push(item);
        }

        Ok(ListResult { items, total })
    }

    /// Apply a JSON merge-patch to a record, protecting immutable fields.
    pub(crate) fn apply_patch<T: Serialize + DeserializeOwned>(
        current: &T,
        patch: serde_json::Value,
    ) -> Result<T, ServiceError> {
        let mut json = serde_json::to_value(current)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let now = now_rfc3339();

        let mut patch_filtered = patch;
        if let Some(obj) = patch_filtered.as_object_mut() {
            obj.remove("id");
            obj.remove("createAt");
            obj.insert("updateAt".into(), serde_json::json!(now));
        }

        merge_patch(&mut json, &patch_filtered);
        serde_json::from_value(json).map_err(|e| ServiceError::Internal(e.to_string()))
    }
}

/// Map a storage error, surfacing duplicate keys as conflicts.
pub(crate) fn sql_err(e: SQLError) -> ServiceError {
    match e {
        SQLError::UniqueViolation { constraint } => {
            ServiceError::Conflict(format!("duplicate value for {}", constraint))
        }
        other => ServiceError::Storage(other.to_string()),
    }
}

pub(crate) fn to_json<T: Serialize>(record: &T) -> Result<String, ServiceError> {
    serde_json::to_string(record).map_err(|e| ServiceError::Internal(e.to_string()))
}

// ── Transaction-scoped row helpers ──
//
// The receiving coordinator and the administrative edit/verify paths
// re-read and re-write rows through the transaction executor, never
// through a status cached earlier in the request.

/// Fetch a shipment by short code inside a transaction.
pub(crate) fn fetch_shipment_by_code(
    ex: &dyn SQLExecutor,
    code: &str,
) -> Result<Option<Shipment>, ServiceError> {
    let rows = ex
        .query(
            "SELECT data FROM shipments WHERE short_code = ?1",
            &[Value::Text(code.to_string())],
        )
        .map_err(|e| ServiceError::Storage(e.to_string()))?;
    let row = match rows.first() {
        Some(r) => r,
        None => return Ok(None),
    };
    let data = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
    let shipment =
        serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?;
    Ok(Some(shipment))
}

/// Insert a shipment row. Returns the raw SQLError so the allocator can
/// distinguish a short-code collision from other failures.
pub(crate) fn insert_shipment(ex: &dyn SQLExecutor, s: &Shipment) -> Result<(), SQLError> {
    let json = serde_json::to_string(s).map_err(|e| SQLError::Execution(e.to_string()))?;
    ex.exec(
        "INSERT INTO shipments (id, data, short_code, status, location_id, create_at, update_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        &[
            Value::Text(s.id.clone()),
            Value::Text(json),
            Value::Text(s.short_code.clone()),
            Value::Text(s.status.as_str().to_string()),
            Value::Text(s.location_id.clone()),
            Value::Text(s.create_at.clone().unwrap_or_default()),
            Value::Text(s.update_at.clone().unwrap_or_default()),
        ],
    )?;
    Ok(())
}

/// Rewrite a shipment row's document and indexed columns.
pub(crate) fn write_shipment(ex: &dyn SQLExecutor, s: &Shipment) -> Result<(), ServiceError> {
    let json = to_json(s)?;
    let affected = ex
        .exec(
            "UPDATE shipments SET data = ?1, status = ?2, update_at = ?3 WHERE id = ?4",
            &[
                Value::Text(json),
                Value::Text(s.status.as_str().to_string()),
                Value::Text(s.update_at.clone().unwrap_or_default()),
                Value::Text(s.id.clone()),
            ],
        )
        .map_err(sql_err)?;
    if affected == 0 {
        return Err(ServiceError::NotFound(format!("shipments/{}", s.id)));
    }
    Ok(())
}

/// Fetch all devices belonging to a shipment.
pub(crate) fn fetch_devices(
    ex: &dyn SQLExecutor,
    shipment_id: &str,
) -> Result<Vec<Device>, ServiceError> {
    let rows = ex
        .query(
            "SELECT data FROM devices WHERE shipment_id = ?1 ORDER BY create_at",
            &[Value::Text(shipment_id.to_string())],
        )
        .map_err(|e| ServiceError::Storage(e.to_string()))?;
    let mut devices = Vec::with_capacity(rows.len());
    for row in &rows {
        let data = row
            .get_str("data")
            .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
        devices
            .push(serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?);
    }
    Ok(devices)
}

/// Rewrite a device row's document and check-in column.
pub(crate) fn write_device(ex: &dyn SQLExecutor, d: &Device) -> Result<(), ServiceError> {
    let json = to_json(d)?;
    let affected = ex
        .exec(
            "UPDATE devices SET data = ?1, checked_in = ?2, update_at = ?3 WHERE id = ?4",
            &[
                Value::Text(json),
                Value::Integer(d.checked_in as i64),
                Value::Text(d.update_at.clone().unwrap_or_default()),
                Value::Text(d.id.clone()),
            ],
        )
        .map_err(sql_err)?;
    if affected == 0 {
        return Err(ServiceError::NotFound(format!("devices/{}", d.id)));
    }
    Ok(())
}

/// Insert a device row. With `or_ignore`, a duplicate (shipment, serial)
/// pair is a silent no-op — this is what makes retried receive
/// submissions safe for extra devices.
pub(crate) fn insert_device(
    ex: &dyn SQLExecutor,
    d: &Device,
    or_ignore: bool,
) -> Result<(), ServiceError> {
    let json = to_json(d)?;
    let conflict = if or_ignore {
        " ON CONFLICT(shipment_id, serial) DO NOTHING"
    } else {
        ""
    };
    let sql = format!(
        "INSERT INTO devices (id, data, shipment_id, serial, checked_in, is_extra, create_at, update_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8){}",
        conflict
    );
    ex.exec(
        &sql,
        &[
            Value::Text(d.id.clone()),
            Value::Text(json),
            Value::Text(d.shipment_id.clone()),
            Value::Text(d.serial.clone()),
            Value::Integer(d.checked_in as i64),
            Value::Integer(d.is_extra as i64),
            Value::Text(d.create_at.clone().unwrap_or_default()),
            Value::Text(d.update_at.clone().unwrap_or_default()),
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use shiptrack_sql::SqliteStore;

    use crate::effects::testing::{RecordingMailer, RecordingUnlocker};
    use crate::effects::EffectRunner;

    use super::ShipmentService;

    /// In-memory service with inline effects and recording collaborators.
    pub(crate) fn test_service() -> (
        ShipmentService,
        Arc<RecordingMailer>,
        Arc<RecordingUnlocker>,
    ) {
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mailer = Arc::new(RecordingMailer::default());
        let unlocker = Arc::new(RecordingUnlocker::default());
        let effects = EffectRunner::inline(mailer.clone(), unlocker.clone());
        let svc = ShipmentService::new(sql, effects, vec!["admin@example.com".into()]).unwrap();
        (svc, mailer, unlocker)
    }
}
