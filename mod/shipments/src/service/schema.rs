use shiptrack_core::ServiceError;
use shiptrack_sql::SQLStore;

/// SQL DDL statements to initialize the shipments database schema.
///
/// Each table stores the full JSON document in a `data` TEXT column,
/// with indexed columns extracted for filtering and uniqueness. The
/// UNIQUE column on `shipments.short_code` is the allocator's
/// concurrency primitive; `devices(shipment_id, serial)` scopes serial
/// uniqueness to the owning shipment.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS shipments (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        short_code TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL,
        location_id TEXT,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS devices (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        shipment_id TEXT NOT NULL,
        serial TEXT NOT NULL,
        checked_in INTEGER NOT NULL DEFAULT 0,
        is_extra INTEGER NOT NULL DEFAULT 0,
        create_at TEXT,
        update_at TEXT,
        UNIQUE(shipment_id, serial)
    )",
    "CREATE TABLE IF NOT EXISTS locations (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        name TEXT NOT NULL UNIQUE,
        create_at TEXT,
        update_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS api_keys (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        key TEXT NOT NULL UNIQUE,
        active INTEGER NOT NULL DEFAULT 1,
        create_at TEXT,
        update_at TEXT
    )",
    // Indexes
    "CREATE INDEX IF NOT EXISTS idx_ship_status ON shipments(status)",
    "CREATE INDEX IF NOT EXISTS idx_ship_location ON shipments(location_id)",
    "CREATE INDEX IF NOT EXISTS idx_dev_shipment ON devices(shipment_id)",
];

/// Create all tables and indexes if they don't exist.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), ServiceError> {
    for stmt in SCHEMA {
        sql.exec(stmt, &[])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
    }
    Ok(())
}
