pub mod api_key;
pub mod device;
pub mod location;
pub mod shipment;

pub use api_key::ApiKey;
pub use device::Device;
pub use location::Location;
pub use shipment::{Shipment, ShipmentStatus};
