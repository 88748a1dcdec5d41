//! Service layer: fade planning, the device registry and the zone coordinator.

pub mod registry;
pub mod volume_fade;
pub mod zone_coordinator;

pub use registry::{DeviceRegistry, Registration};
pub use volume_fade::{FadeOptions, FadePlan};
pub use zone_coordinator::{SlaveFailure, ZoneCoordinator, ZoneReport};
