pub mod building;
pub mod floor;
pub mod registry;

pub use building::Building;
pub use floor::Floor;
pub use floor::FloorPlan;
pub use registry::Registry;
pub use registry::Sighting;
