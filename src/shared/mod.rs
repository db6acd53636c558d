pub mod macros;
pub mod shutdown;
pub mod structs;

pub use shutdown::Shutdown;
pub use structs::Behaviour;
pub use structs::Buttons;
pub use structs::Direction;
pub use structs::DoorState;
pub use structs::ElevatorKind;
pub use structs::FloorKind;
pub use structs::RiderClass;
