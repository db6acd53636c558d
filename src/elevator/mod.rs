pub mod car;
pub mod fsm;

pub use car::Capability;
pub use car::Elevator;
pub use car::ElevatorStats;
pub use car::Target;
pub use fsm::ElevatorFSM;
