pub mod passenger;
mod passenger_tests;

pub use passenger::JourneyReport;
pub use passenger::Passenger;
