pub mod dispatcher;
pub mod eligibility;
mod dispatcher_tests;

pub use dispatcher::Dispatch;
pub use dispatcher::Dispatcher;
pub use eligibility::is_eligible;
pub use eligibility::Call;
