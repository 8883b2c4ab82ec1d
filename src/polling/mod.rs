//! Time-bounded polling of an intent while the processor settles it.

pub mod budget;
pub mod coordinator;

pub use budget::PollingBudget;
pub use coordinator::PollingCoordinator;
