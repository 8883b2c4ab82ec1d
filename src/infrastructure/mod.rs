//! Concrete collaborators: the tokio clock, telemetry sinks and scripted
//! in-memory stand-ins for the processor and the platform UI.

pub mod clock;
pub mod in_memory;
pub mod telemetry;
