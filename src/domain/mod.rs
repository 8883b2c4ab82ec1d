//! Processor resources, the ports the engine drives them through, and the
//! records it produces.

pub mod client_secret;
pub mod intent;
pub mod next_action;
pub mod outcome;
pub mod params;
pub mod payment_method;
pub mod ports;
pub mod telemetry;
