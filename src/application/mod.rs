//! Application layer orchestrating intent confirmation.
//!
//! [`handler::PaymentHandler`] is the entry point. Each call starts a run in
//! [`engine`], which retrieves and classifies the intent and hands next actions
//! to the dispatcher, the native challenge flow or the redirect flow. Polling
//! between retrievals is bounded by the budgets in [`crate::polling`].

mod challenge;
pub mod classify;
pub mod context;
mod dispatcher;
mod engine;
pub mod handler;
mod redirect;
pub mod resume;

pub use context::PresentationContext;
pub use handler::{IntentOrSecret, PaymentHandler};
pub use resume::{ResumeHandle, ResumeTrigger};
