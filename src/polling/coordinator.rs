use super::budget::PollingBudget;
use crate::config::HandlerConfig;
use crate::domain::payment_method::PaymentMethodType;
use crate::domain::ports::ClockRef;
use std::time::Duration;
use tracing::debug;

const MINIMAL_BUDGET_ATTEMPTS: u32 = 1;

/// Holds at most one [`PollingBudget`] for the lifetime of a run.
pub struct PollingCoordinator {
    clock: ClockRef,
    config: HandlerConfig,
    budget: Option<PollingBudget>,
}

impl PollingCoordinator {
    pub fn new(clock: ClockRef, config: HandlerConfig) -> Self {
        Self {
            clock,
            config,
            budget: None,
        }
    }

    pub fn budget(&self) -> Option<&PollingBudget> {
        self.budget.as_ref()
    }

    pub fn has_budget(&self) -> bool {
        self.budget.is_some()
    }

    /// Returns the current budget, creating one from the method policy if there
    /// is none. An existing budget is reused even if the method type changed.
    pub fn get_or_create_budget(&mut self, method: PaymentMethodType) -> Option<&PollingBudget> {
        if self.budget.is_none()
            && let Some(duration) = self.config.method_budgets.budget_for(method)
        {
            debug!(payment_method_type = %method, ?duration, "created method polling budget");
            self.budget = Some(self.fixed(duration));
        }
        self.budget.as_ref()
    }

    /// Replaces the current budget with the `processing` wait allowance.
    pub fn create_processing_budget(&mut self) {
        self.budget = Some(self.fixed(self.config.processing_budget));
    }

    /// Replaces the current budget with the short error-recovery allowance: a
    /// single retry.
    pub fn create_minimal_budget(&mut self) {
        self.budget = Some(
            self.fixed(self.config.minimal_budget)
                .with_max_attempts(MINIMAL_BUDGET_ATTEMPTS),
        );
    }

    pub fn reset(&mut self) {
        self.budget = None;
    }

    /// Permissive when there is no budget yet.
    pub fn can_poll(&self) -> bool {
        self.budget.as_ref().is_none_or(PollingBudget::can_poll)
    }

    pub fn network_timeout(&self) -> Option<Duration> {
        self.budget
            .as_ref()
            .map(|budget| budget.network_timeout(self.clock.now()))
    }

    /// Waits for the next poll slot. Resolves immediately without a budget.
    pub async fn poll_after(&mut self) {
        if let Some(budget) = self.budget.as_mut() {
            budget.poll_after(self.clock.as_ref()).await;
        }
    }

    fn fixed(&self, duration: Duration) -> PollingBudget {
        PollingBudget::with_limits(
            self.clock.now(),
            duration,
            self.config.poll_interval,
            self.config.network_timeout_floor,
        )
    }
}
