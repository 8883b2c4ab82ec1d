use crate::domain::ports::Clock;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Clock backed by the tokio timer, so paused test runtimes control it too.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
