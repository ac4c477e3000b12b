use std::time::Duration;

/// Pacing policy applied between rate-limited operations.
///
/// Drivers call `pause` at the points where the destination needs breathing
/// room: before following a pagination cursor, after each product, and
/// between sibling categories.
#[async_trait::async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

/// Sleeps for a fixed duration on every pause.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub const DEFAULT: Duration = Duration::from_secs(2);

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

#[async_trait::async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait::async_trait]
impl Throttle for NoDelay {
    async fn pause(&self) {}
}
